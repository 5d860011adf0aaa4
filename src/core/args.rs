use clap::Parser;
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,
    /// JSON snapshot of the metastore to scan.
    #[arg(long)]
    pub catalog: String,
    /// JSON object mapping `database@table` to the prior watermark in millis.
    #[arg(short, long)]
    pub watermarks: Option<String>,
    /// Override the scan clock, millis since epoch.
    #[arg(long)]
    pub now: Option<i64>,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
