pub mod catalog;
pub mod conf;
pub mod core;
pub mod provider;
pub mod scheduler;
pub mod watermark;

#[cfg(feature = "testutil")]
pub mod testutil;
