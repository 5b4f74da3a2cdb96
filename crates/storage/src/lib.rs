#![forbid(unsafe_code)]

mod config;
mod store;

pub use config::TeamConfig;
pub use store::*;
