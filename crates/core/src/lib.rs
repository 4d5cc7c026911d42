pub mod config;
pub mod subscription;

pub use config::Config;
pub use subscription::*;
