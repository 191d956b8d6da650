// Library exports for devlogs, the dev log capture engine

pub mod capture;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod plugin;
pub mod query;
