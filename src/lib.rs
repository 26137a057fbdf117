pub mod cli;
pub mod config;
pub mod criteria;
pub mod data;
pub mod logging;
pub mod parallel;
pub mod quotes;
