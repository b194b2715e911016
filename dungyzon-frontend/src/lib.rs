pub mod api;
pub mod command;
pub mod config;
pub mod logging;
pub mod search;
pub mod storage;
