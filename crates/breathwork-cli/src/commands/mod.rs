pub mod account;
pub mod config;
pub mod protocol;
pub mod session;
pub mod stats;
