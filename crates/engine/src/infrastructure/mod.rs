//! Infrastructure implementations.
//!
//! Contains port trait implementations and the files kept in the server root.

pub mod clock;
pub mod config_store;
pub mod offline_host;
pub mod ports;
pub mod properties;
pub mod retirement;
pub mod server_files;
