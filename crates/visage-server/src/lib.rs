pub mod connection;
pub mod protocol;
pub mod server;

pub use server::{start, ServerConfig, ServerHandle};
