//! Socket plumbing: the readiness loop and per-connection I/O.

pub mod connection;
pub mod server;

pub use connection::Connection;
pub use server::Server;
