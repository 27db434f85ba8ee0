//! Transport module - Unix socket exchange with the daemon.
//!
//! - [`Connection`]: blocking, peek-then-commit reads
//! - [`AsyncConnection`]: tokio, buffered reads

mod async_socket;
mod socket;

pub use async_socket::AsyncConnection;
pub use socket::Connection;
