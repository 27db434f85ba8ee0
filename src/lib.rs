//! # watchwire
//!
//! BSER client for the watchman file-watching daemon, plus a bounded
//! top-K heap for ranking file-finder candidates.
//!
//! ## Architecture
//!
//! - **Codec**: BSER values, encoded into a request buffer and pulled off a
//!   response cursor without building a tree
//! - **Protocol**: PDU framing (`00 01` marker, smallest-fits length)
//! - **Transport**: one Unix stream connection, blocking or tokio
//! - **Query**: `watch-project` and `query` on top of the transport
//! - **Heap**: [`BoundedHeap`] over borrowed, caller-scored entries
//!
//! ## Example
//!
//! ```ignore
//! use watchwire::{ClientConfig, Connection};
//!
//! fn main() -> watchwire::Result<()> {
//!     let mut conn = Connection::from_config(ClientConfig::from_env())?;
//!     let project = conn.watch_project("/home/me/project")?;
//!     let listing = conn.query(&project.watch, project.relative_path.as_deref())?;
//!     for file in &listing.files {
//!         println!("{}", file.display());
//!     }
//!     conn.disconnect()
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod heap;
pub mod protocol;
pub mod query;
pub mod transport;

pub use codec::Value;
pub use config::ClientConfig;
pub use error::{Result, WatchwireError};
pub use heap::{select_top_k, BoundedHeap};
pub use query::{QueryResult, WatchProjectResult};
pub use transport::{AsyncConnection, Connection};
