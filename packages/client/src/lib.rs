//! Blocking client for the Adext graph API.
//!
//! Adds I/O around the pure [`adext`] core: an HTTP transport, a key/value
//! persistence store, environment-driven configuration, and the [`Adext`]
//! facade that ties them together.
//!
//! ```rust,ignore
//! use adext_client::{Adext, AdextConfig};
//!
//! let adext = Adext::new(AdextConfig::from_env()?)?;
//! let mut page = adext.get("/me/friends")?.edge(None)?;
//! loop {
//!     for friend in &page {
//!         println!("{}", friend.get_str("name").unwrap_or("?"));
//!     }
//!     match adext.next(&page)? {
//!         Some(next) => page = next,
//!         None => break,
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod counter;
pub mod facade;
pub mod storage;
pub mod transport;

pub use client::{AdextClient, PreparedCall};
pub use config::AdextConfig;
pub use counter::RequestCounter;
pub use facade::Adext;
pub use storage::{memory::MemoryStore, sqlite::SqliteStore, PersistentStore, StoreError};
pub use transport::{blocking::ReqwestTransport, HttpTransport, TransportReply};
