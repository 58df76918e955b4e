//! Rust client for the admission gateway.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gateway_sdk::{ClientConfig, GatewayClient, MemoryStore};
//!
//! # async fn demo() -> Result<(), gateway_sdk::HttpError> {
//! let store = Arc::new(MemoryStore::new());
//! store.set("AUTH_TOKEN", "abc");
//!
//! let client = GatewayClient::new(ClientConfig::new("http://localhost:8080", "AUTH_TOKEN"), store)?;
//! let me = client.get("/me").await?;
//! println!("{:?}", me.as_json());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod storage;

pub use client::{ClientConfig, GatewayClient, Payload};
pub use error::{ErrorKind, HttpError};
pub use storage::{CredentialStore, FileStore, MemoryStore};
