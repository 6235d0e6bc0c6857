//! DYNQ Core - Shared abstractions for the PartiQL query and upload engine
//!
//! This crate provides the types every other DYNQ crate depends on:
//!
//! - `SourceValue` / `SourceRow` - The store's tagged attribute values
//! - `Frame` / `Column` - The strictly-typed columnar result model
//! - `QuerySpec` - A single query request from the host
//! - `StoreTransport` - Trait for the remote store client
//! - `TableDescription` / `KeySchema` - Table and index key metadata
//! - `DynqError` - Error taxonomy shared by all crates

mod config;
mod error;
mod frame;
mod schema;
mod transport;
mod types;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use schema::*;
pub use transport::*;
pub use types::*;

#[cfg(test)]
mod types_tests;
