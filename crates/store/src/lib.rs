#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Storage core of the EigenDA proxy: dispersal and retrieval pipelines over the EigenDA
//! backends, secondary storage, and the manager the transports talk to.

pub mod arbitrum;
pub mod config;
pub mod eigenda_v2;
pub mod errors;
pub mod manager;
pub mod memstore;
pub mod payload;
pub mod retry;
pub mod secondary;
pub mod traits;

#[cfg(test)]
mod test_utils;

pub use arbitrum::{ArbitrumHandlers, CompatibilityConfig};
pub use config::{
    ConfigError, EigenDABackend, MemstoreConfig, PutTries, SecondaryConfig, StoreConfig,
};
pub use eigenda_v2::EigenDAV2Store;
pub use errors::{DerivationError, DerivationErrorBody, ProxyError};
pub use manager::{DispersalBackendCell, EigenDAManager};
pub use memstore::{LegacyMemStore, MemStore};
pub use secondary::{MemoryStore, RocksDbStore, SecondaryManager, SecondaryStore};
pub use traits::{BlobDisperser, BlobRetriever, EigenDAStore, GetOpts};
