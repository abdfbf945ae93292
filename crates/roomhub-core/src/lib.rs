//! Roomhub Core Library
//!
//! This crate provides the configuration, error types, clock abstraction and
//! value-identity types shared by the storage, client and CLI crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AppError, ErrorMetadata};
pub use identity::{CanonicalKey, DraftFile, FileRepr, LocalFile, ReprError, StringySet};
pub use storage_types::{CacheBackend, StorageBackend};
