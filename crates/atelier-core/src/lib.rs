//! Atelier core library
//!
//! Shared configuration, error taxonomy, domain models and constants used by
//! the storage, processing, worker and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
