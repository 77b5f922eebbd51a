//! Atelier Storage Library
//!
//! Storage abstraction and implementations for the asset pipeline. Includes
//! the Storage trait plus S3 and local filesystem backends.
//!
//! # Storage key format
//!
//! Keys are prefix-scoped by artifact role:
//!
//! - **Originals**: `assets/{filename}`
//! - **Previews**: `previews/{filename}`
//! - **Thumbnails**: `thumbnails/{filename}`
//! - **Preview clips**: `clips/{filename}`
//! - **Direct uploads awaiting derivation**: `incoming/{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use atelier_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
