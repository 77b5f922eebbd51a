//! Atelier API
//!
//! HTTP surface for the asset ingest pipeline: inline multipart upload,
//! presigned direct upload for large files, and health/docs endpoints.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;
