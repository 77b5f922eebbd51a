pub mod direct_upload;
pub mod health;
pub mod upload;
