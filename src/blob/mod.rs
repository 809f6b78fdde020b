//! Blob mirroring component: container client and tree walker.

mod client;
mod sync;

pub use client::{AzureBlobClient, BlobStore};
pub use sync::{BlobSync, UploadReport};
