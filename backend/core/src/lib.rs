//! Core types, error taxonomy, and the storage capability shared by every
//! pinforge crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, Stage, StoreError, UploadError};
pub use traits::ContentStore;
pub use types::{Cid, MetadataDefaults, Part, UploadResult, IPFS_SCHEME, OCTET_STREAM};
