//! Content hashing used to decide whether a target file needs rewriting.

mod content_digest;

pub use content_digest::{ContentDigest, DigestError};
