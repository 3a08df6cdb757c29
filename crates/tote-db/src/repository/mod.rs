//! # Repository Module
//!
//! SQL lives here and nowhere else.
//!
//! - [`kv::KeyValueRepository`] - snapshot blobs by key

pub mod kv;
