//! Common types shared by every store implementation

pub mod error;

pub use error::{DatabaseError, DatabaseResult};
