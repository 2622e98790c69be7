//! Common types for the auth selector workspace

mod error;

pub use error::{Error, Result};
