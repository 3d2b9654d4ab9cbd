//! Credential models, the token source contract, and the proactively refreshed token cache.

pub mod cache;
pub mod source;
pub mod token;

pub use cache::*;
pub use source::*;
pub use token::{secret::*, *};
