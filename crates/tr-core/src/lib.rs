//! tr-core: shared foundation for thermoramp.
//!
//! Contains:
//! - numeric (Real + parameter checks)
//! - error (shared error types)

pub mod error;
pub mod numeric;

pub use error::{TrError, TrResult};
pub use numeric::*;
