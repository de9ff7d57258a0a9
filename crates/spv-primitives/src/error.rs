//! Common error types for primitives

use crate::address::AddressError;
use crate::fixed::FixedError;
use crate::hash::HashError;
use thiserror::Error;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Fixed-point error
    #[error("fixed-point error: {0}")]
    Fixed(#[from] FixedError),
}
