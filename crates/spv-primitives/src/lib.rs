//! # spv-primitives
//!
//! Fixed-width value types shared by the SPV state store.
//!
//! - [`Uint168`] - 21-byte program hash identifying a watched address or DID
//! - [`Uint256`] - 32-byte hash identifying transactions and blocks
//! - [`Fixed64`] - fixed-point amount with eight decimal places

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod fixed;
mod hash;

pub use address::{AddressError, Uint168};
pub use error::PrimitiveError;
pub use fixed::{Fixed64, FixedError};
pub use hash::{HashError, Uint256};

/// Block height type
pub type Height = u32;
