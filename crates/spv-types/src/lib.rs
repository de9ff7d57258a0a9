//! # spv-types
//!
//! Record types persisted by the SPV state store.
//!
//! This crate provides:
//! - [`Tx`] - a transaction tracked because it touches a watched address
//! - [`OutPoint`] - reference to one output of a prior transaction
//! - [`QueItem`] - pending outbound notification
//! - [`Header`] - block header as kept by the header chain
//! - [`AddrFilter`] - membership filter over the watched address set
//! - [`codec`] - deterministic binary encoding of the above

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod filter;
pub mod header;
pub mod queue;
pub mod transaction;

pub use filter::{AddrBloom, AddrFilter};
pub use header::Header;
pub use queue::QueItem;
pub use transaction::{OutPoint, Tx};

pub use spv_primitives::{Fixed64, Height, Uint168, Uint256};
