// Thin re-export module: implementation is in `blockchain/core.rs` so that the
// generic chain, the ledger payload and block validation stay separable.

pub mod core;
pub use core::*;
