//! Fractional ownership ledger for registered equine assets
//!
//! This crate re-exports all the components of the equishare system.

pub use equishare_core::*;
pub use equishare_runtime::*;
pub use equishare_storage_impl::*;

// Both crates have a `participation` module; the path resolves to the book
pub use equishare_runtime::participation;
