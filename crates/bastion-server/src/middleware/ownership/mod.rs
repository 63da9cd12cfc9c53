//! Ownership gates: per-resource checks and collection filters.

pub mod check;
pub mod filter;

pub use check::{OwnershipLayer, OwnershipMiddleware};
pub use filter::{OwnershipFilter, OwnershipFilterLayer, OwnershipFilterMiddleware};
