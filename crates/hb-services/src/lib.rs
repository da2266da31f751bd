//! # hb-services
//!
//! Backend-agnostic application services: ID issuance, the like ledger,
//! keyset pagination, moderation, and the laundry-status cache. Everything
//! here talks to storage exclusively through the `DocumentStore` port.

pub mod boards;
pub mod cache;
pub mod counter;
pub mod laundry;
pub mod likes;
pub mod moderation;
pub mod occ;
pub mod pagination;

#[cfg(test)]
pub(crate) mod testutil;
