//! Core types, commission tables, and engine logic for the Upline referral
//! network.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! persistence seam is the [`store::ReferralStore`] trait; everything above
//! it — the commission tables, the downline traversal, the approval and
//! rank-upgrade workflows — lives here.

pub mod commission;
pub mod engine;
pub mod error;
pub mod graph;
pub mod package;
pub mod payout;
pub mod rank;
pub mod store;
pub mod transaction;
pub mod user;

pub use error::{EngineError, Result};
