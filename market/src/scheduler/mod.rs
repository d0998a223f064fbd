//! Background jobs that drive auctions, escrow, and orders forward without
//! any client request.
//!
//! Each job is an independent periodic task with no shared in-process
//! state; correctness across service instances comes from the distributed
//! lock and status-guarded, idempotent sweeps. Every job exposes a
//! `run_once` for tests and a `run` loop for production.

pub mod auction_closer;
pub mod escrow_release;
pub mod payment_expiry;

pub use auction_closer::AuctionCloser;
pub use escrow_release::EscrowAutoReleaser;
pub use payment_expiry::PaymentExpirer;
