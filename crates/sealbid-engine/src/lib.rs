//! # sealbid-engine
//!
//! **Sealed-bid, multi-round double-auction engine.**
//!
//! Every operation is a function of one ledger transaction: it receives
//! `&mut impl Ledger`, reads and writes through it, and either returns `Ok`
//! (the transaction commits) or an [`sealbid_types::AuctionError`] (nothing
//! it did is kept).
//!
//! ## Order Flow
//!
//! ```text
//! submit_order ──► publish_order ──► submit_bid / submit_ask ──► close_round ──► end_auction
//!  (private)        (public hash)     (reveal + verify + fold)    │
//!                                                                └─► create_new_round (price + increment)
//! ```
//!
//! ## Components
//!
//! - [`commitment`]: private storage and public commitment of orders
//! - [`reveal`]: proves a revealed plaintext matches its commitment
//! - [`auditor`]: refuses to clear while a better order is withheld
//! - [`lifecycle`]: the per-auction round state machine
//! - [`access`]: owner, auditor and admin rules
//! - [`queries`]: guarded reads

pub mod access;
pub mod auditor;
pub mod commitment;
pub mod events;
pub mod lifecycle;
pub mod queries;
pub mod reveal;
mod store;

pub use access::AccessDecision;
pub use commitment::{delete_order, publish_order, submit_order};
pub use events::RoundEvent;
pub use lifecycle::RoundController;
pub use queries::{list_orders, query_auction, query_order, query_public, query_round};
pub use reveal::{VerifiedOrder, verify_and_bind};
