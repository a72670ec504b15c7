//! # sealbid-types
//!
//! Shared types, errors, and configuration for the **SealBid** auction engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AuctionId`], [`ItemId`], [`OrgId`], [`SubjectId`],
//!   [`SubmissionId`], [`TxId`], [`RoundNumber`]
//! - **Keys**: [`CompositeKey`], [`Partition`], [`OrderKey`]
//! - **Order model**: [`OrderSide`], [`PrivateOrder`], [`PublicOrderHash`],
//!   [`CommitmentHash`], [`OrderBinding`]
//! - **Round model**: [`AuctionRound`], [`RoundStatus`], [`Seller`], [`Bidder`]
//! - **Identity**: [`Identity`], [`Capability`], [`Capabilities`]
//! - **Configuration**: [`AuctionConfig`]
//! - **Errors**: [`AuctionError`] with `SB_ERR_` prefix codes
//! - **Constants**: key tags, event names and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ids;
pub mod key;
pub mod order;
pub mod round;

// Re-export all primary types at crate root for ergonomic imports:
//   use sealbid_types::{AuctionRound, PrivateOrder, OrderKey, ...};

pub use config::*;
pub use error::*;
pub use identity::*;
pub use ids::*;
pub use key::*;
pub use order::*;
pub use round::*;

// Constants are accessed via `sealbid_types::constants::FOO`
// (not re-exported to avoid name collisions).
