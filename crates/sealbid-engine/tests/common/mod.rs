//! Shared harness for the engine integration tests: three organizations on
//! one in-memory ledger, and one auction of apples.

#![allow(dead_code)]

use rust_decimal::Decimal;
use sealbid_engine::{RoundController, publish_order, query_round, submit_order};
use sealbid_ledger::{Credential, MemoryLedger, OrgAuthority};
use sealbid_types::*;
use tracing_subscriber::EnvFilter;

pub const AUCTION: &str = "auction1";
pub const ITEM: &str = "apples";

/// Install a test subscriber once per binary. Set `RUST_LOG=debug` to see
/// engine output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn bid(owner: &str, org: &str, quantity: u64, price: i64) -> PrivateOrder {
    PrivateOrder::dummy(OrderSide::Bid, ITEM, quantity, price, owner, org)
}

pub fn ask(owner: &str, org: &str, quantity: u64, price: i64) -> PrivateOrder {
    PrivateOrder::dummy(OrderSide::Ask, ITEM, quantity, price, owner, org)
}

pub fn auction_id() -> AuctionId {
    AuctionId::new(AUCTION)
}

/// Ledger, controller and the organizations' certificate authorities.
pub struct Market {
    pub ledger: MemoryLedger,
    pub controller: RoundController,
    pub org1: OrgAuthority,
    pub org2: OrgAuthority,
    pub org3: OrgAuthority,
}

impl Market {
    pub fn new() -> Self {
        init_tracing();
        let org1 = OrgAuthority::new("Org1MSP");
        let org2 = OrgAuthority::new("Org2MSP");
        let org3 = OrgAuthority::new("Org3MSP");
        let config = AuctionConfig::default();
        let ledger = MemoryLedger::with_authorities(config.clone(), &[&org1, &org2, &org3]);
        let controller = RoundController::new(config).expect("default config is valid");
        Self {
            ledger,
            controller,
            org1,
            org2,
            org3,
        }
    }

    /// Store and publish `order` on behalf of `owner`.
    pub fn place(&mut self, owner: &Credential, order: &PrivateOrder) -> OrderKey {
        let key = self
            .ledger
            .transact(owner, |tx| submit_order(tx, order))
            .expect("order should be stored");
        self.ledger
            .transact(owner, |tx| publish_order(tx, &key))
            .expect("commitment should be published");
        key
    }

    pub fn create_auction(&mut self, caller: &Credential, reserve: i64) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger.transact(caller, |tx| {
            controller.create_auction(
                tx,
                &auction_id(),
                &ItemId::new(ITEM),
                Decimal::new(reserve, 0),
            )
        })
    }

    pub fn submit_bid(
        &mut self,
        caller: &Credential,
        round: u32,
        key: &OrderKey,
        plaintext: &PrivateOrder,
    ) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger.transact(caller, |tx| {
            controller.submit_bid(tx, &auction_id(), RoundNumber(round), key.submission, plaintext)
        })
    }

    pub fn submit_ask(
        &mut self,
        caller: &Credential,
        round: u32,
        key: &OrderKey,
        plaintext: &PrivateOrder,
    ) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger.transact(caller, |tx| {
            controller.submit_ask(tx, &auction_id(), RoundNumber(round), key.submission, plaintext)
        })
    }

    pub fn close_round(&mut self, caller: &Credential, round: u32) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger
            .transact(caller, |tx| controller.close_round(tx, &auction_id(), RoundNumber(round)))
    }

    pub fn new_round(&mut self, caller: &Credential, round: u32) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger.transact(caller, |tx| {
            controller.create_new_round(tx, &auction_id(), RoundNumber(round))
        })
    }

    pub fn end_auction(&mut self, caller: &Credential) -> Result<AuctionRound> {
        let controller = &self.controller;
        self.ledger
            .transact(caller, |tx| controller.end_auction(tx, &auction_id()))
    }

    /// Read a round as an ordinary member of Org1.
    pub fn round(&mut self, round: u32) -> Result<AuctionRound> {
        let observer = self.org1.member("observer");
        self.ledger
            .transact(&observer, |tx| query_round(tx, &auction_id(), RoundNumber(round)))
    }
}
