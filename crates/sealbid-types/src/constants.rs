//! System-wide constants for the SealBid auction engine.

/// Separator between composite key components (and the key's leading byte).
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{0}';

/// Upper sentinel used as the exclusive end of a prefix range scan.
/// No key component may contain it.
pub const MAX_KEY_SENTINEL: char = '\u{10FFFF}';

/// Object type tag for bid records (private payload and public hash).
pub const BID_KEY_TYPE: &str = "bid";

/// Object type tag for ask records (private payload and public hash).
pub const ASK_KEY_TYPE: &str = "ask";

/// Object type tag for auction round records.
pub const AUCTION_KEY_TYPE: &str = "auction";

/// Literal component between the auction id and the round number.
pub const ROUND_KEY_COMPONENT: &str = "Round";

/// Object type tag for the marker written when an order is folded into a round.
pub const BINDING_KEY_TYPE: &str = "binding";

/// Default price increase between consecutive rounds.
pub const DEFAULT_PRICE_INCREMENT: i64 = 5;

/// Credential attribute carrying the caller's role.
pub const DEFAULT_ROLE_ATTRIBUTE: &str = "role";

/// Role value granting auction administration.
pub const DEFAULT_ADMIN_ROLE: &str = "auctionAdmin";

/// Role value granting read access to orders for dispute resolution.
pub const DEFAULT_AUDITOR_ROLE: &str = "auditor";

/// Domain separator prefixed to credential signing payloads.
pub const CREDENTIAL_DOMAIN: &[u8] = b"sealbid:credential:v1:";

/// Event emitted when round 0 of an auction is created.
pub const EVENT_CREATE_AUCTION: &str = "CreateAuction";

/// Event emitted when a follow-up round is opened.
pub const EVENT_CREATE_NEW_ROUND: &str = "CreateNewRound";

/// Event emitted when a round closes with demand covered.
pub const EVENT_CLOSE_ROUND: &str = "CloseRound";

/// Event emitted when an auction is finalized.
pub const EVENT_END_AUCTION: &str = "EndAuction";
