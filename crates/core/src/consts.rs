//! Constant variables.
///
/// default size of the identifier ring (`MOD`)
pub const DEFAULT_MODULUS: u64 = 1024;
/// default number of finger table entries, log2 of [DEFAULT_MODULUS]
pub const DEFAULT_FINGER_TABLE_SIZE: u8 = 10;
/// default timeout of a single remote call in ms
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 1000;
/// default bound of forwarding hops for one lookup
pub const DEFAULT_MAX_LOOKUP_HOPS: u32 = 32;
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_FIX_FINGERS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS: u64 = 1000;
/// 1M, frames above this are rejected by the codec
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;
