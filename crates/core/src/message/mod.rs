//! Wire messages exchanged between ring nodes.
mod payload;
pub use payload::decode;
pub use payload::encode;
pub use payload::Payload;

pub mod types;
pub use types::*;
