//! Protocol module containing message types and the KCS frame codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_request, encode_failure, encode_request, encode_response};
pub use codec::{DecodeError, EncodeError};
pub use messages::*;
pub use sequence::{TransactionCounter, TransactionId};
