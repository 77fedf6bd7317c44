pub mod block;
pub mod constants;
pub mod error;
pub mod transaction;
pub mod types;

pub use block::Block;
pub use constants::*;
pub use error::UmbraError;
pub use transaction::{RingSignature, Transaction, TxInput, TxOutput, TxType};
pub use types::*;
