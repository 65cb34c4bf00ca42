//! Transaction core for an offline cold-storage wallet.
//!
//! This library provides what the wallet needs to handle transactions whose
//! hex it receives from an untrusted coin daemon:
//!
//! - Decode raw UTXO transactions, segwit included, with a canonical
//!   unsigned form that signatures cannot change
//! - Classify P2PKH and P2SH output scripts and map them to addresses
//! - Model a transaction the wallet intends to send, with fee and size
//!   estimation and an `unsigned -> signed -> sent` lifecycle
//! - Compare daemon hex against that model before anything is signed or
//!   broadcast
//! - Read and write checksummed transaction files
//!
//! # Example
//!
//! ```no_run
//! use coldwallet::txfile;
//!
//! fn show(path: &std::path::Path) -> coldwallet::Result<()> {
//!     let tx = txfile::read_tx_file(path, txfile::DEFAULT_MAX_TX_FILE_SIZE)?;
//!     print!("{}", tx.format_view(false, None, false));
//!     Ok(())
//! }
//! ```

pub mod amount;
pub mod checksum;
pub mod deserialize;
pub mod error;
pub mod integrity;
pub mod mmid;
pub mod script;
pub mod transaction;
pub mod tx;
pub mod txfile;
pub mod varint;

// Re-export main types for convenience
pub use amount::Amount;
pub use coldwallet_network::{Coin, Family, Network, Protocol};
pub use deserialize::DeserializedTx;
pub use error::{
    AmountError, DecodeError, Error, IntegrityError, Result, TxError, TxFileError, TxFileResult, TxResult,
};
pub use mmid::{KeyType, WalletKeyId};
pub use transaction::{RBF_SEQUENCE, Transaction, Txid};
pub use tx::{FeeCheck, FeeSpec, Tx, TxInput, TxOutput, TxState, WalletTxid};
