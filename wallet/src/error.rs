// SPDX-License-Identifier: CC0-1.0

//! Error types for the wallet core.

use std::io;

use thiserror::Error;

use crate::tx::TxState;

/// Main error type for the wallet core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Transaction error: {0}")]
    Tx(#[from] TxError),

    #[error("Transaction file error: {0}")]
    TxFile(#[from] TxFileError),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Decode and integrity failures mean the data cannot be trusted; nothing
    /// may proceed past them.
    pub fn is_untrusted_data(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Integrity(_))
            || matches!(self, Error::TxFile(TxFileError::Decode(_) | TxFileError::Integrity(_)))
            || matches!(self, Error::Tx(TxError::Decode(_) | TxError::Integrity(_)))
    }
}

/// Raw transaction bytes could not be parsed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Transaction truncated: needed {needed} bytes at offset {offset}, {remaining} left")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Illegal value for flag in transaction: {0:#04x}")]
    IllegalFlag(u8),

    #[error("More witness data than inputs with witnesses")]
    ExcessWitnessData,

    #[error("Witness flag set but no input carries witness data")]
    SuperfluousWitness,

    #[error("Negative value not permitted in transaction {0}")]
    NegativeValue(&'static str),

    #[error("Unrecognized script template: {0}")]
    UnrecognizedScript(String),

    #[error("{0} trailing bytes after lock time")]
    TrailingData(usize),

    #[error("Compact size {0} exceeds remaining transaction length")]
    OversizedCount(u64),

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid address {addr}: {reason}")]
    InvalidAddress {
        addr: String,
        reason: String,
    },
}

/// Daemon-returned transaction data disagrees with the wallet's own model.
///
/// Any of these may mean a compromised daemon is substituting outputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("Lock time is {found}, expected {expected}")]
    LockTime {
        expected: u32,
        found: u32,
    },

    #[error("Inputs in hex transaction data do not match those in the wallet transaction")]
    Inputs {
        wallet: Vec<(String, u32)>,
        hex: Vec<(String, u32)>,
    },

    #[error("Outputs in hex transaction data do not match those in the wallet transaction")]
    Outputs {
        wallet: Vec<(String, u64)>,
        hex: Vec<(String, u64)>,
    },

    #[error("Transaction ID {expected} does not match hex transaction data ({found})")]
    TxidMismatch {
        expected: String,
        found: String,
    },

    #[error("Coin txid mismatch {stage}: local {local}, daemon {daemon}")]
    CoinTxidMismatch {
        stage: &'static str,
        local: String,
        daemon: String,
    },

    #[error("Hex transaction data could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

/// Amount parsing and arithmetic errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount '{0}'")]
    Invalid(String),

    #[error("Amount '{amount}' has more than {decimals} decimal places")]
    TooPrecise {
        amount: String,
        decimals: u32,
    },

    #[error("Amount overflow")]
    Overflow,

    #[error("Amount underflow")]
    Underflow,
}

/// Transaction model errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TxError {
    #[error("{value}: duplicate {kind} in transaction {io}")]
    Duplicate {
        value: String,
        kind: &'static str,
        io: &'static str,
    },

    #[error("Transaction has no {0}")]
    Empty(&'static str),

    #[error("Cannot move transaction from {from:?} to {to:?}")]
    InvalidState {
        from: TxState,
        to: TxState,
    },

    #[error("Transaction has no signatures")]
    NoSignatures,

    #[error("Transaction input {0} has a missing signature")]
    MissingSignature(usize),

    #[error("Transaction input {0}: native P2WPKH spends are not supported")]
    NativeSegwitUnsupported(usize),

    #[error("Transaction input {index}: {reason}")]
    MalformedSignature {
        index: usize,
        reason: &'static str,
    },

    #[error("Transaction fee {fee} exceeds {proto} max_tx_fee {max}")]
    FeeTooLarge {
        fee: String,
        max: String,
        proto: String,
    },

    #[error("Output index {0} out of range")]
    OutputIndex(usize),

    #[error("Transaction {0} is not replaceable (RBF)")]
    NotReplaceable(String),

    #[error("Transaction is for {tx}, but current chain is {current}")]
    WrongChain {
        tx: String,
        current: String,
    },

    #[error("Outputs exceed inputs")]
    InsufficientFunds,

    #[error("Transaction has Segwit inputs or outputs, but {0} does not support Segwit")]
    SegwitUnsupported(String),

    #[error("'{0}': invalid transaction comment")]
    InvalidLabel(String),

    #[error("Transaction has no hex data")]
    NoHex,

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

/// Transaction file read and write errors.
#[derive(Debug, Error)]
pub enum TxFileError {
    #[error("Transaction file size {size} exceeds limit ({max} bytes)")]
    TooLarge {
        size: usize,
        max: usize,
    },

    #[error("Invalid {part} in transaction file: {reason}")]
    Invalid {
        part: &'static str,
        reason: String,
    },

    #[error("Transaction file: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transaction file: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Transaction file: {0}")]
    Tx(#[from] TxError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TxFileError {
    pub(crate) fn invalid(part: &'static str, reason: impl ToString) -> Self {
        TxFileError::Invalid {
            part,
            reason: reason.to_string(),
        }
    }
}

/// Type alias for Results with the main error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Type alias for decode results.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Type alias for transaction model results.
pub type TxResult<T> = std::result::Result<T, TxError>;

/// Type alias for transaction file results.
pub type TxFileResult<T> = std::result::Result<T, TxFileError>;
