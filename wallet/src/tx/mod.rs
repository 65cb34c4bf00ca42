// SPDX-License-Identifier: CC0-1.0

//! The wallet's own model of a transaction.
//!
//! A [`Tx`] is what the wallet believes it is signing and sending. Every
//! piece of hex that comes back from the daemon is checked against it before
//! being accepted.

mod fee;
mod sigs;
mod view;

use std::fmt;
use std::str::FromStr;

use coldwallet_network::Protocol;

pub use fee::{FeeCheck, FeeSpec, check_fee, fee_to_spb, spb_to_fee};

use crate::amount::Amount;
use crate::checksum::make_chksum_6;
use crate::deserialize::DeserializedTx;
use crate::error::{IntegrityError, TxError, TxResult};
use crate::integrity;
use crate::mmid::{KeyType, WalletKeyId};
use crate::script::parse_address;
use crate::transaction::{RBF_SEQUENCE, Txid};

/// Maximum length of a transaction comment, in characters.
pub const MAX_LABEL_LEN: usize = 72;

/// Lifecycle of a transaction. Only ever moves forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxState {
    Unsigned,
    Signed,
    Sent,
}

impl TxState {
    /// Transaction file extension for this state.
    pub fn file_ext(self) -> &'static str {
        match self {
            TxState::Unsigned => "rawtx",
            TxState::Signed => "sigtx",
            TxState::Sent => "subtx",
        }
    }

    pub fn desc(self) -> &'static str {
        match self {
            TxState::Unsigned => "transaction",
            TxState::Signed => "signed transaction",
            TxState::Sent => "sent transaction",
        }
    }
}

/// Six upper-case hex characters identifying a transaction independently of
/// its signatures.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletTxid(String);

impl WalletTxid {
    /// Derives the id from the canonical unsigned serialization.
    pub fn from_unsigned(unsigned: &[u8]) -> Self {
        WalletTxid(make_chksum_6(unsigned).to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletTxid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletTxid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
            Ok(WalletTxid(s.to_string()))
        } else {
            Err(format!("'{}': invalid transaction id", s))
        }
    }
}

/// An input the wallet is spending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub txid: Txid,
    pub vout: u32,
    pub amount: Amount,
    pub addr: String,
    /// Wallet key id, present when the address belongs to the wallet.
    pub mmid: Option<WalletKeyId>,
    pub label: Option<String>,
    pub confs: u64,
    pub script_pubkey: Vec<u8>,
    pub sequence: Option<u32>,
}

/// An output the wallet is creating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub addr: String,
    pub amount: Amount,
    pub mmid: Option<WalletKeyId>,
    pub label: Option<String>,
    pub is_chg: bool,
}

impl TxOutput {
    pub fn new(addr: impl Into<String>, amount: Amount) -> Self {
        Self {
            addr: addr.into(),
            amount,
            mmid: None,
            label: None,
            is_chg: false,
        }
    }
}

/// A transaction under construction, signed, or sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    proto: Protocol,
    /// Token symbol for token transactions.
    pub token: Option<String>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Raw serialized transaction, unsigned or signed.
    pub hex: String,
    pub txid: Option<WalletTxid>,
    /// On-chain id, known once signed.
    pub coin_txid: Option<Txid>,
    /// Creation or broadcast time, `YYYYMMDD_HHMMSS` UTC.
    pub timestamp: String,
    /// Block height observed at creation or broadcast.
    pub blockcount: u64,
    pub locktime: Option<u32>,
    /// Free-form transaction comment.
    pub label: Option<String>,
    state: TxState,
}

impl Tx {
    /// An empty, unsigned transaction.
    pub fn new(proto: Protocol) -> Self {
        Self {
            proto,
            token: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            hex: String::new(),
            txid: None,
            coin_txid: None,
            timestamp: String::new(),
            blockcount: 0,
            locktime: None,
            label: None,
            state: TxState::Unsigned,
        }
    }

    pub fn proto(&self) -> &Protocol {
        &self.proto
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Chain name recorded with the transaction.
    pub fn chain(&self) -> &'static str {
        self.proto.chain_name()
    }

    pub fn decimals(&self) -> u32 {
        self.proto.decimals()
    }

    /// Refuses to operate on a transaction created for another chain.
    pub fn check_chain(&self, current_chain: &str) -> TxResult<()> {
        if self.chain() != current_chain {
            return Err(TxError::WrongChain {
                tx: self.chain().to_string(),
                current: current_chain.to_string(),
            });
        }
        Ok(())
    }

    /// Appends an output after checking the address is valid for this chain.
    pub fn add_output(&mut self, addr: &str, amount: Amount, is_chg: bool) -> TxResult<()> {
        parse_address(addr, &self.proto)?;
        self.outputs.push(TxOutput {
            is_chg,
            ..TxOutput::new(addr, amount)
        });
        Ok(())
    }

    pub fn del_output(&mut self, idx: usize) -> TxResult<TxOutput> {
        if idx >= self.outputs.len() {
            return Err(TxError::OutputIndex(idx));
        }
        Ok(self.outputs.remove(idx))
    }

    pub fn update_output_amount(&mut self, idx: usize, amount: Amount) -> TxResult<()> {
        self.outputs.get_mut(idx).ok_or(TxError::OutputIndex(idx))?.amount = amount;
        Ok(())
    }

    /// Index of the change output, if any.
    pub fn chg_output_idx(&self) -> Option<usize> {
        self.outputs.iter().position(|o| o.is_chg)
    }

    pub fn sum_inputs(&self) -> TxResult<Amount> {
        Ok(Amount::try_sum(self.inputs.iter().map(|i| i.amount))?)
    }

    /// Sum of outputs, optionally leaving one out.
    pub fn sum_outputs(&self, exclude: Option<usize>) -> TxResult<Amount> {
        let amounts = self
            .outputs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(_, o)| o.amount);
        Ok(Amount::try_sum(amounts)?)
    }

    /// Total paid out, change excluded.
    pub fn send_amount(&self) -> TxResult<Amount> {
        Ok(Amount::try_sum(self.outputs.iter().filter(|o| !o.is_chg).map(|o| o.amount))?)
    }

    /// Inputs minus outputs.
    pub fn fee(&self) -> TxResult<Amount> {
        self.sum_inputs()?.checked_sub(self.sum_outputs(None)?).map_err(|_| TxError::InsufficientFunds)
    }

    /// Rejects duplicate wallet key ids or addresses among inputs or outputs.
    pub fn check_dup_addrs(&self) -> TxResult<()> {
        fn check(
            values: impl Iterator<Item = String>,
            kind: &'static str,
            io: &'static str,
        ) -> TxResult<()> {
            let mut values: Vec<String> = values.collect();
            values.sort();
            match values.windows(2).find(|w| w[0] == w[1]) {
                Some(w) => Err(TxError::Duplicate {
                    value: w[0].clone(),
                    kind,
                    io,
                }),
                None => Ok(()),
            }
        }
        check(self.inputs.iter().filter_map(|i| i.mmid.as_ref().map(|m| m.to_string())), "key id", "inputs")?;
        check(self.inputs.iter().map(|i| i.addr.clone()), "address", "inputs")?;
        check(self.outputs.iter().filter_map(|o| o.mmid.as_ref().map(|m| m.to_string())), "key id", "outputs")?;
        check(self.outputs.iter().map(|o| o.addr.clone()), "address", "outputs")
    }

    /// Whether any wallet input is a segwit-in-P2SH key.
    pub fn has_segwit_inputs(&self) -> bool {
        self.inputs.iter().any(|i| is_segwit_key(i.mmid.as_ref()))
    }

    pub fn has_segwit_outputs(&self) -> bool {
        self.outputs.iter().any(|o| is_segwit_key(o.mmid.as_ref()))
    }

    /// Wallet key seed ids used by the inputs.
    pub fn input_seed_ids(&self) -> Vec<&str> {
        let mut sids: Vec<&str> = self.inputs.iter().filter_map(|i| i.mmid.as_ref().map(|m| m.seed_id())).collect();
        sids.sort_unstable();
        sids.dedup();
        sids
    }

    /// Addresses of inputs not owned by the wallet.
    pub fn non_wallet_input_addrs(&self) -> Vec<&str> {
        let mut addrs: Vec<&str> = self.inputs.iter().filter(|i| i.mmid.is_none()).map(|i| i.addr.as_str()).collect();
        addrs.sort_unstable();
        addrs.dedup();
        addrs
    }

    /// Whether the first input signals replace-by-fee.
    pub fn is_rbf(&self) -> bool {
        self.inputs.first().is_some_and(|i| i.sequence == Some(RBF_SEQUENCE))
    }

    pub fn signal_for_rbf(&mut self) {
        if let Some(first) = self.inputs.first_mut() {
            first.sequence = Some(RBF_SEQUENCE);
        }
    }

    /// Sets or clears the transaction comment.
    pub fn set_label(&mut self, label: &str) -> TxResult<()> {
        if label.chars().count() > MAX_LABEL_LEN || label.chars().any(char::is_control) {
            return Err(TxError::InvalidLabel(label.to_string()));
        }
        self.label = (!label.is_empty()).then(|| label.to_string());
        Ok(())
    }

    pub fn add_timestamp(&mut self) {
        self.timestamp = make_timestamp();
    }

    /// Records the daemon's unsigned hex, computing the wallet txid from it.
    ///
    /// The hex is checked against the model before it is accepted.
    pub fn set_raw_hex(&mut self, raw_hex: &str) -> TxResult<()> {
        if self.state != TxState::Unsigned {
            return Err(TxError::InvalidState {
                from: self.state,
                to: TxState::Unsigned,
            });
        }
        let dt = DeserializedTx::from_hex(raw_hex, &self.proto)?;
        let unsigned = hex::decode(&dt.unsigned_hex).map_err(crate::error::DecodeError::from)?;
        let txid = WalletTxid::from_unsigned(&unsigned);
        let previous = self.txid.replace(txid);
        if let Err(e) = integrity::check_hex_matches(self, &dt) {
            self.txid = previous;
            return Err(e.into());
        }
        self.hex = raw_hex.to_string();
        Ok(())
    }

    /// Accepts signed hex returned by the daemon.
    ///
    /// The hex must match the model and carry valid-looking signatures on
    /// every input; only then is it stored and the state moved to signed.
    pub fn accept_signed_hex(&mut self, signed_hex: &str) -> TxResult<()> {
        if self.state != TxState::Unsigned {
            return Err(TxError::InvalidState {
                from: self.state,
                to: TxState::Signed,
            });
        }
        let dt = DeserializedTx::from_hex(signed_hex, &self.proto)?;
        integrity::check_hex_matches(self, &dt)?;
        if !sigs::verify_sigs(&dt)? {
            return Err(TxError::NoSignatures);
        }
        self.hex = signed_hex.to_string();
        self.coin_txid = Some(dt.txid);
        self.state = TxState::Signed;
        Ok(())
    }

    /// Inspects the signatures in `self.hex`.
    ///
    /// Returns false when no input carries any signature data, and marks the
    /// transaction signed when every input does. This is the only way a
    /// transaction loaded from a file becomes signed.
    pub fn check_sigs(&mut self) -> TxResult<bool> {
        if self.hex.is_empty() {
            return Err(TxError::NoHex);
        }
        let dt = DeserializedTx::from_hex(&self.hex, &self.proto)?;
        let signed = sigs::verify_sigs(&dt)?;
        if signed && self.state == TxState::Unsigned {
            if self.coin_txid.is_some() {
                self.verify_coin_txid(&dt.txid, "in transaction file")?;
            }
            self.coin_txid = Some(dt.txid);
            self.state = TxState::Signed;
        }
        Ok(signed)
    }

    /// Compares a txid reported by the daemon with the one computed locally.
    pub fn verify_coin_txid(&self, daemon_txid: &Txid, stage: &'static str) -> TxResult<()> {
        match &self.coin_txid {
            Some(local) if local == daemon_txid => Ok(()),
            local => Err(IntegrityError::CoinTxidMismatch {
                stage,
                local: local.map(|t| t.to_string()).unwrap_or_default(),
                daemon: daemon_txid.to_string(),
            }
            .into()),
        }
    }

    /// Moves a signed transaction to sent once the daemon has accepted it.
    pub fn mark_sent(&mut self, daemon_txid: &Txid, blockcount: u64) -> TxResult<()> {
        if self.state != TxState::Signed {
            return Err(TxError::InvalidState {
                from: self.state,
                to: TxState::Sent,
            });
        }
        self.verify_coin_txid(daemon_txid, "after sending")?;
        self.state = TxState::Sent;
        self.add_timestamp();
        self.blockcount = blockcount;
        Ok(())
    }

    /// Checks the fee against the protocol ceiling.
    pub fn check_max_fee(&self) -> TxResult<()> {
        let fee = self.fee()?;
        if let Some(max) = self.proto.max_tx_fee().map(Amount::from_sat) {
            if fee > max {
                return Err(TxError::FeeTooLarge {
                    fee: fee.to_string_in(self.decimals()),
                    max: max.to_string_in(self.decimals()),
                    proto: self.proto.cls_name(),
                });
            }
        }
        Ok(())
    }

    /// A fresh unsigned replacement for a replaceable transaction. The source
    /// is left as it is.
    pub fn new_bump(src: &Tx) -> TxResult<Tx> {
        if !src.is_rbf() {
            return Err(TxError::NotReplaceable(src.txid.as_ref().map(|t| t.to_string()).unwrap_or_default()));
        }
        Ok(Tx {
            token: src.token.clone(),
            inputs: src.inputs.clone(),
            outputs: src.outputs.clone(),
            locktime: src.locktime,
            label: src.label.clone(),
            ..Tx::new(src.proto)
        })
    }

    /// Deducts the fee increase from output `idx`.
    pub fn apply_bump_fee(&mut self, idx: usize, new_fee: Amount) -> TxResult<()> {
        let old_fee = self.fee()?;
        let delta = new_fee.checked_sub(old_fee)?;
        let out = self.outputs.get_mut(idx).ok_or(TxError::OutputIndex(idx))?;
        out.amount = out.amount.checked_sub(delta).map_err(|_| TxError::InsufficientFunds)?;
        Ok(())
    }
}

fn is_segwit_key(mmid: Option<&WalletKeyId>) -> bool {
    mmid.is_some_and(|m| m.key_type() == KeyType::Segwit)
}

/// `YYYYMMDD_HHMMSS` in UTC.
pub fn make_timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use coldwallet_network::{Coin, Network};

    use super::*;

    pub(crate) const SEGWIT_TX: &str = "02000000000101111111111111111111111111111111111111111111111111111111111111111101000000171600140123456789abcdef0123456789abcdef01234567fdffffff0280d1f008000000001976a91400112233445566778899aabbccddeeff0011223388ac70c9fa020000000017a914ffeeddccbbaa99887766554433221100ffeeddcc870248300102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f40414243444546472102abababababababababababababababababababababababababababababababab00000000";
    pub(crate) const SEGWIT_UNSIGNED: &str = "020000000111111111111111111111111111111111111111111111111111111111111111110100000000fdffffff0280d1f008000000001976a91400112233445566778899aabbccddeeff0011223388ac70c9fa020000000017a914ffeeddccbbaa99887766554433221100ffeeddcc8700000000";

    /// The model matching `SEGWIT_UNSIGNED`: one segwit input of 2.0, a 1.5
    /// payment, a change output, fee 0.0001.
    pub(crate) fn sample_tx() -> Tx {
        let proto = Protocol::new(Coin::Btc, Network::Mainnet);
        let mut tx = Tx::new(proto);
        tx.inputs.push(TxInput {
            txid: "1111111111111111111111111111111111111111111111111111111111111111".parse().unwrap(),
            vout: 1,
            amount: Amount::from_sat(200_000_000),
            addr: "3BzR1UVvzmW4Ytwhd8F2kTkH84zNiuqkMX".to_string(),
            mmid: Some("F00BAA12:S:1".parse().unwrap()),
            label: None,
            confs: 3,
            script_pubkey: hex::decode("a9146e7fa8d4a4ac57e9b8e05e4e6c3dfb1bc3226c4b87").unwrap(),
            sequence: Some(RBF_SEQUENCE),
        });
        tx.add_output("11MXTrefsj1ZS3Q5e9D6DxGzZKHWALyo9", Amount::from_sat(150_000_000), false).unwrap();
        tx.add_output("3R2GPBw5bD4FMAo84srhpXgSnUENhSXpay", Amount::from_sat(49_990_000), true).unwrap();
        tx.outputs[1].mmid = Some("F00BAA12:S:2".parse().unwrap());
        tx.timestamp = "20240101_120000".to_string();
        tx.blockcount = 830000;
        tx
    }

    #[test]
    fn test_amounts() {
        let tx = sample_tx();
        assert_eq!(tx.sum_inputs().unwrap(), Amount::from_sat(200_000_000));
        assert_eq!(tx.sum_outputs(None).unwrap(), Amount::from_sat(199_990_000));
        assert_eq!(tx.sum_outputs(Some(1)).unwrap(), Amount::from_sat(150_000_000));
        assert_eq!(tx.send_amount().unwrap(), Amount::from_sat(150_000_000));
        assert_eq!(tx.fee().unwrap(), Amount::from_sat(10_000));
        assert_eq!(tx.chg_output_idx(), Some(1));
        assert!(tx.is_rbf());
        assert!(tx.has_segwit_inputs());
        assert!(tx.has_segwit_outputs());
    }

    #[test]
    fn test_state_machine() {
        let mut tx = sample_tx();
        tx.set_raw_hex(SEGWIT_UNSIGNED).unwrap();
        assert_eq!(tx.txid.as_ref().unwrap().as_str(), "EEF1BF");
        assert!(!tx.check_sigs().unwrap());
        assert_eq!(tx.state(), TxState::Unsigned);

        let sent_txid: Txid = "571efea453dd2ca8fa254c2aefb7ecdd143139a2e0aaefc07439b7f95dcf250d".parse().unwrap();
        assert_matches!(tx.mark_sent(&sent_txid, 1), Err(TxError::InvalidState { .. }));

        tx.accept_signed_hex(SEGWIT_TX).unwrap();
        assert_eq!(tx.state(), TxState::Signed);
        assert_eq!(tx.txid.as_ref().unwrap().as_str(), "EEF1BF");
        assert_eq!(tx.coin_txid, Some(sent_txid));
        assert_matches!(tx.accept_signed_hex(SEGWIT_TX), Err(TxError::InvalidState { .. }));

        let other: Txid = "00".repeat(32).parse().unwrap();
        assert_matches!(tx.mark_sent(&other, 1), Err(TxError::Integrity(_)));
        assert_eq!(tx.state(), TxState::Signed);
        tx.mark_sent(&sent_txid, 830001).unwrap();
        assert_eq!(tx.state(), TxState::Sent);
        assert_eq!(tx.blockcount, 830001);
    }

    #[test]
    fn test_accept_signed_hex_rejects_unsigned() {
        let mut tx = sample_tx();
        tx.set_raw_hex(SEGWIT_UNSIGNED).unwrap();
        assert_matches!(tx.accept_signed_hex(SEGWIT_UNSIGNED), Err(TxError::NoSignatures));
        assert_eq!(tx.state(), TxState::Unsigned);
        assert_eq!(tx.hex, SEGWIT_UNSIGNED);
    }

    #[test]
    fn test_set_raw_hex_rejects_tampered_outputs() {
        let mut tx = sample_tx();
        tx.outputs[0].amount = Amount::from_sat(140_000_000);
        assert_matches!(tx.set_raw_hex(SEGWIT_UNSIGNED), Err(TxError::Integrity(IntegrityError::Outputs { .. })));
        assert!(tx.txid.is_none());
        assert!(tx.hex.is_empty());
    }

    #[test]
    fn test_dup_addrs() {
        let mut tx = sample_tx();
        tx.check_dup_addrs().unwrap();
        let dup = tx.outputs[0].clone();
        tx.outputs.push(dup);
        assert_matches!(tx.check_dup_addrs(), Err(TxError::Duplicate { kind: "address", io: "outputs", .. }));

        let mut tx = sample_tx();
        let mut second = tx.inputs[0].clone();
        second.vout = 2;
        second.addr = "1KhAQw5BU3i4G8BDGpw8YqUKRLuW3mQdh".into();
        tx.inputs.push(second);
        assert_matches!(tx.check_dup_addrs(), Err(TxError::Duplicate { kind: "key id", io: "inputs", .. }));
    }

    #[test]
    fn test_max_fee() {
        let mut tx = sample_tx();
        tx.check_max_fee().unwrap();
        tx.update_output_amount(1, Amount::from_sat(1_000_000)).unwrap();
        assert_matches!(tx.check_max_fee(), Err(TxError::FeeTooLarge { .. }));
    }

    #[test]
    fn test_bump() {
        let mut tx = sample_tx();
        tx.label = Some("rent".into());
        tx.set_raw_hex(SEGWIT_UNSIGNED).unwrap();
        tx.accept_signed_hex(SEGWIT_TX).unwrap();
        let signed = tx.clone();

        let mut bump = Tx::new_bump(&tx).unwrap();
        assert_eq!(tx, signed);
        assert_eq!(tx.state(), TxState::Signed);
        assert!(tx.coin_txid.is_some());

        assert_eq!(bump.state(), TxState::Unsigned);
        assert!(bump.hex.is_empty());
        assert!(bump.txid.is_none());
        assert!(bump.coin_txid.is_none());
        assert_eq!(bump.inputs, tx.inputs);
        assert_eq!(bump.outputs, tx.outputs);
        assert_eq!(bump.locktime, tx.locktime);
        assert_eq!(bump.label.as_deref(), Some("rent"));

        bump.apply_bump_fee(1, Amount::from_sat(25_000)).unwrap();
        assert_eq!(bump.fee().unwrap(), Amount::from_sat(25_000));
        assert_eq!(bump.outputs[1].amount, Amount::from_sat(49_975_000));
        assert_eq!(tx.outputs, signed.outputs);

        tx.inputs[0].sequence = None;
        assert_matches!(Tx::new_bump(&tx), Err(TxError::NotReplaceable(_)));
    }

    #[test]
    fn test_check_chain() {
        let tx = sample_tx();
        tx.check_chain("mainnet").unwrap();
        assert_matches!(tx.check_chain("testnet"), Err(TxError::WrongChain { .. }));
    }

    #[test]
    fn test_wallet_txid_parse() {
        assert!("EEF1BF".parse::<WalletTxid>().is_ok());
        assert!("eef1bf".parse::<WalletTxid>().is_err());
        assert!("EEF1B".parse::<WalletTxid>().is_err());
    }
}
