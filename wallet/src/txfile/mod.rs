// SPDX-License-Identifier: CC0-1.0

//! Checksummed transaction files.
//!
//! Layout, one item per line:
//!
//! ```text
//! checksum                 6 hex chars over lines 2.. joined by spaces
//! metadata                 [COIN[:TOKEN]] CHAIN TXID SEND_AMOUNT TIMESTAMP BLOCKCOUNT [LT=n]
//! hex                      raw transaction
//! inputs                   ASCII literal list of input records
//! outputs                  ASCII literal list of output records
//! comment (optional)       base58 UTF-8, or "-" when only the coin txid follows
//! coin txid (optional)     64 hex chars
//! ```

pub mod literal;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use coldwallet_network::{Coin, Family, Network, Protocol};
use tracing::{debug, info};

use self::literal::Literal;
use crate::amount::Amount;
use crate::checksum::make_chksum_6;
use crate::deserialize::DeserializedTx;
use crate::error::{TxFileError, TxFileResult};
use crate::integrity::check_hex_matches;
use crate::mmid::WalletKeyId;
use crate::script::parse_address;
use crate::transaction::Txid;
use crate::tx::{MAX_LABEL_LEN, Tx, TxInput, TxOutput, WalletTxid};

/// Default cap on transaction file size, in bytes.
pub const DEFAULT_MAX_TX_FILE_SIZE: usize = 100_000;

const MAX_METADATA_LEN: usize = 100;

/// The metadata block of a transaction file, readable without knowing the
/// coin in advance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxMetadata {
    pub proto: Protocol,
    pub token: Option<String>,
    pub txid: WalletTxid,
    pub send_amount: String,
    pub timestamp: String,
    pub blockcount: u64,
    pub locktime: Option<u32>,
    pub label: Option<String>,
    pub coin_txid: Option<Txid>,
}

struct RawFile<'a> {
    metadata: TxMetadata,
    hex: &'a str,
    inputs: &'a str,
    outputs: &'a str,
}

/// Reads only the metadata of a transaction file.
pub fn parse_metadata(data: &str, max_size: usize) -> TxFileResult<TxMetadata> {
    split(data, max_size).map(|raw| raw.metadata)
}

/// Parses a complete transaction file.
///
/// For UTXO coins the hex is decoded and checked against the inputs and
/// outputs; a file whose hex carries signatures comes back signed.
pub fn parse(data: &str, max_size: usize) -> TxFileResult<Tx> {
    let raw = split(data, max_size)?;
    let md = raw.metadata;
    let dec = md.proto.decimals();
    let is_utxo = md.proto.family() == Family::Bitcoin;

    if raw.hex.is_empty() || (is_utxo && hex::decode(raw.hex).is_err()) {
        return Err(TxFileError::invalid("transaction file hex data", "not a hex string"));
    }

    let mut tx = Tx::new(md.proto);
    tx.token = md.token;
    tx.txid = Some(md.txid);
    tx.timestamp = md.timestamp;
    tx.blockcount = md.blockcount;
    tx.locktime = md.locktime;
    tx.label = md.label;
    tx.coin_txid = md.coin_txid;
    tx.hex = raw.hex.to_string();

    tx.inputs = records(raw.inputs, "inputs data")?
        .into_iter()
        .map(|r| r.into_input(dec))
        .collect::<Result<_, _>>()
        .map_err(|e| TxFileError::invalid("inputs data", e))?;
    if tx.inputs.is_empty() {
        return Err(TxFileError::invalid("inputs data", "no inputs!"));
    }

    tx.outputs = records(raw.outputs, "outputs data")?
        .into_iter()
        .map(|r| r.into_output(dec))
        .collect::<Result<_, _>>()
        .map_err(|e| TxFileError::invalid("outputs data", e))?;
    if tx.outputs.is_empty() && is_utxo {
        return Err(TxFileError::invalid("outputs data", "no outputs!"));
    }
    if is_utxo {
        for o in &tx.outputs {
            parse_address(&o.addr, tx.proto()).map_err(|e| TxFileError::invalid("outputs data", e))?;
        }
    }

    let send_amount = Amount::from_str_in(&md.send_amount, dec)
        .map_err(|e| TxFileError::invalid("send amount in metadata", e))?;
    let computed = tx.send_amount()?;
    if send_amount != computed {
        return Err(TxFileError::invalid(
            "send amount in metadata",
            format!("{} != {}", md.send_amount, computed.to_string_in(dec)),
        ));
    }

    if is_utxo {
        let dt = DeserializedTx::from_hex(&tx.hex, tx.proto())?;
        check_hex_matches(&tx, &dt)?;
        tx.check_sigs()?;
    }
    Ok(tx)
}

fn split(data: &str, max_size: usize) -> TxFileResult<RawFile<'_>> {
    if data.len() > max_size {
        return Err(TxFileError::TooLarge {
            size: data.len(),
            max: max_size,
        });
    }
    let mut lines: Vec<&str> = data.lines().collect();
    if lines.len() < 5 {
        return Err(TxFileError::invalid("data", "number of lines less than 5"));
    }
    let chksum = lines.remove(0);
    if chksum.len() != 6 {
        return Err(TxFileError::invalid("data", "invalid length of first line"));
    }
    if chksum != make_chksum_6(lines.join(" ").as_bytes()) {
        return Err(TxFileError::invalid("data", "file data does not match checksum"));
    }

    let mut coin_txid = None;
    if lines.len() == 6 {
        let last = lines.pop().unwrap_or_default();
        if last.len() != 64 {
            return Err(TxFileError::invalid("data", "invalid coin TxID length"));
        }
        coin_txid = Some(Txid::from_str(last).map_err(|e| TxFileError::invalid("coin TxID", e))?);
    }

    let mut label = None;
    if lines.len() == 5 {
        let c = lines.pop().unwrap_or_default();
        if c.len() >= MAX_LABEL_LEN * 6 {
            return Err(TxFileError::invalid("data", "invalid comment length"));
        }
        if c != "-" {
            let bytes = bs58::decode(c)
                .into_vec()
                .map_err(|e| TxFileError::invalid("encoded comment (not base58)", e))?;
            let comment = String::from_utf8(bytes)
                .map_err(|e| TxFileError::invalid("encoded comment (not base58)", e))?;
            if comment.chars().count() > MAX_LABEL_LEN || comment.chars().any(char::is_control) {
                return Err(TxFileError::invalid("comment", "invalid comment"));
            }
            label = Some(comment);
        }
    }

    let &[metadata, hex, inputs, outputs] = lines.as_slice() else {
        return Err(TxFileError::invalid("number of lines", format!("{} lines", lines.len() + 1)));
    };
    if metadata.len() >= MAX_METADATA_LEN {
        return Err(TxFileError::invalid("metadata", "invalid metadata length"));
    }
    let mut md: Vec<&str> = metadata.split_whitespace().collect();

    let mut locktime = None;
    if let Some(lt) = md.last().and_then(|s| s.strip_prefix("LT=")) {
        locktime = Some(lt.parse::<u32>().map_err(|e| TxFileError::invalid("locktime", e))?);
        md.pop();
    }

    let coin_id = if md.len() == 6 { md.remove(0) } else { "BTC" };
    let (coin, token) = match coin_id.split_once(':') {
        Some((c, t)) => (c, Some(t.to_string())),
        None => (coin_id, None),
    };
    let coin = Coin::from_str(coin).map_err(|e| TxFileError::invalid("coin token in metadata", e))?;

    let chain = if md.len() == 5 { md.remove(0).to_lowercase() } else { "mainnet".to_string() };
    let proto = match chain.as_str() {
        "unknown" => Protocol::new(coin, Network::Mainnet),
        chain => Protocol::from_chain_name(coin, chain)
            .or_else(|e| chain.parse::<Network>().map(|n| Protocol::new(coin, n)).map_err(|_| e))
            .map_err(|e| TxFileError::invalid("chain token in metadata", e))?,
    };

    let &[txid, send_amount, timestamp, blockcount] = md.as_slice() else {
        return Err(TxFileError::invalid("metadata (4 items)", format!("{} items", md.len())));
    };
    let txid = WalletTxid::from_str(txid).map_err(|e| TxFileError::invalid("TxID in metadata", e))?;
    let blockcount = blockcount.parse().map_err(|e| TxFileError::invalid("block count in metadata", e))?;

    Ok(RawFile {
        metadata: TxMetadata {
            proto,
            token,
            txid,
            send_amount: send_amount.to_string(),
            timestamp: timestamp.to_string(),
            blockcount,
            locktime,
            label,
            coin_txid,
        },
        hex,
        inputs,
        outputs,
    })
}

/// Formats `tx` as file contents.
pub fn format(tx: &Tx, max_size: usize) -> TxFileResult<String> {
    let dec = tx.decimals();
    let txid = tx.txid.as_ref().ok_or_else(|| TxFileError::invalid("TxID in metadata", "transaction has no ID"))?;

    let coin = tx.proto().coin();
    let coin_id = match (coin, &tx.token) {
        (Coin::Btc, _) => String::new(),
        (c, Some(token)) => format!("{}:{} ", c.symbol(), token.to_uppercase()),
        (c, None) => format!("{} ", c.symbol()),
    };
    let locktime = tx.locktime.filter(|lt| *lt != 0).map(|lt| format!(" LT={}", lt)).unwrap_or_default();
    let mut lines = vec![
        format!(
            "{}{} {} {} {} {}{}",
            coin_id,
            tx.chain().to_uppercase(),
            txid,
            tx.send_amount()?.to_string_in(dec),
            tx.timestamp,
            tx.blockcount,
            locktime
        ),
        tx.hex.clone(),
        Literal::List(tx.inputs.iter().map(|i| input_to_literal(i, dec)).collect()).to_string(),
        Literal::List(tx.outputs.iter().map(|o| output_to_literal(o, dec)).collect()).to_string(),
    ];
    if let Some(label) = &tx.label {
        lines.push(bs58::encode(label.as_bytes()).into_string());
    }
    if let Some(coin_txid) = &tx.coin_txid {
        if tx.label.is_none() {
            lines.push("-".to_string());
        }
        lines.push(coin_txid.to_string());
    }

    let chksum = make_chksum_6(lines.join(" ").as_bytes());
    let mut data = chksum;
    for line in &lines {
        data.push('\n');
        data.push_str(line);
    }
    data.push('\n');
    if data.len() > max_size {
        return Err(TxFileError::TooLarge {
            size: data.len(),
            max: max_size,
        });
    }
    Ok(data)
}

/// `TXID[-COIN][SENDAMT[,FEE_SPB][,tl=LOCKTIME]][.NETWORK].EXT`
pub fn make_filename(tx: &Tx) -> TxFileResult<String> {
    let txid = tx.txid.as_ref().ok_or_else(|| TxFileError::invalid("TxID in metadata", "transaction has no ID"))?;
    let mut name = txid.to_string();
    let coin = tx.proto().coin();
    if coin != Coin::Btc {
        let dcoin = tx.token.as_deref().map(str::to_uppercase).unwrap_or_else(|| coin.symbol().to_string());
        name.push('-');
        name.push_str(&dcoin);
    }
    name.push('[');
    name.push_str(&tx.send_amount()?.to_string_in(tx.decimals()));
    if tx.is_rbf() {
        if let Some(spb) = tx.fee().ok().and_then(|fee| tx.fee_to_spb(fee)) {
            name.push_str(&format!(",{}", spb));
        }
    }
    if let Some(lt) = tx.locktime.filter(|lt| *lt != 0) {
        name.push_str(&format!(",tl={}", lt));
    }
    name.push(']');
    if tx.proto().is_testnet() {
        name.push('.');
        name.push_str(&tx.proto().network().to_string());
    }
    name.push('.');
    name.push_str(tx.state().file_ext());
    Ok(name)
}

/// Reads and parses a transaction file.
pub fn read_tx_file(path: &Path, max_size: usize) -> TxFileResult<Tx> {
    let size = fs::metadata(path)?.len();
    if size > max_size as u64 {
        return Err(TxFileError::TooLarge {
            size: size as usize,
            max: max_size,
        });
    }
    let data = fs::read_to_string(path)?;
    let tx = parse(&data, max_size)?;
    debug!(path = %path.display(), state = ?tx.state(), "read transaction file");
    Ok(tx)
}

/// Writes `tx` into `dir` under its canonical filename.
pub fn write_tx_file(tx: &Tx, dir: &Path, max_size: usize) -> TxFileResult<PathBuf> {
    let data = format(tx, max_size)?;
    let path = dir.join(make_filename(tx)?);
    atomic_write(&path, data.as_bytes())?;
    info!("{} written to file '{}'", tx.state().desc(), path.display());
    Ok(path)
}

/// Writes via a temporary file in the same directory, then renames.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn records(line: &str, part: &'static str) -> TxFileResult<Vec<Record>> {
    let lit = Literal::parse(line).map_err(|e| TxFileError::invalid(part, e))?;
    let Literal::List(items) = lit else {
        return Err(TxFileError::invalid(part, "data not a list"));
    };
    items
        .into_iter()
        .map(|item| match item {
            Literal::Dict(entries) => Ok(Record::new(entries)),
            _ => Err(TxFileError::invalid(part, "record not a dict")),
        })
        .collect()
}

/// One input or output record, with old-format key names normalized.
struct Record(Vec<(String, Literal)>);

impl Record {
    fn new(entries: Vec<(String, Literal)>) -> Self {
        let normalized = entries
            .into_iter()
            .map(|(k, v)| {
                let k = match k.as_str() {
                    "amount" => "amt".to_string(),
                    "address" => "addr".to_string(),
                    "confirmations" => "confs".to_string(),
                    "comment" => "label".to_string(),
                    _ => k,
                };
                (k, v)
            })
            .collect();
        Record(normalized)
    }

    fn check_keys(&self, allowed: &[&str]) -> Result<(), String> {
        match self.0.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
            Some((k, _)) => Err(format!("unexpected key '{}'", k)),
            None => Ok(()),
        }
    }

    fn get(&self, key: &str) -> Option<&Literal> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn str(&self, key: &str) -> Result<&str, String> {
        self.get(key).and_then(Literal::as_str).ok_or_else(|| format!("missing or invalid '{}'", key))
    }

    fn opt_str(&self, key: &str) -> Result<Option<&str>, String> {
        match self.get(key) {
            None | Some(Literal::None) => Ok(None),
            Some(Literal::Str(s)) if s.is_empty() => Ok(None),
            Some(Literal::Str(s)) => Ok(Some(s)),
            Some(_) => Err(format!("invalid '{}'", key)),
        }
    }

    fn int(&self, key: &str) -> Result<Option<u64>, String> {
        match self.get(key) {
            None | Some(Literal::None) => Ok(None),
            Some(v) => v
                .as_int()
                .and_then(|n| u64::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| format!("invalid '{}'", key)),
        }
    }

    fn amount(&self, dec: u32) -> Result<Amount, String> {
        let s = match self.get("amt") {
            Some(Literal::Str(s)) => s.clone(),
            Some(Literal::Int(n)) => n.to_string(),
            _ => return Err("missing or invalid 'amt'".to_string()),
        };
        Amount::from_str_in(&s, dec).map_err(|e| e.to_string())
    }

    fn mmid(&self) -> Result<Option<WalletKeyId>, String> {
        self.opt_str("mmid")?.map(|s| s.parse().map_err(|e: crate::mmid::KeyIdError| e.to_string())).transpose()
    }

    fn into_input(self, dec: u32) -> Result<TxInput, String> {
        self.check_keys(&["vout", "amt", "label", "mmid", "addr", "confs", "txid", "scriptPubKey", "sequence"])?;
        let vout = self.int("vout")?.ok_or("missing 'vout'")?;
        let sequence = self.int("sequence")?;
        Ok(TxInput {
            txid: self.str("txid")?.parse().map_err(|e: crate::error::DecodeError| e.to_string())?,
            vout: u32::try_from(vout).map_err(|_| "invalid 'vout'")?,
            amount: self.amount(dec)?,
            addr: self.str("addr")?.to_string(),
            mmid: self.mmid()?,
            label: self.opt_str("label")?.map(str::to_string),
            confs: self.int("confs")?.unwrap_or(0),
            script_pubkey: hex::decode(self.str("scriptPubKey")?).map_err(|e| e.to_string())?,
            sequence: sequence.map(u32::try_from).transpose().map_err(|_| "invalid 'sequence'")?,
        })
    }

    fn into_output(self, dec: u32) -> Result<TxOutput, String> {
        self.check_keys(&["amt", "label", "mmid", "addr", "is_chg"])?;
        let is_chg = match self.get("is_chg") {
            None | Some(Literal::None) => false,
            Some(Literal::Bool(b)) => *b,
            Some(Literal::Int(n)) => *n != 0,
            Some(_) => return Err("invalid 'is_chg'".to_string()),
        };
        Ok(TxOutput {
            addr: self.str("addr")?.to_string(),
            amount: self.amount(dec)?,
            mmid: self.mmid()?,
            label: self.opt_str("label")?.map(str::to_string),
            is_chg,
        })
    }
}

fn opt_str_literal(s: Option<String>) -> Literal {
    s.map(Literal::Str).unwrap_or(Literal::None)
}

fn input_to_literal(i: &TxInput, dec: u32) -> Literal {
    Literal::Dict(vec![
        ("vout".into(), Literal::Int(i64::from(i.vout))),
        ("amt".into(), Literal::Str(i.amount.to_string_in(dec))),
        ("label".into(), opt_str_literal(i.label.clone())),
        ("mmid".into(), opt_str_literal(i.mmid.as_ref().map(|m| m.to_string()))),
        ("addr".into(), Literal::Str(i.addr.clone())),
        ("confs".into(), Literal::Int(i64::try_from(i.confs).unwrap_or(i64::MAX))),
        ("txid".into(), Literal::Str(i.txid.to_string())),
        ("scriptPubKey".into(), Literal::Str(hex::encode(&i.script_pubkey))),
        ("sequence".into(), i.sequence.map(|s| Literal::Int(i64::from(s))).unwrap_or(Literal::None)),
    ])
}

fn output_to_literal(o: &TxOutput, dec: u32) -> Literal {
    Literal::Dict(vec![
        ("amt".into(), Literal::Str(o.amount.to_string_in(dec))),
        ("label".into(), opt_str_literal(o.label.clone())),
        ("mmid".into(), opt_str_literal(o.mmid.as_ref().map(|m| m.to_string()))),
        ("addr".into(), Literal::Str(o.addr.clone())),
        ("is_chg".into(), Literal::Bool(o.is_chg)),
    ])
}
