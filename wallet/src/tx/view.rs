// SPDX-License-Identifier: CC0-1.0

//! Plain-text rendering of a transaction for review before signing or
//! sending.

use std::fmt::Write;

use super::{Tx, TxState};
use crate::amount::Amount;
use crate::deserialize::DeserializedTx;
use crate::mmid::WalletKeyId;

const NON_WALLET: &str = "(non-wallet address)";

/// One row of the inputs or outputs table.
struct IoRow<'a> {
    addr: &'a str,
    mmid: Option<&'a WalletKeyId>,
    amount: Amount,
    label: Option<&'a str>,
    txid_vout: Option<String>,
    confs: Option<u64>,
    is_chg: bool,
}

impl Tx {
    /// Renders the transaction.
    ///
    /// `blockcount` is the daemon's current height, when connected; it is
    /// used to age input confirmations. `verbose` adds size information.
    pub fn format_view(&self, terse: bool, blockcount: Option<u64>, verbose: bool) -> String {
        let coin = self.proto.coin().symbol();
        let dec = self.decimals();
        let fmt_amt = |a: Amount| a.to_string_in(dec);
        let txid = self.txid.as_ref().map(|t| t.as_str()).unwrap_or("-");
        let send_amt = self.send_amount().map(fmt_amt).unwrap_or_else(|_| "?".into());
        let signed = if self.state >= TxState::Signed { "True" } else { "False" };
        let rbf = if self.is_rbf() { "True" } else { "False" };

        let mut out = String::new();
        if terse {
            let _ = writeln!(
                out,
                "Transaction {} {} {} ({} UTC) RBF={} Signed={}",
                txid, send_amt, coin, self.timestamp, rbf, signed
            );
        } else {
            let _ = writeln!(
                out,
                "TRANSACTION DATA\n\n[ID:{}] [{} {}] [{} UTC] [RBF:{}] [Signed:{}]",
                txid, send_amt, coin, self.timestamp, rbf, signed
            );
        }
        if self.proto.is_testnet() {
            let _ = writeln!(out, "Chain: {}", self.chain().to_uppercase());
        }
        if let Some(coin_txid) = &self.coin_txid {
            let _ = writeln!(out, "{} TxID: {}", coin, coin_txid);
        }
        let enl = if terse { "" } else { "\n" };
        out.push_str(enl);
        if let Some(label) = &self.label {
            let _ = write!(out, "Comment: {}\n{}", label, enl);
        }

        let inputs: Vec<IoRow> = self
            .inputs
            .iter()
            .map(|i| IoRow {
                addr: &i.addr,
                mmid: i.mmid.as_ref(),
                amount: i.amount,
                label: i.label.as_deref(),
                txid_vout: Some(format!("{},{}", i.txid, i.vout)),
                confs: blockcount.map(|bc| (i.confs + bc).saturating_sub(self.blockcount)),
                is_chg: false,
            })
            .collect();
        let outputs: Vec<IoRow> = self
            .outputs
            .iter()
            .map(|o| IoRow {
                addr: &o.addr,
                mmid: o.mmid.as_ref(),
                amount: o.amount,
                label: o.label.as_deref(),
                txid_vout: None,
                confs: None,
                is_chg: o.is_chg,
            })
            .collect();

        let width = inputs
            .iter()
            .chain(&outputs)
            .filter_map(|r| r.mmid.map(|m| m.to_string().len() + if r.is_chg { 8 } else { 2 }))
            .max()
            .unwrap_or(0)
            .max(NON_WALLET.len());

        out.push_str("Inputs:\n");
        out.push_str(enl);
        self.format_io(&mut out, inputs, true, terse, width);
        out.push_str("Outputs:\n");
        out.push_str(enl);
        self.format_io(&mut out, outputs, false, terse, width);

        let t_in = self.sum_inputs().unwrap_or_default();
        let t_out = self.sum_outputs(None).unwrap_or_default();
        let fee = t_in.checked_sub(t_out).unwrap_or_default();
        let spb = self.fee_to_spb(fee).map(|s| s.to_string()).unwrap_or_else(|| "?".into());
        if terse {
            let _ = writeln!(
                out,
                "In {} {c} - Out {} {c} - Fee {} {c} ({} satoshis/byte)",
                fmt_amt(t_in),
                fmt_amt(t_out),
                fmt_amt(fee),
                spb,
                c = coin
            );
        } else {
            let _ = writeln!(out, "Total input:  {} {}", fmt_amt(t_in), coin);
            let _ = writeln!(out, "Total output: {} {}", fmt_amt(t_out), coin);
            let _ = writeln!(out, "TX fee:       {} {} ({} satoshis per byte)", fmt_amt(fee), coin, spb);
        }

        if verbose {
            let vsize = self.estimate_vsize().map(|s| s.to_string()).unwrap_or_else(|| "unknown".into());
            let actual = self.hex.len() / 2;
            let _ = write!(out, "Transaction size: Vsize={} Actual={}", vsize, actual);
            if self.state >= TxState::Signed {
                if let Ok(dt) = DeserializedTx::from_hex(&self.hex, &self.proto) {
                    let _ = write!(
                        out,
                        " Base={} Witness={}",
                        actual.saturating_sub(dt.witness_size),
                        dt.witness_size
                    );
                }
            }
            out.push('\n');
        }
        out
    }

    fn format_io(&self, out: &mut String, mut rows: Vec<IoRow>, is_input: bool, terse: bool, width: usize) {
        let coin = self.proto.coin().symbol();
        let confs_per_day = 60 * 60 * 24 / self.proto.secs_per_block().max(1);
        rows.sort_by(|a, b| (a.mmid.is_none(), a.mmid, a.addr).cmp(&(b.mmid.is_none(), b.mmid, b.addr)));

        for (n, row) in rows.iter().enumerate() {
            let id = match row.mmid {
                Some(m) => {
                    let chg = if terse && row.is_chg { " (chg)" } else { "" };
                    format!("({}){}", m, chg)
                }
                None => NON_WALLET.to_string(),
            };
            let amount = row.amount.to_string_in(self.decimals());
            if terse {
                let _ = writeln!(out, "{:3} {} {:<width$} {} {}", n + 1, row.addr, id, amount, coin);
                continue;
            }
            let mut items: Vec<(String, &str, String)> = Vec::new();
            if let Some(tv) = &row.txid_vout {
                items.push(((n + 1).to_string(), "tx,vout:", tv.clone()));
            }
            let num = if is_input { String::new() } else { (n + 1).to_string() };
            items.push((num, "address:", format!("{} {:<width$}", row.addr, id)));
            items.push((String::new(), "comment:", row.label.unwrap_or_default().to_string()));
            items.push((String::new(), "amount:", format!("{} {}", amount, coin)));
            if is_input {
                if let Some(confs) = row.confs {
                    items.push((
                        String::new(),
                        "confirmations:",
                        format!("{} (around {} days)", confs, confs / confs_per_day.max(1)),
                    ));
                }
            } else if row.is_chg {
                items.push((String::new(), "change:", "True".into()));
            }
            for (num, key, value) in items.iter().filter(|i| !i.2.is_empty()) {
                let _ = writeln!(out, "{:>3} {:<8} {}", num, key, value);
            }
            out.push('\n');
        }
    }
}
