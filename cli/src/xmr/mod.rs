// SPDX-License-Identifier: CC0-1.0

//! Monero wallet operations driven through `monero-wallet-rpc`.
//!
//! Wallets are created from the view and spend keys of an unencrypted
//! key-address file, one wallet per address. Transactions are always built
//! with `do_not_relay` set and then either saved to a file or submitted
//! through the raw daemon interface, so that the relaying daemon can be a
//! different host from the one the wallet syncs against.

pub mod keyaddr;
pub mod spec;
pub mod txfile;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Arg, ArgAction, ArgMatches, Command};
use coldwallet::tx::make_timestamp;
use coldwallet::{Amount, Network};
use coldwallet_rpc::{Auth, BackendKind, MoneroConnectOptions, MoneroRpcClientRaw, MoneroWalletRpcClient};
use coldwallet_rpc_json::{
    GenerateFromKeysParams, SendRawTransactionParams, SweepAllParams, TransferDestination, TransferParams,
};

use self::keyaddr::{KeyAddrEntry, KeyAddrFile};
use self::spec::{SweepSpec, TransferSpec, XMR_DECIMALS, parse_wallet_list};
use self::txfile::MoneroTxData;
use crate::args::{common_args, confirm};
use crate::error::{CliError, CliResult};

const DAEMON_PORTS: (u16, u16) = (18081, 28081);
const WALLET_RPC_PORTS: (u16, u16) = (18083, 28083);

fn default_port(ports: (u16, u16), network: Network) -> u16 {
    if network == Network::Mainnet { ports.0 } else { ports.1 }
}

fn xmr(atomic: u64) -> String {
    Amount::from_sat(atomic).to_string_in(XMR_DECIMALS)
}

/// `HOST:PORT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl FromStr for HostPort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("'{}': expected HOST:PORT", s);
        let (host, port) = s.rsplit_once(':').ok_or_else(bad)?;
        if host.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            host: host.to_string(),
            port: port.parse().map_err(|_| bad())?,
        })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Settings for an `xmrwallet` run.
#[derive(Clone, Debug)]
pub struct XmrOptions {
    /// `monerod` the wallets sync against. Defaults to the local daemon on
    /// the network's standard port.
    pub daemon: Option<HostPort>,
    /// `monerod` created transactions are relayed through; falls back to
    /// `daemon`.
    pub tx_relay_daemon: Option<HostPort>,
    pub wallet_rpc: Option<HostPort>,
    pub wallet_rpc_auth: Option<Auth>,
    /// Directory `monero-wallet-rpc` keeps its wallet files in.
    pub wallet_dir: PathBuf,
    /// Directory unrelayed transaction files are written to.
    pub outdir: PathBuf,
    pub restore_height: Option<u64>,
    pub do_not_relay: bool,
    pub assume_yes: bool,
    pub connect: MoneroConnectOptions,
}

impl Default for XmrOptions {
    fn default() -> Self {
        Self {
            daemon: None,
            tx_relay_daemon: None,
            wallet_rpc: None,
            wallet_rpc_auth: None,
            wallet_dir: PathBuf::from("."),
            outdir: PathBuf::from("."),
            restore_height: None,
            do_not_relay: false,
            assume_yes: false,
            connect: MoneroConnectOptions::default(),
        }
    }
}

impl XmrOptions {
    fn daemon_addr(&self, network: Network) -> HostPort {
        self.daemon.clone().unwrap_or_else(|| HostPort {
            host: "localhost".into(),
            port: default_port(DAEMON_PORTS, network),
        })
    }

    fn relay_addr(&self, network: Network) -> HostPort {
        self.tx_relay_daemon.clone().unwrap_or_else(|| self.daemon_addr(network))
    }

    async fn wallet_client(&self, network: Network) -> CliResult<MoneroWalletRpcClient> {
        let auth = self
            .wallet_rpc_auth
            .clone()
            .ok_or_else(|| CliError::Usage("--wallet-rpc-password is required for this operation".into()))?;
        let addr = self.wallet_rpc.clone().unwrap_or_else(|| HostPort {
            host: "localhost".into(),
            port: default_port(WALLET_RPC_PORTS, network),
        });
        tracing::debug!("Connecting to wallet RPC at {}", addr);
        Ok(MoneroWalletRpcClient::new(&addr.host, addr.port, auth, &self.connect).await?)
    }

    async fn relay(&self, network: Network, blob: &str) -> CliResult<()> {
        let addr = self.relay_addr(network);
        tracing::info!("Relaying transaction via {}", addr);
        let daemon = MoneroRpcClientRaw::new(&addr.host, addr.port, &self.connect).await?;
        let params = SendRawTransactionParams {
            tx_as_hex: blob.to_string(),
            do_not_relay: false,
        };
        daemon.send_raw_transaction(&params).await?;
        Ok(())
    }
}

/// An operation and its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmrOp {
    Create {
        keyaddr: PathBuf,
        wallets: Option<Vec<u32>>,
    },
    Sync {
        keyaddr: PathBuf,
        wallets: Option<Vec<u32>>,
    },
    Transfer {
        keyaddr: PathBuf,
        spec: TransferSpec,
    },
    Sweep {
        keyaddr: PathBuf,
        spec: SweepSpec,
    },
    Relay {
        txfile: PathBuf,
    },
}

impl XmrOp {
    pub fn parse(op: &str, args: &[String]) -> CliResult<Self> {
        let usage = |expected: &str| CliError::Usage(format!("usage: xmrwallet {} {}", op, expected));
        let spec_err = |e: spec::SpecError| CliError::Usage(e.to_string());
        match (op, args) {
            ("create" | "sync", [keyaddr, rest @ ..]) if rest.len() <= 1 => {
                let keyaddr = PathBuf::from(keyaddr);
                let wallets = rest.first().map(|w| parse_wallet_list(w)).transpose().map_err(spec_err)?;
                Ok(if op == "create" {
                    XmrOp::Create {
                        keyaddr,
                        wallets,
                    }
                } else {
                    XmrOp::Sync {
                        keyaddr,
                        wallets,
                    }
                })
            }
            ("create" | "sync", _) => Err(usage("<keyaddrfile> [wallets]")),
            ("transfer", [keyaddr, spec]) => Ok(XmrOp::Transfer {
                keyaddr: PathBuf::from(keyaddr),
                spec: spec.parse().map_err(spec_err)?,
            }),
            ("transfer", _) => Err(usage("<keyaddrfile> <SOURCE:ACCOUNT:ADDRESS,AMOUNT>")),
            ("sweep", [keyaddr, spec]) => Ok(XmrOp::Sweep {
                keyaddr: PathBuf::from(keyaddr),
                spec: spec.parse().map_err(spec_err)?,
            }),
            ("sweep", _) => Err(usage("<keyaddrfile> <SOURCE:ACCOUNT[,DEST]>")),
            ("relay", [txfile]) => Ok(XmrOp::Relay {
                txfile: PathBuf::from(txfile),
            }),
            ("relay", _) => Err(usage("<TX_file>")),
            _ => Err(CliError::Usage(format!("'{}': unrecognized operation", op))),
        }
    }
}

fn read_keyaddr(path: &Path) -> CliResult<KeyAddrFile> {
    KeyAddrFile::read(path).map_err(|e| CliError::KeyAddrFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn select<'a>(kaf: &'a KeyAddrFile, wallets: &Option<Vec<u32>>) -> CliResult<Vec<&'a KeyAddrEntry>> {
    match wallets {
        None => Ok(kaf.entries().collect()),
        Some(list) => list
            .iter()
            .map(|idx| {
                kaf.entry(*idx).ok_or_else(|| {
                    CliError::Usage(format!("wallet #{} is not in key-address file {}", idx, kaf.seed_id))
                })
            })
            .collect(),
    }
}

fn entry(kaf: &KeyAddrFile, idx: u32) -> CliResult<&KeyAddrEntry> {
    select(kaf, &Some(vec![idx]))?.pop().ok_or_else(|| CliError::Usage(format!("wallet #{}", idx)))
}

/// Runs one operation. Returns the process exit status.
pub async fn run(op: &XmrOp, opts: &XmrOptions) -> CliResult<i32> {
    match op {
        XmrOp::Create {
            keyaddr,
            wallets,
        } => create(&read_keyaddr(keyaddr)?, wallets, opts).await,
        XmrOp::Sync {
            keyaddr,
            wallets,
        } => sync(&read_keyaddr(keyaddr)?, wallets, opts).await,
        XmrOp::Transfer {
            keyaddr,
            spec,
        } => transfer(&read_keyaddr(keyaddr)?, spec, opts).await,
        XmrOp::Sweep {
            keyaddr,
            spec,
        } => sweep(&read_keyaddr(keyaddr)?, spec, opts).await,
        XmrOp::Relay {
            txfile,
        } => relay(txfile, opts).await,
    }
}

async fn create(kaf: &KeyAddrFile, wallets: &Option<Vec<u32>>, opts: &XmrOptions) -> CliResult<i32> {
    let entries = select(kaf, wallets)?;
    let wallet = opts.wallet_client(kaf.network).await?;
    let mut created = 0;
    for e in entries {
        let filename = kaf.wallet_filename(e.idx);
        if opts.wallet_dir.join(&filename).exists() {
            tracing::info!("Wallet '{}' exists, skipping", filename);
            continue;
        }
        let params = GenerateFromKeysParams {
            filename: filename.clone(),
            address: e.address.clone(),
            spendkey: e.spendkey.clone(),
            viewkey: e.viewkey.clone(),
            password: e.wallet_passwd.clone(),
            restore_height: opts.restore_height,
            autosave_current: Some(true),
        };
        let res = wallet.generate_from_keys(&params).await?;
        wallet.close_wallet().await?;
        if res.address != e.address {
            return Err(CliError::KeyAddrFile {
                path: filename,
                reason: format!("wallet daemon derived address {}, key-address file has {}", res.address, e.address),
            });
        }
        tracing::info!("Created wallet '{}'", filename);
        created += 1;
    }
    println!("{} wallet{} created", created, if created == 1 { "" } else { "s" });
    Ok(0)
}

async fn sync(kaf: &KeyAddrFile, wallets: &Option<Vec<u32>>, opts: &XmrOptions) -> CliResult<i32> {
    let entries = select(kaf, wallets)?;
    let addr = opts.daemon_addr(kaf.network);
    let daemon_height = MoneroRpcClientRaw::new(&addr.host, addr.port, &opts.connect).await?.get_height().await?;
    tracing::info!("Daemon {} at height {}", addr, daemon_height);

    let wallet = opts.wallet_client(kaf.network).await?;
    let (mut total, mut total_unlocked) = (0u64, 0u64);
    for e in entries {
        let filename = kaf.wallet_filename(e.idx);
        wallet.open_wallet(&filename, &e.wallet_passwd).await?;
        let refreshed = wallet.refresh(None).await?;
        tracing::debug!("Wallet {}: fetched {} blocks", e.idx, refreshed.blocks_fetched);
        let balance = wallet.get_balance(0).await?;
        wallet.close_wallet().await?;
        println!(
            "Wallet {}: balance {} XMR, unlocked {} XMR",
            e.idx,
            xmr(balance.balance),
            xmr(balance.unlocked_balance)
        );
        total = total.saturating_add(balance.balance);
        total_unlocked = total_unlocked.saturating_add(balance.unlocked_balance);
    }
    println!("Total: {} XMR, unlocked {} XMR", xmr(total), xmr(total_unlocked));
    Ok(0)
}

/// Saves or relays a freshly created transaction.
async fn dispose(tx: MoneroTxData, opts: &XmrOptions, network: Network) -> CliResult<i32> {
    eprintln!("Transaction {}: amount {} XMR, fee {} XMR to {}", tx.txid, tx.amount, tx.fee, tx.dest_address);
    if opts.do_not_relay {
        if !confirm("Save transaction?", opts.assume_yes)? {
            return Err(CliError::Aborted);
        }
        let path = tx.write(&opts.outdir).map_err(|e| CliError::TxFile {
            path: opts.outdir.display().to_string(),
            reason: e.to_string(),
        })?;
        println!("{}", path.display());
    } else {
        if !confirm("Relay transaction?", opts.assume_yes)? {
            return Err(CliError::Aborted);
        }
        opts.relay(network, &tx.blob).await?;
        println!("{}", tx.txid);
    }
    Ok(0)
}

fn new_tx(kaf: &KeyAddrFile, op: &str, source: String, dest_address: String) -> MoneroTxData {
    MoneroTxData {
        op: op.to_string(),
        network: kaf.network.to_string(),
        seed_id: kaf.seed_id.clone(),
        source,
        dest_address,
        txid: String::new(),
        amount: String::new(),
        fee: String::new(),
        blob: String::new(),
        timestamp: make_timestamp(),
    }
}

async fn transfer(kaf: &KeyAddrFile, spec: &TransferSpec, opts: &XmrOptions) -> CliResult<i32> {
    let source = entry(kaf, spec.source)?;
    let wallet = opts.wallet_client(kaf.network).await?;
    wallet.open_wallet(&kaf.wallet_filename(source.idx), &source.wallet_passwd).await?;
    wallet.refresh(None).await?;

    let prompt = format!(
        "Transfer {} XMR from wallet {} account {} to {}?",
        spec.amount.to_string_in(XMR_DECIMALS),
        spec.source,
        spec.account,
        spec.address
    );
    if !confirm(&prompt, opts.assume_yes)? {
        wallet.close_wallet().await?;
        return Err(CliError::Aborted);
    }
    let params = TransferParams {
        destinations: vec![TransferDestination {
            amount: spec.amount.to_sat(),
            address: spec.address.clone(),
        }],
        account_index: spec.account,
        priority: None,
        do_not_relay: true,
        get_tx_hex: true,
        get_tx_metadata: false,
    };
    let res = wallet.transfer(&params).await?;
    wallet.close_wallet().await?;

    let blob = res.tx_blob.ok_or_else(|| coldwallet_rpc::RpcError::failure("transfer returned no transaction hex"))?;
    let tx = MoneroTxData {
        txid: res.tx_hash,
        amount: xmr(res.amount),
        fee: xmr(res.fee),
        blob,
        ..new_tx(kaf, "transfer", format!("{}:{}", spec.source, spec.account), spec.address.clone())
    };
    dispose(tx, opts, kaf.network).await
}

async fn sweep(kaf: &KeyAddrFile, spec: &SweepSpec, opts: &XmrOptions) -> CliResult<i32> {
    let source = entry(kaf, spec.source)?;
    let source_file = kaf.wallet_filename(source.idx);
    let wallet = opts.wallet_client(kaf.network).await?;
    let label = format!("Sweep from {}:{} [{}]", spec.source, spec.account, make_timestamp());

    let dest_address = match spec.dest {
        None => {
            wallet.open_wallet(&source_file, &source.wallet_passwd).await?;
            wallet.refresh(None).await?;
            let prompt =
                format!("Create new address in wallet {} account {} to sweep to?", spec.source, spec.account);
            if !confirm(&prompt, opts.assume_yes)? {
                wallet.close_wallet().await?;
                return Err(CliError::Aborted);
            }
            wallet.create_address(spec.account, &label).await?.address
        }
        Some(dest) => {
            let dest = entry(kaf, dest)?;
            wallet.open_wallet(&kaf.wallet_filename(dest.idx), &dest.wallet_passwd).await?;
            if !confirm(&format!("Create new account in wallet {} to sweep to?", dest.idx), opts.assume_yes)? {
                wallet.close_wallet().await?;
                return Err(CliError::Aborted);
            }
            let created = wallet.create_account(&label).await?;
            tracing::info!("Created account {} in wallet {}", created.account_index, dest.idx);
            wallet.close_wallet().await?;
            wallet.open_wallet(&source_file, &source.wallet_passwd).await?;
            wallet.refresh(None).await?;
            created.address
        }
    };

    let params = SweepAllParams {
        address: dest_address.clone(),
        account_index: spec.account,
        priority: None,
        do_not_relay: true,
        get_tx_hex: true,
        get_tx_metadata: false,
    };
    let res = wallet.sweep_all(&params).await?;
    wallet.close_wallet().await?;

    let ntx = res.tx_hash_list.len();
    let (Some(txid), Some(amount), Some(fee), Some(blob), 1) = (
        res.tx_hash_list.into_iter().next(),
        res.amount_list.first(),
        res.fee_list.first(),
        res.tx_blob_list.into_iter().next(),
        ntx,
    ) else {
        return Err(coldwallet_rpc::RpcError::failure(format!(
            "sweep_all returned {} transactions; exactly one is supported, sweep again with a smaller balance",
            ntx
        ))
        .into());
    };
    let tx = MoneroTxData {
        txid,
        amount: xmr(*amount),
        fee: xmr(*fee),
        blob,
        ..new_tx(kaf, "sweep", format!("{}:{}", spec.source, spec.account), dest_address)
    };
    dispose(tx, opts, kaf.network).await
}

async fn relay(path: &Path, opts: &XmrOptions) -> CliResult<i32> {
    let tx = MoneroTxData::read(path).map_err(|e| CliError::TxFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let network: Network = tx.network.parse().map_err(|_| CliError::TxFile {
        path: path.display().to_string(),
        reason: format!("unknown network '{}'", tx.network),
    })?;
    eprintln!(
        "{} {}: {} XMR from {} {} to {} (created {})",
        tx.op, tx.txid, tx.amount, tx.seed_id, tx.source, tx.dest_address, tx.timestamp
    );
    if !confirm("Relay transaction?", opts.assume_yes)? {
        return Err(CliError::Aborted);
    }
    opts.relay(network, &tx.blob).await?;
    println!("{}", tx.txid);
    Ok(0)
}

/// Command-line interface of the `xmrwallet` binary.
pub fn command() -> Command {
    let cmd = Command::new("xmrwallet")
        .version(crate::VERSION)
        .about("Perform Monero wallet operations for addresses in a key-address file")
        .arg(Arg::new("op").value_name("OP").help("create, sync, transfer, sweep or relay").required(true))
        .arg(Arg::new("args").value_name("ARGS").num_args(0..).trailing_var_arg(true))
        .arg(Arg::new("daemon").short('D').long("daemon").value_name("HOST:PORT").help("monerod to sync against"))
        .arg(
            Arg::new("tx-relay-daemon")
                .long("tx-relay-daemon")
                .value_name("HOST:PORT")
                .help("monerod to relay created transactions through"),
        )
        .arg(Arg::new("wallet-rpc").long("wallet-rpc").value_name("HOST:PORT").help("monero-wallet-rpc server"))
        .arg(
            Arg::new("wallet-rpc-user")
                .long("wallet-rpc-user")
                .value_name("USER")
                .help("monero-wallet-rpc user name")
                .default_value("monero"),
        )
        .arg(
            Arg::new("wallet-rpc-password")
                .long("wallet-rpc-password")
                .value_name("PASS")
                .help("monero-wallet-rpc password"),
        )
        .arg(
            Arg::new("wallet-dir")
                .short('w')
                .long("wallet-dir")
                .value_name("DIR")
                .help("Directory the wallet RPC server keeps wallets in")
                .default_value("."),
        )
        .arg(
            Arg::new("outdir")
                .short('o')
                .long("outdir")
                .value_name("DIR")
                .help("Save transaction files to this directory")
                .default_value("."),
        )
        .arg(
            Arg::new("restore-height")
                .short('r')
                .long("restore-height")
                .value_name("HEIGHT")
                .help("Scan from this height when creating wallets")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("do-not-relay")
                .long("do-not-relay")
                .help("Save transactions to file instead of relaying")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rpc-backend")
                .long("rpc-backend")
                .value_name("BACKEND")
                .help("RPC transport (auto, reqwest, blocking, raw, curl)")
                .default_value("blocking"),
        )
        .arg(Arg::new("plain-http").long("plain-http").action(ArgAction::SetTrue).hide(true));
    common_args(cmd)
}

fn host_port(matches: &ArgMatches, id: &str) -> CliResult<Option<HostPort>> {
    matches.get_one::<String>(id).map(|s| s.parse().map_err(CliError::Usage)).transpose()
}

pub fn options_from_matches(matches: &ArgMatches) -> CliResult<XmrOptions> {
    let backend: BackendKind = matches
        .get_one::<String>("rpc-backend")
        .map(String::as_str)
        .unwrap_or("blocking")
        .parse()
        .map_err(CliError::Usage)?;
    let user = matches.get_one::<String>("wallet-rpc-user");
    let wallet_rpc_auth = match (user, matches.get_one::<String>("wallet-rpc-password")) {
        (Some(user), Some(password)) => Some(Auth::new(user, password)),
        _ => None,
    };
    let path = |id: &str| matches.get_one::<String>(id).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let plain_http = matches.get_flag("plain-http");
    Ok(XmrOptions {
        daemon: host_port(matches, "daemon")?,
        tx_relay_daemon: host_port(matches, "tx-relay-daemon")?,
        wallet_rpc: host_port(matches, "wallet-rpc")?,
        wallet_rpc_auth,
        wallet_dir: path("wallet-dir"),
        outdir: path("outdir"),
        restore_height: matches.get_one::<u64>("restore-height").copied(),
        do_not_relay: matches.get_flag("do-not-relay"),
        assume_yes: matches.get_flag("yes"),
        connect: MoneroConnectOptions {
            https: !plain_http,
            backend,
            debug_rpc: matches.get_flag("debug-rpc"),
            ..MoneroConnectOptions::default()
        },
    })
}

/// Extracts the operation from parsed arguments.
pub fn op_from_matches(matches: &ArgMatches) -> CliResult<XmrOp> {
    let op = matches.get_one::<String>("op").map(String::as_str).unwrap_or_default();
    let args: Vec<String> = matches.get_many::<String>("args").map(|v| v.cloned().collect()).unwrap_or_default();
    XmrOp::parse(op, &args)
}
