// SPDX-License-Identifier: CC0-1.0

//! Operations of the `coldwallet` binary.

use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use coldwallet::{DeserializedTx, Protocol, Tx, TxState, txfile};
use coldwallet_rpc::{BitcoinRpcClient, Config, Error, RpcClientBuilder, tx_ops};

use crate::args::{common_args, config_from_matches, confirm, protocol_from_matches, rpc_args};
use crate::error::{CliError, CliResult};

/// Command-line interface of the `coldwallet` binary.
pub fn command() -> Command {
    let txfile = || Arg::new("txfile").value_name("TXFILE").help("Transaction file").required(true);
    let cmd = Command::new("coldwallet")
        .version(crate::VERSION)
        .about("Decode, sign and send transaction files through a coin daemon")
        .subcommand_required(true)
        .subcommand(
            Command::new("decode")
                .about("Print a raw transaction as JSON")
                .arg(Arg::new("tx").value_name("HEX|FILE").required(true)),
        )
        .subcommand(
            Command::new("view")
                .about("Display a transaction file")
                .arg(txfile())
                .arg(Arg::new("terse").short('t').long("terse").action(ArgAction::SetTrue))
                .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("sign")
                .about("Sign an unsigned transaction file with WIF keys")
                .arg(txfile())
                .arg(Arg::new("wif").value_name("WIF").num_args(1..).required(true)),
        )
        .subcommand(Command::new("send").about("Broadcast a signed transaction file").arg(txfile()))
        .subcommand(Command::new("status").about("Show the network status of a transaction").arg(txfile()));
    rpc_args(common_args(cmd))
}

/// Runs the subcommand selected in `matches`. Returns the exit status.
pub async fn dispatch(matches: &ArgMatches) -> CliResult<i32> {
    let Some((name, sub)) = matches.subcommand() else {
        return Err(CliError::Usage("no command given".into()));
    };
    // global options are propagated to the subcommand's matches
    let assume_yes = sub.get_flag("yes");
    let path = || sub.get_one::<String>("txfile").map(String::as_str).unwrap_or_default();
    match name {
        "decode" => {
            let arg = sub.get_one::<String>("tx").map(String::as_str).unwrap_or_default();
            let proto = protocol_from_matches(sub)?;
            println!("{}", decode(arg, &proto, txfile::DEFAULT_MAX_TX_FILE_SIZE)?);
            Ok(0)
        }
        "view" => {
            let config = config_from_matches(sub)?;
            print!("{}", view(path(), &config, sub.get_flag("terse"), sub.get_flag("verbose"))?);
            Ok(0)
        }
        "sign" => {
            let keys: Vec<String> = sub.get_many::<String>("wif").map(|v| v.cloned().collect()).unwrap_or_default();
            sign(path(), &keys, &config_from_matches(sub)?).await
        }
        "send" => send(path(), &config_from_matches(sub)?, assume_yes).await,
        "status" => status(path(), &config_from_matches(sub)?).await,
        other => Err(CliError::Usage(format!("'{}': unrecognized command", other))),
    }
}

/// Decodes raw hex, given directly, in a plain file, or in a transaction
/// file, and returns it as pretty-printed JSON.
pub fn decode(arg: &str, proto: &Protocol, max_file_size: usize) -> CliResult<String> {
    let path = Path::new(arg);
    let (hex, proto) = if path.is_file() {
        let data = std::fs::read_to_string(path)?;
        match txfile::parse(&data, max_file_size) {
            Ok(tx) => (tx.hex.clone(), *tx.proto()),
            Err(_) => (data.trim().to_string(), *proto),
        }
    } else {
        (arg.trim().to_string(), *proto)
    };
    let dt = DeserializedTx::from_hex(&hex, &proto)?;
    Ok(serde_json::to_string_pretty(&dt.to_json(&proto))?)
}

fn read_tx(path: &str, config: &Config) -> CliResult<Tx> {
    Ok(txfile::read_tx_file(Path::new(path), config.max_tx_file_size)?)
}

/// Checks that the file's protocol is the one we are connected for.
fn check_proto(tx: &Tx, config: &Config) -> CliResult<()> {
    if tx.proto() != &config.protocol {
        return Err(CliError::Usage(format!(
            "Transaction is for {}, but {} was requested (use --coin and --network)",
            tx.proto().cls_name(),
            config.protocol.cls_name()
        )));
    }
    Ok(())
}

async fn connect(config: &Config, op: &str) -> CliResult<BitcoinRpcClient> {
    let client = RpcClientBuilder::new(config)?.connect().await?;
    Ok(client.into_bitcoin(op)?)
}

pub fn view(path: &str, config: &Config, terse: bool, verbose: bool) -> CliResult<String> {
    let tx = read_tx(path, config)?;
    Ok(tx.format_view(terse, None, verbose))
}

/// Signs an unsigned transaction file and writes the signed file next to
/// the other outputs in the data directory.
pub async fn sign(path: &str, keys: &[String], config: &Config) -> CliResult<i32> {
    let mut tx = read_tx(path, config)?;
    check_proto(&tx, config)?;
    if tx.state() != TxState::Unsigned {
        return Err(CliError::Usage(format!("{}: transaction is already signed", path)));
    }
    let rpc = connect(config, "sign").await?;
    tx_ops::sign(&mut tx, &rpc, keys).await?;
    let out = txfile::write_tx_file(&tx, &config.data_dir, config.max_tx_file_size)?;
    println!("{}", out.display());
    Ok(0)
}

/// Broadcasts a signed transaction file after confirmation.
pub async fn send(path: &str, config: &Config, assume_yes: bool) -> CliResult<i32> {
    let mut tx = read_tx(path, config)?;
    check_proto(&tx, config)?;
    let rpc = connect(config, "send").await?;

    match tx_ops::check_sendable(&tx, &rpc).await {
        Ok(_) => {}
        Err(Error::Status(status)) => {
            eprintln!("{}", status);
            return Ok(status.exit_code().max(1));
        }
        Err(e) => return Err(e.into()),
    }

    eprint!("{}", tx.format_view(true, Some(rpc.blockcount), false));
    if !confirm("Send transaction?", assume_yes)? {
        return Err(CliError::Aborted);
    }
    let txid = tx_ops::broadcast(&mut tx, &rpc).await?;
    let out = txfile::write_tx_file(&tx, &config.data_dir, config.max_tx_file_size)?;
    println!("{}", txid);
    tracing::info!("Sent transaction saved to '{}'", out.display());
    Ok(0)
}

/// Prints the daemon's view of a signed or sent transaction.
pub async fn status(path: &str, config: &Config) -> CliResult<i32> {
    let tx = read_tx(path, config)?;
    check_proto(&tx, config)?;
    if tx.state() == TxState::Unsigned {
        return Err(CliError::Usage(format!("{}: transaction is not signed", path)));
    }
    let rpc = connect(config, "status").await?;
    let status = tx_ops::get_status(&tx, &rpc).await?;
    println!("{}", status);
    Ok(status.exit_code())
}
