// SPDX-License-Identifier: CC0-1.0

//! Command-line options shared by the binaries and their mapping onto
//! [`Config`].

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use coldwallet::{Coin, Network, Protocol};
use coldwallet_rpc::{BackendKind, Config};

use crate::error::{CliError, CliResult};
use crate::logging::{LoggingConfig, parse_level};

/// Adds the logging and confirmation options every binary takes.
pub fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("log-level")
            .short('l')
            .long("log-level")
            .value_name("LEVEL")
            .help("Log level (error, warn, info, debug, trace); RUST_LOG is used when omitted")
            .global(true),
    )
    .arg(
        Arg::new("yes")
            .short('y')
            .long("yes")
            .help("Answer 'yes' to all prompts")
            .action(ArgAction::SetTrue)
            .global(true),
    )
    .arg(
        Arg::new("debug-rpc")
            .long("debug-rpc")
            .help("Log RPC payloads and responses at debug level")
            .action(ArgAction::SetTrue)
            .global(true),
    )
}

/// Adds the coin-daemon connection options.
pub fn rpc_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("coin")
            .long("coin")
            .value_name("COIN")
            .help("Coin to operate on")
            .value_parser(["btc", "ltc", "bch", "eth", "etc"])
            .ignore_case(true)
            .default_value("btc")
            .global(true),
    )
    .arg(
        Arg::new("network")
            .short('n')
            .long("network")
            .value_name("NETWORK")
            .help("Network of the coin")
            .value_parser(["mainnet", "testnet", "regtest"])
            .default_value("mainnet")
            .global(true),
    )
    .arg(
        Arg::new("rpc-host")
            .long("rpc-host")
            .value_name("HOST")
            .help("Coin daemon host")
            .default_value("localhost")
            .global(true),
    )
    .arg(
        Arg::new("rpc-port")
            .long("rpc-port")
            .value_name("PORT")
            .help("Coin daemon RPC port (default: the coin's standard port)")
            .value_parser(clap::value_parser!(u16))
            .global(true),
    )
    .arg(Arg::new("rpc-user").long("rpc-user").value_name("USER").help("Daemon RPC user name").global(true))
    .arg(
        Arg::new("rpc-password")
            .long("rpc-password")
            .value_name("PASS")
            .help("Daemon RPC password")
            .global(true),
    )
    .arg(
        Arg::new("rpc-backend")
            .long("rpc-backend")
            .value_name("BACKEND")
            .help("RPC transport (auto, reqwest, blocking, raw, curl)")
            .default_value("auto")
            .global(true),
    )
    .arg(
        Arg::new("data-dir")
            .short('d')
            .long("data-dir")
            .value_name("DIR")
            .help("Directory transaction files are written to")
            .default_value(".")
            .global(true),
    )
    .arg(
        Arg::new("strict-daemon-version")
            .long("strict-daemon-version")
            .help("Refuse to connect to a daemon newer than the last tested version")
            .action(ArgAction::SetTrue)
            .global(true),
    )
}

pub fn protocol_from_matches(matches: &ArgMatches) -> CliResult<Protocol> {
    let coin: Coin = value(matches, "coin")?.parse().map_err(|e| CliError::Usage(format!("{}", e)))?;
    let network: Network = value(matches, "network")?.parse().map_err(|e| CliError::Usage(format!("{}", e)))?;
    Ok(Protocol::new(coin, network))
}

/// Builds and validates the client configuration from parsed options.
pub fn config_from_matches(matches: &ArgMatches) -> CliResult<Config> {
    let backend: BackendKind = value(matches, "rpc-backend")?.parse().map_err(CliError::Usage)?;
    let mut config = Config::new(protocol_from_matches(matches)?)
        .with_rpc_host(value(matches, "rpc-host")?, matches.get_one::<u16>("rpc-port").copied())
        .with_backend(backend)
        .with_data_dir(PathBuf::from(value(matches, "data-dir")?))
        .with_strict_daemon_version(matches.get_flag("strict-daemon-version"))
        .with_debug_rpc(matches.get_flag("debug-rpc"));
    config.rpc_user = matches.get_one::<String>("rpc-user").cloned();
    config.rpc_password = matches.get_one::<String>("rpc-password").cloned();
    config.validate().map_err(|e| CliError::Usage(format!("Configuration error: {}", e)))?;
    Ok(config)
}

pub fn log_config(matches: &ArgMatches) -> CliResult<LoggingConfig> {
    let level = matches.get_one::<String>("log-level").map(|s| parse_level(s)).transpose()?;
    Ok(LoggingConfig {
        level,
        with_target: false,
    })
}

fn value<'a>(matches: &'a ArgMatches, id: &str) -> CliResult<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("missing --{}", id)))
}

/// Asks a yes/no question on the terminal. `assume_yes` skips the prompt.
pub fn confirm(prompt: &str, assume_yes: bool) -> CliResult<bool> {
    if assume_yes {
        return Ok(true);
    }
    let mut stderr = io::stderr();
    write!(stderr, "{} (y/N): ", prompt)?;
    stderr.flush()?;
    let mut reply = String::new();
    io::stdin().lock().read_line(&mut reply)?;
    Ok(matches!(reply.trim(), "y" | "Y" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd() -> Command {
        rpc_args(common_args(Command::new("test")))
    }

    #[test]
    fn test_config_from_matches() {
        let dir = tempfile::tempdir().unwrap();
        let matches = cmd()
            .try_get_matches_from([
                "test",
                "--coin=LTC",
                "--network=testnet",
                "--rpc-port=19332",
                "--rpc-user=u",
                "--rpc-password=p",
                "--rpc-backend=raw",
                "--data-dir",
                dir.path().to_str().unwrap(),
            ])
            .unwrap();
        let config = config_from_matches(&matches).unwrap();
        assert_eq!(config.protocol, Protocol::new(Coin::Ltc, Network::Testnet));
        assert_eq!(config.port(), 19332);
        assert_eq!(config.backend, BackendKind::Raw);
        assert_eq!(config.rpc_user.as_deref(), Some("u"));
    }

    #[test]
    fn test_bad_options() {
        let matches = cmd().try_get_matches_from(["test", "--rpc-backend=pigeon"]).unwrap();
        assert!(matches!(config_from_matches(&matches), Err(CliError::Usage(m)) if m.contains("pigeon")));

        let matches = cmd().try_get_matches_from(["test", "--rpc-user=u"]).unwrap();
        assert!(matches!(config_from_matches(&matches), Err(CliError::Usage(m)) if m.contains("together")));

        assert!(cmd().try_get_matches_from(["test", "--coin=doge"]).is_err());
    }
}
