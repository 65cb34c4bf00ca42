//! Monero wallet operations for addresses in a key-address file.

use std::process;

use tokio::signal;

use coldwallet_cli::args::log_config;
use coldwallet_cli::init_logging;
use coldwallet_cli::xmr::{command, op_from_matches, options_from_matches, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = match command().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let _logging = match log_config(&matches).and_then(|c| Ok(init_logging(c)?)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let (op, opts) = match op_from_matches(&matches).and_then(|op| Ok((op, options_from_matches(&matches)?))) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    };

    let code = tokio::select! {
        result = run(&op, &opts) => match result {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{}", e);
                e.exit_code()
            }
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Received shutdown signal (Ctrl-C)");
            1
        }
    };
    process::exit(code);
}
