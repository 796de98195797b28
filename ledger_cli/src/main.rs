//! Command-line caller for the player token ledger.
//!
//! Each invocation opens the configured backend, runs one command and prints
//! the result as JSON on stdout.

mod commands;
mod config;
mod logging;

use std::time::Instant;

use anyhow::{Error, anyhow};
use pico_args::Arguments;
use token_ledger::LedgerStore;

use crate::commands::{exit_code, parse_args};
use crate::config::CliConfig;

const HELP: &str = "\
Record and query player token balances

USAGE:
  ledger_cli [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  integration <ID> <NAME> [COMPANY]                 Register or update an integration
  player <INTEGRATION> <PLAYER> [ALIAS]             Register a player, merging the alias
  show <INTEGRATION> <PLAYER>                       Print a player with all balances
  balance <INTEGRATION> <PLAYER> <TOKEN>            Print one token balance
  earn <INTEGRATION> <PLAYER> <TOKEN> <AMOUNT> [SOURCE] [KEY=VALUE]...
                                                    Credit tokens, with optional metadata
  spend <INTEGRATION> <PLAYER> <TOKEN> <AMOUNT> [REASON] [KEY=VALUE]...
                                                    Debit tokens if funds suffice
  history <INTEGRATION> <PLAYER> [LIMIT]            Print recent postings, newest first
  demo                                              Run the signup/purchase/overspend walkthrough

OPTIONS:
  --backend    NAME        memory or sqlite            [default: env LEDGER_BACKEND or sqlite]
  --db-url     URL         SQLite connection string    [default: env DATABASE_URL or sqlite://token_ledger.db]

FLAGS:
  --pretty                 Pretty-print JSON output
  -h, --help               Print help information

ENVIRONMENT:
  LEDGER_BACKEND               Storage backend
  LEDGER_OPERATION_TIMEOUT_MS  Per-operation timeout in milliseconds
  DATABASE_URL                 SQLite connection string
  DB_MAX_CONNECTIONS           Pool size
  RUST_LOG                     Log filter (logs go to stderr)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let backend: Option<String> = pargs.opt_value_from_str("--backend")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let pretty = pargs.contains("--pretty");

    let free = pargs
        .finish()
        .into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow!("Argument is not valid UTF-8: {:?}", arg))
        })
        .collect::<Result<Vec<_>, _>>()?;

    logging::init();

    let config = CliConfig::from_env(backend, database_url, pretty)?;
    config.validate()?;

    let command = parse_args(&free)?;
    let operation = command.name();

    let store = LedgerStore::from_config(&config.ledger)
        .await
        .map_err(|e| anyhow!("Failed to open ledger: {}", e))?;

    let start = Instant::now();
    let result = commands::execute(&store, command).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(value) => {
            logging::log_ledger_operation(operation, duration_ms, None);
            println!("{}", config.render(&value));
            Ok(())
        }
        Err(e) => {
            let message = e.client_message();
            logging::log_ledger_operation(operation, duration_ms, Some(&message));
            eprintln!("error: {message}");
            std::process::exit(exit_code(e.kind()));
        }
    }
}
