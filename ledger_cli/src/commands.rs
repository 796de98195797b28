//! Command parsing and execution against a [`LedgerStore`].

use serde_json::{Value, json};
use std::fmt;
use token_ledger::ledger::{
    EarnRequest, RegisterIntegrationRequest, RegisterPlayerRequest, SpendRequest,
};
use token_ledger::{ErrorKind, LedgerError, LedgerResult, LedgerStore, Metadata};

/// Default number of journal entries printed by `history`
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// A parsed command-line command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RegisterIntegration(RegisterIntegrationRequest),
    RegisterPlayer {
        integration_id: String,
        request: RegisterPlayerRequest,
    },
    ShowPlayer {
        integration_id: String,
        player_id: String,
    },
    Balance {
        integration_id: String,
        player_id: String,
        token: String,
    },
    Earn {
        integration_id: String,
        player_id: String,
        request: EarnRequest,
    },
    Spend {
        integration_id: String,
        player_id: String,
        request: SpendRequest,
    },
    History {
        integration_id: String,
        player_id: String,
        limit: usize,
    },
    Demo,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No command given.
    MissingCommand,
    /// Command given without its required arguments.
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },
    /// Invalid numeric argument.
    InvalidNumber(String),
    /// Metadata argument not of the form `KEY=VALUE`.
    InvalidMetadata(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCommand => write!(f, "No command given. Use --help to list commands"),
            Self::MissingArgument { command, usage } => {
                write!(f, "Missing arguments for '{}'. Usage: {}", command, usage)
            }
            Self::InvalidNumber(value) => write!(f, "Invalid number '{}'", value),
            Self::InvalidMetadata(value) => {
                write!(f, "Invalid metadata '{}', expected KEY=VALUE", value)
            }
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Use --help to list commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse positional arguments into a [`Command`].
///
/// # Examples
///
/// ```ignore
/// use ledger_cli::commands::{parse_args, Command};
///
/// let args: Vec<String> = ["earn", "g1", "p1", "RACKDOG", "100", "signup", "mode=ranked"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// assert!(matches!(parse_args(&args), Ok(Command::Earn { .. })));
/// ```
pub fn parse_args(args: &[String]) -> Result<Command, ParseError> {
    let Some((name, rest)) = args.split_first() else {
        return Err(ParseError::MissingCommand);
    };
    let arg = |i: usize| rest.get(i).cloned();

    let command = match name.as_str() {
        "integration" => {
            const USAGE: &str = "integration <ID> <NAME> [COMPANY]";
            let (Some(id), Some(name)) = (arg(0), arg(1)) else {
                return Err(missing("integration", USAGE));
            };
            Command::RegisterIntegration(RegisterIntegrationRequest {
                id,
                name,
                company_id: arg(2).unwrap_or_default(),
            })
        }
        "player" => {
            const USAGE: &str = "player <INTEGRATION> <PLAYER> [ALIAS]";
            let (Some(integration_id), Some(player_id)) = (arg(0), arg(1)) else {
                return Err(missing("player", USAGE));
            };
            Command::RegisterPlayer {
                integration_id,
                request: RegisterPlayerRequest {
                    player_id,
                    alias: arg(2),
                },
            }
        }
        "show" => {
            const USAGE: &str = "show <INTEGRATION> <PLAYER>";
            let (Some(integration_id), Some(player_id)) = (arg(0), arg(1)) else {
                return Err(missing("show", USAGE));
            };
            Command::ShowPlayer {
                integration_id,
                player_id,
            }
        }
        "balance" => {
            const USAGE: &str = "balance <INTEGRATION> <PLAYER> <TOKEN>";
            let (Some(integration_id), Some(player_id), Some(token)) = (arg(0), arg(1), arg(2))
            else {
                return Err(missing("balance", USAGE));
            };
            Command::Balance {
                integration_id,
                player_id,
                token,
            }
        }
        "earn" => {
            const USAGE: &str = "earn <INTEGRATION> <PLAYER> <TOKEN> <AMOUNT> [SOURCE] [KEY=VALUE]...";
            let (Some(integration_id), Some(player_id), Some(token), Some(amount)) =
                (arg(0), arg(1), arg(2), arg(3))
            else {
                return Err(missing("earn", USAGE));
            };
            Command::Earn {
                integration_id,
                player_id,
                request: EarnRequest {
                    token,
                    amount: parse_number(&amount)?,
                    source: arg(4).unwrap_or_default(),
                    metadata: parse_metadata(rest.get(5..).unwrap_or_default())?,
                },
            }
        }
        "spend" => {
            const USAGE: &str = "spend <INTEGRATION> <PLAYER> <TOKEN> <AMOUNT> [REASON] [KEY=VALUE]...";
            let (Some(integration_id), Some(player_id), Some(token), Some(amount)) =
                (arg(0), arg(1), arg(2), arg(3))
            else {
                return Err(missing("spend", USAGE));
            };
            Command::Spend {
                integration_id,
                player_id,
                request: SpendRequest {
                    token,
                    amount: parse_number(&amount)?,
                    reason: arg(4).unwrap_or_default(),
                    metadata: parse_metadata(rest.get(5..).unwrap_or_default())?,
                },
            }
        }
        "history" => {
            const USAGE: &str = "history <INTEGRATION> <PLAYER> [LIMIT]";
            let (Some(integration_id), Some(player_id)) = (arg(0), arg(1)) else {
                return Err(missing("history", USAGE));
            };
            let limit = match arg(2) {
                Some(limit) => parse_number(&limit)?,
                None => DEFAULT_HISTORY_LIMIT,
            };
            Command::History {
                integration_id,
                player_id,
                limit,
            }
        }
        "demo" => Command::Demo,
        other => return Err(ParseError::UnrecognizedCommand(other.to_string())),
    };

    Ok(command)
}

fn missing(command: &'static str, usage: &'static str) -> ParseError {
    ParseError::MissingArgument { command, usage }
}

fn parse_metadata(pairs: &[String]) -> Result<Metadata, ParseError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(ParseError::InvalidMetadata(pair.clone())),
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

impl Command {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegisterIntegration(_) => "register_integration",
            Command::RegisterPlayer { .. } => "register_player",
            Command::ShowPlayer { .. } => "get_player",
            Command::Balance { .. } => "get_balance",
            Command::Earn { .. } => "earn",
            Command::Spend { .. } => "spend",
            Command::History { .. } => "history",
            Command::Demo => "demo",
        }
    }
}

/// Execute a command and render its result as JSON
pub async fn execute(store: &LedgerStore, command: Command) -> LedgerResult<Value> {
    let value = match command {
        Command::RegisterIntegration(request) => {
            request.validate()?;
            let integration = store
                .register_integration(&request.id, &request.name, &request.company_id)
                .await?;
            json!({ "status": "ok", "integration": integration })
        }
        Command::RegisterPlayer {
            integration_id,
            request,
        } => {
            request.validate()?;
            let player = store
                .register_player(&integration_id, &request.player_id, request.alias.as_deref())
                .await?;
            json!({ "status": "ok", "player": player })
        }
        Command::ShowPlayer {
            integration_id,
            player_id,
        } => json!(store.get_player(&integration_id, &player_id).await?),
        Command::Balance {
            integration_id,
            player_id,
            token,
        } => {
            let amount = store
                .get_balance(&integration_id, &player_id, &token)
                .await?;
            json!({ "token": token, "amount": amount })
        }
        Command::Earn {
            integration_id,
            player_id,
            request,
        } => {
            let player = store
                .apply_earn(&integration_id, &player_id, &request)
                .await?;
            json!({ "status": "ok", "player": player })
        }
        Command::Spend {
            integration_id,
            player_id,
            request,
        } => {
            let player = store
                .apply_spend(&integration_id, &player_id, &request)
                .await?;
            json!({ "status": "ok", "player": player })
        }
        Command::History {
            integration_id,
            player_id,
            limit,
        } => json!(store.history(&integration_id, &player_id, limit).await?),
        Command::Demo => run_demo(store).await?,
    };

    Ok(value)
}

/// Walk through the RACKDOG wallet scenario: signup bonus, a purchase, and
/// a rejected overspend.
///
/// The demo player persists across runs on a file database, so the
/// overspend is sized above whatever balance the purchase left behind.
async fn run_demo(store: &LedgerStore) -> LedgerResult<Value> {
    let mut steps = Vec::new();

    store
        .register_integration("rackdog", "RackDog Arena", "ciphermint")
        .await?;
    let player = store
        .register_player("rackdog", "player_demo_001", Some("GhostPlayer"))
        .await?;
    steps.push(json!({ "step": "signup", "player": player }));

    let player = store
        .earn("rackdog", "player_demo_001", "RACKDOG", 100, "signup_bonus")
        .await?;
    steps.push(json!({ "step": "earn", "balance": player.balance("RACKDOG") }));

    let player = store
        .spend("rackdog", "player_demo_001", "RACKDOG", 40, "skin_purchase")
        .await?;
    let balance = player.balance("RACKDOG");
    steps.push(json!({ "step": "spend", "balance": balance }));

    let overspend = balance.saturating_add(1).max(1000);
    match store
        .spend("rackdog", "player_demo_001", "RACKDOG", overspend, "cheat")
        .await
    {
        Err(e @ LedgerError::InsufficientFunds { .. }) => {
            steps.push(json!({ "step": "overspend", "amount": overspend, "rejected": e.to_string() }));
        }
        Err(e) => return Err(e),
        // Only possible if another caller credited the player in between
        Ok(player) => {
            steps.push(json!({
                "step": "overspend",
                "amount": overspend,
                "rejected": false,
                "balance": player.balance("RACKDOG"),
            }));
        }
    }

    let history = store.history("rackdog", "player_demo_001", 10).await?;
    steps.push(json!({ "step": "history", "entries": history }));

    Ok(Value::Array(steps))
}

/// Process exit code for a ledger error
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Infrastructure => 1,
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::InsufficientFunds => 4,
    }
}
