//! warden-dns: filtering recursive DNS proxy.

mod bootstrap;
mod client;
mod server;

use clap::{Parser, Subcommand};
use hickory_proto::rr::RecordType;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use warden_dns_application::ports::BlockingToggle;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Exit codes: 0 success, 1 malformed command, 2 RPC failure.
const EXIT_MALFORMED: i32 = 1;
const EXIT_RPC: i32 = 2;

#[derive(Parser)]
#[command(name = "warden-dns", version)]
#[command(about = "Filtering recursive DNS proxy")]
struct Cli {
    /// Configuration file (defaults to $WARDEN_DNS_CONFIG, then
    /// /etc/warden-dns/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the DNS proxy (default when no subcommand is given)
    Serve,

    /// Runtime blocking control, broadcast through the shared store
    Blocking {
        #[command(subcommand)]
        action: BlockingAction,
    },

    /// Resolve a name against a running instance
    Query {
        name: String,

        /// Query type (A, AAAA, TXT, …)
        #[arg(long = "type", default_value = "A")]
        qtype: String,

        #[arg(long, default_value = "127.0.0.1:53")]
        server: String,
    },

    /// Probe a running instance
    Healthcheck {
        #[arg(long, default_value = "127.0.0.1:53")]
        server: String,
    },
}

#[derive(Subcommand)]
enum BlockingAction {
    /// Re-enable blocking
    Enable {
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
    },

    /// Disable blocking, optionally for a duration (e.g. 30s, 5m, 1h)
    Disable {
        #[arg(long)]
        duration: Option<String>,

        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
    },

    /// Show the blocking state
    Status,
}

/// `30s` / `5m` / `2h` / plain seconds.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&raw[..raw.len() - 1], c),
        _ => (raw, 's'),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    let secs = match unit {
        's' => value,
        'm' => value * 60,
        'h' => value * 3600,
        'd' => value * 86_400,
        _ => return Err(format!("invalid duration unit '{unit}'")),
    };
    Ok(Duration::from_secs(secs))
}

fn fail(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help/version output is not a malformed command.
            let code = if e.use_stderr() { EXIT_MALFORMED } else { 0 };
            std::process::exit(code);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = match bootstrap::config::load(cli.config) {
                Ok(config) => config,
                Err(e) => fail(EXIT_MALFORMED, format!("{e:#}")),
            };
            bootstrap::logging::init(&config.logging);
            if let Err(e) = server::run(config).await {
                fail(EXIT_RPC, format!("{e:#}"));
            }
        }

        Command::Query {
            name,
            qtype,
            server,
        } => {
            bootstrap::logging::init_quiet();
            let qtype = match RecordType::from_str(&qtype.to_ascii_uppercase()) {
                Ok(qtype) => qtype,
                Err(_) => fail(EXIT_MALFORMED, format!("unknown query type '{qtype}'")),
            };
            if let Err(e) = client::query(&server, &name, qtype).await {
                fail(EXIT_RPC, format!("{e:#}"));
            }
        }

        Command::Healthcheck { server } => {
            bootstrap::logging::init_quiet();
            if let Err(e) = client::healthcheck(&server).await {
                fail(EXIT_RPC, format!("{e:#}"));
            }
        }

        Command::Blocking { action } => {
            bootstrap::logging::init_quiet();
            let config = match bootstrap::config::load(cli.config) {
                Ok(config) => config,
                Err(e) => fail(EXIT_MALFORMED, format!("{e:#}")),
            };

            let toggle = match action {
                BlockingAction::Enable { groups } => BlockingToggle {
                    enabled: true,
                    duration: None,
                    groups: groups.iter().map(|g| Arc::from(g.as_str())).collect(),
                },
                BlockingAction::Disable { duration, groups } => {
                    let duration = match duration.as_deref().map(parse_duration).transpose() {
                        Ok(duration) => duration,
                        Err(e) => fail(EXIT_MALFORMED, e),
                    };
                    BlockingToggle {
                        enabled: false,
                        duration,
                        groups: groups.iter().map(|g| Arc::from(g.as_str())).collect(),
                    }
                }
                BlockingAction::Status => {
                    // Controller state lives in the serving process; without
                    // a management surface there is nothing to interrogate.
                    fail(
                        EXIT_RPC,
                        "blocking status requires the management surface of a running instance",
                    );
                }
            };

            if let Err(e) = client::publish_blocking_toggle(&config, toggle).await {
                fail(EXIT_RPC, format!("{e:#}"));
            }
        }
    }
}
