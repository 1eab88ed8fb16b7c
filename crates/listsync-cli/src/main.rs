// # listsync - container sync CLI
//
// Thin integration layer over listsync-core. Responsibilities:
//
// 1. Reading credentials and cache settings from environment variables
// 2. Parsing the subcommand
// 3. Building the engine and invoking exactly one operation
// 4. Printing the structured result as JSON
//
// All sync logic lives in listsync-core; all transport lives in
// listsync-provider-cato. Nothing here retries, caches, or decides.
//
// ## Configuration
//
// ### Remote service
// - `CATO_API_KEY`: API key (required)
// - `CATO_ACCOUNT_ID`: Account ID (required)
// - `CATO_API_URL`: GraphQL endpoint (optional)
//
// ### Cache
// - `LISTSYNC_CACHE_ENABLED`: "false"/"0"/"no" disables the cache
// - `LISTSYNC_CACHE_PATH`: store file (default: ~/.listsync/cache.db)
//
// ### Logging
// - `LISTSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: warn)
//
// ## Example
//
// ```bash
// export CATO_API_KEY=your_key
// export CATO_ACCOUNT_ID=12345
//
// listsync add-ip edge-allow 10.0.0.1-10.0.0.10
// listsync add-fqdns blocklist bad.example.com worse.example.com
// listsync validate --fix
// ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use listsync_core::config::{CacheConfig, EngineConfig};
use listsync_core::{ContainerEngine, Error, IpRange};
use listsync_provider_cato::CatoClient;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or usage error
/// - 2: Runtime error (remote or store failure)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "listsync", version, about = "Manage remote membership containers with a local cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an IP range container
    CreateIp {
        /// Container name
        name: String,
        /// Container description
        #[arg(long, default_value = "")]
        description: String,
        /// Initial ranges (addr or from-to), repeatable
        #[arg(long = "range")]
        ranges: Vec<String>,
    },
    /// Create an FQDN container
    CreateFqdn {
        /// Container name
        name: String,
        /// Container description
        #[arg(long, default_value = "")]
        description: String,
        /// Initial FQDNs, repeatable
        #[arg(long = "fqdn")]
        fqdns: Vec<String>,
    },
    /// Add an IP range to a container
    AddIp {
        /// Container name
        container: String,
        /// Range as addr or from-to
        range: String,
    },
    /// Remove an IP range from a container
    RemoveIp {
        /// Container name
        container: String,
        /// Range as addr or from-to
        range: String,
    },
    /// Add FQDNs to a container
    AddFqdns {
        /// Container name
        container: String,
        /// Domain names to add
        #[arg(required = true)]
        fqdns: Vec<String>,
    },
    /// Remove FQDNs from a container
    RemoveFqdns {
        /// Container name
        container: String,
        /// Domain names to remove
        #[arg(required = true)]
        fqdns: Vec<String>,
    },
    /// Delete a container and clear its cache state
    Delete {
        /// Container name
        container: String,
    },
    /// List remote containers with cache summaries
    List,
    /// List cached values for a container
    Cached {
        /// Container name
        container: String,
    },
    /// Purge cached entries older than a threshold
    Purge {
        /// Container name
        container: String,
        /// Maximum entry age in days
        #[arg(long, default_value_t = 30)]
        max_age_days: u32,
    },
    /// Show cache statistics
    Stats {
        /// Container name (omit for store-wide statistics)
        container: Option<String>,
    },
    /// Clear all cached entries for a container (local only)
    Clear {
        /// Container name
        container: String,
    },
    /// Validate the cache against the remote container listing
    Validate {
        /// Clear cache state for containers that no longer exist remotely
        #[arg(long)]
        fix: bool,
    },
}

/// Cache and logging settings from environment variables
struct Settings {
    cache_enabled: bool,
    cache_path: Option<String>,
    log_level: String,
}

impl Settings {
    fn from_env() -> Self {
        let cache_enabled = !matches!(
            env::var("LISTSYNC_CACHE_ENABLED")
                .unwrap_or_default()
                .to_lowercase()
                .as_str(),
            "false" | "0" | "no"
        );
        Self {
            cache_enabled,
            cache_path: env::var("LISTSYNC_CACHE_PATH").ok(),
            log_level: env::var("LISTSYNC_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache: CacheConfig {
                enabled: self.cache_enabled,
                path: self.cache_path.clone().map(Into::into),
            },
        }
    }
}

/// Parse a range argument: a bare address or `from-to`
fn parse_range(arg: &str) -> Result<IpRange> {
    if let Some((from, to)) = arg.split_once('-') {
        Ok(IpRange::new(
            from.trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid start address '{}': {}", from, e))?,
            to.trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid end address '{}': {}", to, e))?,
        ))
    } else {
        Ok(IpRange::single(arg.trim().parse().map_err(|e| {
            anyhow::anyhow!("invalid address '{}': {}", arg, e)
        })?))
    }
}

fn parse_ranges(args: &[String]) -> Result<Vec<IpRange>> {
    args.iter().map(|a| parse_range(a)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::from_env();

    // Initialize tracing
    let log_level = match settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(cli.command, settings).await {
            Ok(()) => SyncExitCode::Success,
            Err(e) => {
                error!("{}", e);
                eprintln!("Error: {}", e);
                exit_code_for(&e)
            }
        }
    })
    .into()
}

/// Map configuration/usage failures to exit code 1, everything else to 2
fn exit_code_for(err: &anyhow::Error) -> SyncExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Config(_)) | Some(Error::CacheDisabled) => SyncExitCode::ConfigError,
        Some(_) => SyncExitCode::RuntimeError,
        None => SyncExitCode::ConfigError, // argument parse failures
    }
}

async fn run(command: Command, settings: Settings) -> Result<()> {
    let service = CatoClient::from_env()?;
    let engine = ContainerEngine::new(Box::new(service), settings.engine_config()).await?;

    match command {
        Command::CreateIp {
            name,
            description,
            ranges,
        } => {
            let ranges = parse_ranges(&ranges)?;
            let info = engine.create_ip_container(&name, &description, &ranges).await?;
            print_json(&info)
        }
        Command::CreateFqdn {
            name,
            description,
            fqdns,
        } => {
            let info = engine.create_fqdn_container(&name, &description, &fqdns).await?;
            print_json(&info)
        }
        Command::AddIp { container, range } => {
            let range = parse_range(&range)?;
            let outcome = engine.add_ip_range(&container, &range).await?;
            print_json(&outcome)
        }
        Command::RemoveIp { container, range } => {
            let range = parse_range(&range)?;
            let outcome = engine.remove_ip_range(&container, &range).await?;
            print_json(&outcome)
        }
        Command::AddFqdns { container, fqdns } => {
            let outcome = engine.add_fqdns(&container, &fqdns).await?;
            print_json(&outcome)
        }
        Command::RemoveFqdns { container, fqdns } => {
            let outcome = engine.remove_fqdns(&container, &fqdns).await?;
            print_json(&outcome)
        }
        Command::Delete { container } => {
            engine.delete_container(&container).await?;
            print_json(&serde_json::json!({ "deleted": container }))
        }
        Command::List => {
            let listings = engine.list_containers().await?;
            print_json(&listings)
        }
        Command::Cached { container } => {
            let values = engine.list_cached(&container).await?;
            print_json(&values)
        }
        Command::Purge {
            container,
            max_age_days,
        } => {
            let summary = engine.purge_stale(&container, max_age_days).await?;
            print_json(&summary)
        }
        Command::Stats { container } => {
            let stats = engine.stats(container.as_deref()).await?;
            print_json(&stats)
        }
        Command::Clear { container } => {
            let summary = engine.clear_cache(&container).await?;
            print_json(&summary)
        }
        Command::Validate { fix } => {
            let report = engine.validate(fix).await?;
            print_json(&report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_argument_accepts_bare_address() {
        let range = parse_range("10.0.0.5").unwrap();
        assert_eq!(range.from, range.to);
    }

    #[test]
    fn range_argument_accepts_from_to() {
        let range = parse_range("10.0.0.1-10.0.0.10").unwrap();
        assert_eq!(range.from.to_string(), "10.0.0.1");
        assert_eq!(range.to.to_string(), "10.0.0.10");
    }

    #[test]
    fn bad_range_argument_is_rejected() {
        assert!(parse_range("not-an-address").is_err());
        assert!(parse_range("").is_err());
    }
}
