// CLI module - User-facing command-line interface

mod output;

use crate::capture::{injector, payload};
use crate::channel::{ChannelServer, Dispatcher};
use crate::config::{DevLogsConfig, CONFIG_FILE_NAME};
use crate::error::{DevLogsError, Result};
use crate::logs::{LogStore, Source};
use crate::plugin::DevLogsPlugin;
use crate::query::{LogQuery, QueryOutcome, QueryService};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// devlogs - Capture browser and dev server logs for on-demand queries
#[derive(Parser)]
#[command(name = "devlogs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (defaults to devlogs.toml in the project root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the channel relay and capture this process until Ctrl-C
    Serve {
        /// Address to listen on (overrides the config)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Show the most recent captured entries
    Query {
        /// Log source: browser or server
        source: String,

        /// Number of entries to return (1-100)
        #[arg(short = 'n', long)]
        entries: Option<usize>,

        /// Only return entries with this level
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Remove all captured entries of a source
    Clear {
        /// Log source: browser or server
        source: String,
    },

    /// Show the state of both log files
    Status,

    /// Print the browser instrumentation module
    Payload {
        /// Print the inert module served when browser capture is off
        #[arg(long)]
        disabled: bool,
    },
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let root = injector::project_root(self.root.clone())?;
        let config = self.load_config(&root)?;

        match &self.command {
            Commands::Serve { listen } => serve(config, root, listen.clone()),

            Commands::Query {
                source,
                entries,
                level,
            } => {
                let query = LogQuery::parse(source, *entries, level.as_deref())?;
                let outcome = run_query(open_store(&config, &root)?, &query)?;
                output::print_outcome(&outcome);
                Ok(())
            }

            Commands::Clear { source } => {
                let source: Source = source.parse()?;
                open_store(&config, &root)?.clear(source)?;
                output::print_success_msg(&format!("Cleared {} logs", source));
                Ok(())
            }

            Commands::Status => {
                let store = open_store(&config, &root)?;
                output::print_info(&format!("Log directory: {}", store.log_dir().display()));
                let stats = Source::ALL
                    .iter()
                    .map(|source| store.stats(*source))
                    .collect::<Result<Vec<_>>>()?;
                output::print_status_table(&stats);
                Ok(())
            }

            Commands::Payload { disabled } => {
                print!("{}", payload::module_source(!*disabled, &config.event));
                Ok(())
            }
        }
    }

    fn load_config(&self, root: &std::path::Path) -> Result<DevLogsConfig> {
        match &self.config {
            Some(path) => DevLogsConfig::from_file(path),
            None => DevLogsConfig::load_or_default(&root.join(CONFIG_FILE_NAME)),
        }
    }
}

fn open_store(config: &DevLogsConfig, root: &std::path::Path) -> Result<Arc<LogStore>> {
    let store = LogStore::with_options(config.resolved_log_dir(root), config.store_options())?;
    Ok(Arc::new(store))
}

/// Run a query, turning a store failure into an error so it is reported once
fn run_query(store: Arc<LogStore>, query: &LogQuery) -> Result<QueryOutcome> {
    let outcome = QueryService::new(store).query(query)?;
    match outcome {
        QueryOutcome::Failed { .. } => Err(DevLogsError::Other(outcome.render())),
        outcome => Ok(outcome),
    }
}

/// Relay browser events into the store and capture this process until Ctrl-C
fn serve(mut config: DevLogsConfig, root: PathBuf, listen: Option<String>) -> Result<()> {
    if let Some(listen) = listen {
        config.listen = listen;
        config.validate()?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listen = config.listen.clone();
        let plugin = DevLogsPlugin::new(config, root)?;
        let dispatcher = Arc::new(Dispatcher::new());

        let capture = plugin.configure_server(dispatcher.as_ref())?;
        let server = ChannelServer::bind(&listen, Arc::clone(&dispatcher)).await?;

        output::print_success_msg(&format!(
            "Relay listening on {} (event {})",
            server.local_addr()?,
            plugin.config().event
        ));
        output::print_info(&format!(
            "Writing logs to {}",
            plugin.store()?.log_dir().display()
        ));

        server
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
            })
            .await?;

        drop(capture);
        output::print_info("Stopped");
        Ok::<(), DevLogsError>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from(["devlogs", "query", "browser", "-n", "5", "--level", "warn"])
            .unwrap();

        match cli.command {
            Commands::Query {
                source,
                entries,
                level,
            } => {
                assert_eq!(source, "browser");
                assert_eq!(entries, Some(5));
                assert_eq!(level.as_deref(), Some("warn"));
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_global_root_option() {
        let cli = Cli::try_parse_from(["devlogs", "status", "--root", "/tmp/project"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/project")));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_run_query_reports_store_failure_as_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(temp_dir.path().join(".devlogs")).unwrap());
        let query = LogQuery::new(Source::Server);

        assert!(matches!(
            run_query(Arc::clone(&store), &query),
            Ok(QueryOutcome::Empty { .. })
        ));

        std::fs::create_dir_all(store.path(Source::Server)).unwrap();
        match run_query(store, &query) {
            Err(DevLogsError::Other(message)) => {
                assert!(message.starts_with("Error reading server logs:"));
            }
            other => panic!("expected a read error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_config_defaults_when_missing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["devlogs", "payload"]).unwrap();

        let config = cli.load_config(temp_dir.path()).unwrap();
        assert_eq!(config, DevLogsConfig::default());
    }
}
