use relief::{Route, api::CacheEntry};
use serde_json::Value;
use tracing::instrument;

use crate::cli::{
    auth, output, perform,
    terminal::{self, Colorize},
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Debug, clap::Parser)]
enum CacheCommand {
    /// Print a cached value as JSON
    Get { key: String },

    /// Store a value
    Set {
        key: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,

        /// Lifetime in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Remove a cached value
    Delete {
        key: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Command {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let store = auth::enter(workspace, Route::Cache).await?;
        let api = store.api();

        match self.command {
            CacheCommand::Get { key } => {
                let value = api.cache_entry(&key).await?;
                output::render_json(&value)?;
            }
            CacheCommand::Set { key, value, ttl } => {
                let entry = CacheEntry {
                    key,
                    value: parse_value(&value),
                    ttl,
                };
                let message = perform("Storing value", || api.set_cache(&entry)).await?;
                let message = message.unwrap_or_else(|| format!("Stored '{}'", entry.key));
                println!("{}", format!("✅ {message}").success());
            }
            CacheCommand::Delete { key, yes } => {
                if !terminal::confirm(yes, &format!("Delete cached value '{key}'?"))? {
                    println!("{}", "Cancelled".dim());
                    return Ok(());
                }
                perform("Deleting value", || api.delete_cache(&key)).await?;
                println!("{}", format!("✅ Deleted '{key}'").success());
            }
        }
        Ok(())
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
