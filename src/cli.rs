use std::{fmt::Display, future::Future, path::PathBuf};

use anyhow::Context;
use clap::ArgAction;
use relief::ActionExecutor;
use tracing::instrument;

mod auth;
mod cache;
mod disaster;
mod geolocate;
mod init;
mod output;
mod report;
mod resource;
mod status;
mod terminal;
mod triage;
mod workspace;

use status::Status;
use workspace::Workspace;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory holding the `.relief` workspace
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Backend API URL, overriding the configured one
    #[arg(long, env = "RELIEF_BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let workspace = Workspace::open(self.root, self.base_url.as_deref())?;
        let command = self
            .command
            .unwrap_or_else(|| Command::Status(Status::default()));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        runtime.block_on(command.run(&workspace))
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show backend and session status (default)
    Status(Status),

    /// Initialize a workspace in the root directory
    Init(init::Init),

    /// Log in to the backend
    Login(auth::Login),

    /// End the current session
    Logout,

    /// Create an account
    Register(auth::Register),

    /// Show the logged-in user
    Whoami,

    /// List and manage disasters
    #[command(visible_alias = "disasters")]
    Disaster(disaster::Command),

    /// List and manage resources
    #[command(visible_alias = "resources")]
    Resource(resource::Command),

    /// List, submit and verify field reports
    #[command(visible_alias = "reports")]
    Report(report::Command),

    /// Rank reports (or a piece of text) by urgency
    ///
    /// Text is matched against a fixed lexicon of emergency keywords. One or
    /// two matches are high priority, three or more are critical.
    Triage(triage::Triage),

    /// Extract a location from a free-text description
    Geolocate(geolocate::Geolocate),

    /// Read and write the backend cache
    Cache(cache::Command),
}

impl Command {
    async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(workspace).await?,
            Self::Init(command) => command.run(workspace)?,
            Self::Login(command) => command.run(workspace).await?,
            Self::Logout => auth::logout(workspace).await?,
            Self::Register(command) => command.run(workspace).await?,
            Self::Whoami => auth::whoami(workspace).await?,
            Self::Disaster(command) => command.run(workspace).await?,
            Self::Resource(command) => command.run(workspace).await?,
            Self::Report(command) => command.run(workspace).await?,
            Self::Triage(command) => command.run(workspace).await?,
            Self::Geolocate(command) => command.run(workspace).await?,
            Self::Cache(command) => command.run(workspace).await?,
        }
        Ok(())
    }
}

/// Run a change against the backend behind a spinner.
///
/// A failed change surfaces as an error carrying the backend's message.
#[instrument(level = "debug", skip(operation))]
async fn perform<T, F, Fut, E>(message: &str, operation: F) -> anyhow::Result<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let executor = ActionExecutor::new();
    let spinner = terminal::spinner(message);
    let outcome = executor.execute(operation).await;
    spinner.finish_and_clear();
    outcome.into_result().map_err(anyhow::Error::msg)
}
