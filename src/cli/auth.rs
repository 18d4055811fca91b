//! Login, logout and the guard in front of protected commands.

use anyhow::Context;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use relief::{
    Access, ApiClient, Route, SessionState, SessionStore,
    domain::{Credentials, Registration},
    route::check,
};
use tracing::instrument;

use crate::cli::{
    output,
    terminal::{self, Colorize},
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Login {
    /// Login name (prompted for if omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (prompted for if omitted)
    #[arg(long, env = "RELIEF_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Login {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let store = SessionStore::new(workspace.client()?);
        let credentials = credentials(self.username, self.password)?;

        let user = store.login(&credentials).await?;
        workspace.save_session(store.api())?;

        println!("{}", format!("✅ Logged in as {}", user.username).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Register {
    /// Login name (prompted for if omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Contact address (prompted for if omitted)
    #[arg(short, long)]
    email: Option<String>,

    /// Password (prompted for if omitted)
    #[arg(long, env = "RELIEF_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Register {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let store = SessionStore::new(workspace.client()?);
        let theme = ColorfulTheme::default();

        let username = answer(self.username, || prompt(&theme, "Username"))?;
        let email = answer(self.email, || prompt(&theme, "Email"))?;
        let password = answer(self.password, || {
            Password::with_theme(&theme)
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .context("Failed to read password")
        })?;

        store
            .register(&Registration {
                username: username.clone(),
                email,
                password,
            })
            .await?;

        println!("{}", format!("✅ Created account {username}").success());
        println!();
        println!("Next steps:");
        println!("  relief login --username {username}");
        Ok(())
    }
}

#[instrument(skip_all)]
pub async fn logout(workspace: &Workspace) -> anyhow::Result<()> {
    let store = SessionStore::new(workspace.client()?);

    let result = store.logout().await;
    workspace.clear_session()?;
    result?;

    println!("{}", "✅ Logged out".success());
    Ok(())
}

#[instrument(skip_all)]
pub async fn whoami(workspace: &Workspace) -> anyhow::Result<()> {
    let store = workspace.connect().await?;
    let session = store.snapshot();

    match (session.state(), session.user()) {
        (SessionState::Authenticated, Some(user)) => {
            println!("{}", user.username.info());
            output::field("Id", Some(&user.id));
            output::field("Email", user.email.as_deref());
            output::field("Role", user.role.as_deref());
            output::field("Joined", user.created_at.map(|at| at.format("%Y-%m-%d")));
        }
        (SessionState::Error, _) => {
            anyhow::bail!(
                "{}",
                session.error().unwrap_or("Failed to fetch profile")
            );
        }
        _ => println!("{}", "Not logged in. Run 'relief login' to start a session.".dim()),
    }
    Ok(())
}

/// Enter `route`, resolving the session first if the route is protected.
///
/// A protected route visited without a session sends the user through login:
/// interactively when a terminal is attached, otherwise with an error that
/// names the login command.
#[instrument(level = "debug", skip(workspace))]
pub async fn enter(workspace: &Workspace, route: Route) -> anyhow::Result<SessionStore<ApiClient>> {
    let store = SessionStore::new(workspace.client()?);
    if route.requires_auth() {
        let state = store.initialize().await;
        tracing::debug!(%state, "session resolved");
    }

    let redirect = match check(route, &store.snapshot()) {
        Access::Granted => return Ok(store),
        Access::Redirect(redirect) => redirect,
    };

    if let Some(error) = store.snapshot().error() {
        tracing::warn!("Could not resolve the session: {error}");
    }
    if !terminal::is_interactive() {
        anyhow::bail!(
            "{} requires a logged-in user (redirected to {}). Run 'relief login' first",
            redirect.origin(),
            redirect.location()
        );
    }

    println!(
        "{}",
        format!("🔒 {} requires a logged-in user", redirect.origin()).warning()
    );
    store.login(&credentials(None, None)?).await?;
    workspace.save_session(store.api())?;

    let resumed = redirect
        .resume(&store.snapshot())
        .map_err(|redirect| anyhow::anyhow!("Still not allowed to enter {}", redirect.origin()))?;
    tracing::debug!(route = %resumed, "resumed after login");
    Ok(store)
}

fn credentials(username: Option<String>, password: Option<String>) -> anyhow::Result<Credentials> {
    let theme = ColorfulTheme::default();
    let username = answer(username, || prompt(&theme, "Username"))?;
    let password = answer(password, || {
        Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")
    })?;
    Ok(Credentials::new(username, password))
}

/// Use the given value, or ask for one if a terminal is attached.
fn answer(
    given: Option<String>,
    ask: impl FnOnce() -> anyhow::Result<String>,
) -> anyhow::Result<String> {
    match given {
        Some(value) => Ok(value),
        None if terminal::is_interactive() => ask(),
        None => Ok(String::new()),
    }
}

fn prompt(theme: &ColorfulTheme, label: &str) -> anyhow::Result<String> {
    Input::with_theme(theme)
        .with_prompt(label)
        .interact_text()
        .context("Failed to read input")
}
