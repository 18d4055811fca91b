//! The local `.relief` directory: configuration and the saved session.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use relief::{ApiClient, Config, SessionStore};

pub const WORKSPACE_DIR: &str = ".relief";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    initialized: bool,
}

impl Workspace {
    /// Load the workspace under `root`.
    ///
    /// A missing configuration file is not an error: the defaults apply.
    /// `base_url` overrides whatever is configured.
    pub fn open(root: PathBuf, base_url: Option<&str>) -> anyhow::Result<Self> {
        let config_path = root.join(WORKSPACE_DIR).join(CONFIG_FILE);
        let initialized = config_path.exists();
        let config = if initialized {
            Config::load(&config_path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            tracing::debug!("no workspace configuration at {}", config_path.display());
            Config::default()
        };
        let config = match base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        };

        Ok(Self {
            root,
            config,
            initialized,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join(CONFIG_FILE)
    }

    fn session_path(&self) -> PathBuf {
        self.dir().join(SESSION_FILE)
    }

    /// A client for the configured backend, carrying any saved session.
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let cookies = if self.config.persist_session {
            self.saved_session()?
        } else {
            None
        };
        Ok(ApiClient::with_cookies(
            self.config.base_url(),
            cookies.as_deref(),
        )?)
    }

    /// A session store whose state has been resolved against the backend.
    pub async fn connect(&self) -> anyhow::Result<SessionStore<ApiClient>> {
        let store = SessionStore::new(self.client()?);
        let state = store.initialize().await;
        tracing::debug!(%state, "session resolved");
        Ok(store)
    }

    fn saved_session(&self) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(self.session_path()) {
            Ok(content) => {
                let content = content.trim();
                Ok((!content.is_empty()).then(|| content.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read saved session"),
        }
    }

    /// Remember the client's session cookies for the next invocation.
    ///
    /// Does nothing unless the configuration asks for sessions to persist.
    pub fn save_session(&self, client: &ApiClient) -> anyhow::Result<()> {
        if !self.config.persist_session {
            return Ok(());
        }
        let Some(cookies) = client.cookie_header() else {
            return self.clear_session();
        };

        fs::create_dir_all(self.dir())
            .map_err(|e| anyhow::anyhow!("Failed to create {WORKSPACE_DIR} directory: {e}"))?;
        write_private(&self.session_path(), &cookies).context("Failed to save session")?;
        tracing::debug!("session saved to {}", self.session_path().display());
        Ok(())
    }

    /// Forget any saved session.
    pub fn clear_session(&self) -> anyhow::Result<()> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove saved session"),
        }
    }
}

/// Write a file only the current user may read, tightening the permissions
/// of a file left over from an earlier run before anything is written.
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}
