use std::fs;

use tracing::instrument;

use crate::cli::{
    terminal::Colorize,
    workspace::{WORKSPACE_DIR, Workspace},
};

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Do not keep the login session between invocations
    #[arg(long)]
    no_persist_session: bool,
}

impl Init {
    #[instrument(skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        if workspace.is_initialized() {
            anyhow::bail!(
                "Workspace already initialized (found existing {WORKSPACE_DIR} directory)"
            );
        }

        fs::create_dir_all(workspace.dir())
            .map_err(|e| anyhow::anyhow!("Failed to create {WORKSPACE_DIR} directory: {e}"))?;

        let mut config = workspace.config().clone();
        config.persist_session = !self.no_persist_session;
        config
            .save(&workspace.config_path())
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        println!(
            "{}",
            format!("✅ Initialized workspace in {}", workspace.root().display()).success()
        );
        println!("  Created: {WORKSPACE_DIR}/config.toml");
        println!("  Backend: {}", config.base_url().info());
        if !config.persist_session {
            println!("  {}", "Sessions are not saved between invocations".dim());
        }

        println!();
        println!("Next steps:");
        println!("  relief login          # Start a session");
        println!("  relief disaster list  # Browse active disasters");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use relief::Config;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn writes_config_with_chosen_backend() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(
            tmp.path().to_path_buf(),
            Some("https://relief.example.org/api"),
        )
        .unwrap();

        Init {
            no_persist_session: true,
        }
        .run(&workspace)
        .unwrap();

        let config = Config::load(&workspace.config_path()).unwrap();
        assert_eq!(config.base_url(), "https://relief.example.org/api");
        assert!(!config.persist_session);
    }

    #[test]
    fn refuses_to_initialize_twice() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path().to_path_buf(), None).unwrap();
        Init {
            no_persist_session: false,
        }
        .run(&workspace)
        .unwrap();

        let reopened = Workspace::open(tmp.path().to_path_buf(), None).unwrap();
        let result = Init {
            no_persist_session: false,
        }
        .run(&reopened);

        assert!(result.is_err());
    }
}
