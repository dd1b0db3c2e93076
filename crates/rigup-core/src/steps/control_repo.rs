//! Control repository checkout and bring-up.
//!
//! Clones the configuration control repo and its caco runner, provisions the
//! repo's decryption key pair from the vault, and finishes the repo's own
//! bootstrap: brew build deps, toolchain install, bundle install, log file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StepError, StepResult};
use crate::settings::Settings;
use crate::shell::Shell;
use crate::step::Step;
use crate::vault::VaultSession;

const DEFAULT_CACO_REPO: &str = "https://github.com/fernandes/caco";
const DEFAULT_KEYS_ITEM: &str = "Control Repo";
const PRIVATE_KEY: &str = "private_key.pkcs7.pem";
const PUBLIC_KEY: &str = "public_key.pkcs7.pem";
const BREW_DEPS: [&str; 2] = ["augeas", "pkgconf"];
const LOG_FILE: &str = "/var/log/caco.log";

pub struct ControlRepo {
    shell: Arc<dyn Shell>,
    config_dir: PathBuf,
    control_repo: Option<String>,
    caco_repo: String,
    keys_item: String,
    log_file: PathBuf,
}

impl ControlRepo {
    pub fn new(shell: Arc<dyn Shell>, settings: &Settings, home: &Path) -> Self {
        Self {
            shell,
            config_dir: home.join("config"),
            control_repo: settings.get_str("control.repo").map(str::to_string),
            caco_repo: settings.str_or("control.caco_repo", DEFAULT_CACO_REPO),
            keys_item: settings.str_or("bitwarden.control_item", DEFAULT_KEYS_ITEM),
            log_file: PathBuf::from(LOG_FILE),
        }
    }

    /// Override the log file location (tests).
    pub fn with_log_file(mut self, log_file: PathBuf) -> Self {
        self.log_file = log_file;
        self
    }

    fn control_path(&self) -> PathBuf {
        self.config_dir.join("control")
    }

    fn caco_path(&self) -> PathBuf {
        self.config_dir.join("caco")
    }

    fn keys_path(&self) -> PathBuf {
        self.control_path().join("keys")
    }

    fn keys_present(&self) -> bool {
        self.keys_path().join(PRIVATE_KEY).exists() && self.keys_path().join(PUBLIC_KEY).exists()
    }

    async fn brew_deps_installed(&self) -> bool {
        let result = self.shell.run("brew list --formula").await;
        if !result.success {
            return false;
        }
        let installed: Vec<&str> = result.stdout.lines().collect();
        BREW_DEPS.iter().all(|dep| installed.contains(dep))
    }

    async fn missing_brew_deps(&self) -> Vec<&'static str> {
        let result = self.shell.run("brew list --formula").await;
        if !result.success {
            return BREW_DEPS.to_vec();
        }
        let installed: Vec<&str> = result.stdout.lines().collect();
        BREW_DEPS
            .iter()
            .copied()
            .filter(|dep| !installed.contains(dep))
            .collect()
    }

    async fn toolchain_current(&self) -> bool {
        let command = format!("cd {} && mise current", self.control_path().display());
        let result = self.shell.run(&command).await;
        result.success && !result.stdout.contains("not installed")
    }

    async fn bundle_satisfied(&self) -> bool {
        let command = format!(
            "cd {} && eval \"$(mise activate bash)\" && bundle check",
            self.control_path().display()
        );
        self.shell.run(&command).await.success
    }

    fn log_file_exists(&self) -> bool {
        self.log_file.exists()
    }

    async fn clone_repo(&self, url: &str, destination: &Path) -> StepResult {
        let command = format!("git clone {} {}", url, destination.display());
        let result = self.shell.run(&command).await;
        if !result.success {
            return Err(StepError::command_failed(command, result.stderr));
        }
        Ok(())
    }

    async fn fetch_keys(&self) -> StepResult {
        std::fs::create_dir_all(self.keys_path())?;

        info!(item = %self.keys_item, "fetching repo decryption keys from vault");
        let session = VaultSession::open(self.shell.as_ref()).await;
        let private = self.keys_path().join(PRIVATE_KEY);
        let public = self.keys_path().join(PUBLIC_KEY);
        session
            .fetch_attachments(
                &self.keys_item,
                &[
                    (PRIVATE_KEY, private.as_path()),
                    (PUBLIC_KEY, public.as_path()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn install_brew_deps(&self) {
        let missing = self.missing_brew_deps().await;
        if missing.is_empty() {
            return;
        }
        let command = format!("brew install {}", missing.join(" "));
        self.shell.run(&command).await;
    }

    async fn ensure_log_file(&self) {
        if self.log_file_exists() {
            return;
        }
        let path = self.log_file.display();
        self.shell.run(&format!("sudo touch {path}")).await;
        self.shell
            .run(&format!("sudo chown \"$(whoami)\" {path}"))
            .await;
    }
}

#[async_trait]
impl Step for ControlRepo {
    fn name(&self) -> &str {
        "Control Repo"
    }

    async fn probe(&self) -> bool {
        self.control_path().is_dir()
            && self.caco_path().is_dir()
            && self.keys_present()
            && self.brew_deps_installed().await
            && self.toolchain_current().await
            && self.bundle_satisfied().await
            && self.log_file_exists()
    }

    async fn apply(&self) -> StepResult {
        std::fs::create_dir_all(&self.config_dir)?;

        if !self.caco_path().is_dir() {
            self.clone_repo(&self.caco_repo, &self.caco_path()).await?;
        }

        if !self.control_path().is_dir() {
            let control_repo = self
                .control_repo
                .as_deref()
                .ok_or_else(|| StepError::MissingSetting("control.repo".to_string()))?;
            self.clone_repo(control_repo, &self.control_path()).await?;
        }

        if !self.keys_present() {
            self.fetch_keys().await?;
        }

        self.install_brew_deps().await;

        if !self.toolchain_current().await {
            let command = format!("cd {} && mise install", self.control_path().display());
            self.shell.run(&command).await;
        }

        if !self.bundle_satisfied().await {
            let command = format!(
                "cd {} && eval \"$(mise activate bash)\" && bundle install",
                self.control_path().display()
            );
            self.shell.run(&command).await;
        }

        self.ensure_log_file().await;
        Ok(())
    }
}
