//! Bitwarden CLI installation and server configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{StepError, StepResult};
use crate::settings::Settings;
use crate::shell::Shell;
use crate::step::Step;

pub struct BitwardenCli {
    shell: Arc<dyn Shell>,
    server_url: Option<String>,
}

impl BitwardenCli {
    pub fn new(shell: Arc<dyn Shell>, settings: &Settings) -> Self {
        Self {
            shell,
            server_url: settings.get_str("bitwarden.server").map(str::to_string),
        }
    }

    async fn cli_installed(&self) -> bool {
        let result = self.shell.run("which bw").await;
        result.success && !result.trimmed().is_empty()
    }

    async fn server_configured(&self) -> bool {
        let Some(server_url) = self.server_url.as_deref() else {
            return false;
        };
        let result = self.shell.run("bw config server").await;
        result.success && result.trimmed() == server_url
    }
}

#[async_trait]
impl Step for BitwardenCli {
    fn name(&self) -> &str {
        "Bitwarden CLI"
    }

    async fn probe(&self) -> bool {
        self.cli_installed().await && self.server_configured().await
    }

    async fn apply(&self) -> StepResult {
        let server_url = self
            .server_url
            .as_deref()
            .ok_or_else(|| StepError::MissingSetting("bitwarden.server".to_string()))?;

        if !self.cli_installed().await {
            self.shell.run("brew install bitwarden-cli").await;
        }

        let command = format!("bw config server {server_url}");
        self.shell.run(&command).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeShell;

    const SERVER: &str = "https://vault.example.com";

    fn step(shell: Arc<FakeShell>) -> BitwardenCli {
        let settings =
            Settings::from_yaml(&format!("bitwarden:\n  server: {SERVER}\n")).unwrap();
        BitwardenCli::new(shell, &settings)
    }

    #[tokio::test]
    async fn probe_false_when_cli_missing() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_err("which bw", "");

        assert!(!step(shell).probe().await);
    }

    #[tokio::test]
    async fn probe_false_when_server_differs() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_ok("which bw", "/opt/homebrew/bin/bw");
        shell.respond_ok("bw config server", "https://other.server.com");

        assert!(!step(shell).probe().await);
    }

    #[tokio::test]
    async fn probe_true_when_configured() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_ok("which bw", "/opt/homebrew/bin/bw");
        shell.respond_ok("bw config server", SERVER);

        assert!(step(shell).probe().await);
    }

    #[tokio::test]
    async fn apply_installs_cli_when_missing() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_err("which bw", "");

        step(shell.clone()).apply().await.unwrap();

        assert!(shell.ran("brew install bitwarden-cli"));
        assert!(shell.ran(&format!("bw config server {SERVER}")));
    }

    #[tokio::test]
    async fn apply_only_configures_server_when_cli_present() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_ok("which bw", "/opt/homebrew/bin/bw");

        step(shell.clone()).apply().await.unwrap();

        assert!(!shell.ran("brew install bitwarden-cli"));
        assert!(shell.ran(&format!("bw config server {SERVER}")));
    }

    #[tokio::test]
    async fn apply_requires_the_server_setting() {
        let shell = Arc::new(FakeShell::new());
        let step = BitwardenCli::new(shell, &Settings::empty());

        let err = step.apply().await.unwrap_err();

        assert!(matches!(err, StepError::MissingSetting(_)));
    }
}
