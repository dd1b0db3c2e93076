//! Mise toolchain manager: CLI, ruby version-file support, zsh activation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StepResult;
use crate::shell::Shell;
use crate::step::Step;

const ZSHRC_LINE: &str = "eval \"$(mise activate zsh)\"";
const RUBY_BUILD_DEPS: [&str; 5] = ["openssl@3", "readline", "libyaml", "gmp", "autoconf"];

pub struct Mise {
    shell: Arc<dyn Shell>,
    zshrc: PathBuf,
}

impl Mise {
    pub fn new(shell: Arc<dyn Shell>, home: &Path) -> Self {
        Self {
            shell,
            zshrc: home.join(".zshrc"),
        }
    }

    async fn cli_installed(&self) -> bool {
        let result = self.shell.run("which mise").await;
        result.success && !result.trimmed().is_empty()
    }

    async fn ruby_version_file_enabled(&self) -> bool {
        let result = self
            .shell
            .run("mise settings get idiomatic_version_file_enable_tools")
            .await;
        result.success && result.stdout.contains("ruby")
    }

    fn zsh_activated(&self) -> bool {
        match std::fs::read_to_string(&self.zshrc) {
            Ok(content) => content.contains(ZSHRC_LINE),
            Err(_) => false,
        }
    }

    async fn missing_ruby_build_deps(&self) -> Vec<&'static str> {
        let result = self.shell.run("brew list --formula").await;
        if !result.success {
            return RUBY_BUILD_DEPS.to_vec();
        }

        let installed: Vec<&str> = result.stdout.lines().collect();
        RUBY_BUILD_DEPS
            .iter()
            .copied()
            .filter(|dep| !installed.contains(dep))
            .collect()
    }

    async fn install_ruby_build_deps(&self) {
        let missing = self.missing_ruby_build_deps().await;
        if missing.is_empty() {
            return;
        }
        let command = format!("brew install {}", missing.join(" "));
        self.shell.run(&command).await;
    }

    fn activate_in_zsh(&self) -> std::io::Result<()> {
        let mut content = std::fs::read_to_string(&self.zshrc).unwrap_or_default();
        content.push_str("\n# Mise\n");
        content.push_str(ZSHRC_LINE);
        content.push('\n');
        std::fs::write(&self.zshrc, content)
    }
}

#[async_trait]
impl Step for Mise {
    fn name(&self) -> &str {
        "Mise"
    }

    async fn probe(&self) -> bool {
        self.cli_installed().await
            && self.ruby_version_file_enabled().await
            && self.zsh_activated()
    }

    async fn apply(&self) -> StepResult {
        self.install_ruby_build_deps().await;

        if !self.cli_installed().await {
            self.shell.run("brew install mise").await;
        }

        self.shell
            .run("mise settings add idiomatic_version_file_enable_tools ruby")
            .await;

        if !self.zsh_activated() {
            self.activate_in_zsh()?;
        }
        Ok(())
    }
}
