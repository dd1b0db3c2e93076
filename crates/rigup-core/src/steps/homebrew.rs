//! Homebrew installation and shell environment wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StepError, StepResult};
use crate::shell::Shell;
use crate::step::Step;

const INSTALL_SCRIPT: &str = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";
const BREW_PATH_INTEL: &str = "/usr/local/bin/brew";
const BREW_PATH_ARM: &str = "/opt/homebrew/bin/brew";

pub struct Homebrew {
    shell: Arc<dyn Shell>,
    intel_path: PathBuf,
    arm_path: PathBuf,
    zprofile: PathBuf,
}

impl Homebrew {
    pub fn new(shell: Arc<dyn Shell>, home: &Path) -> Self {
        Self {
            shell,
            intel_path: PathBuf::from(BREW_PATH_INTEL),
            arm_path: PathBuf::from(BREW_PATH_ARM),
            zprofile: home.join(".zprofile"),
        }
    }

    /// Override the probed binary locations (tests).
    pub fn with_paths(
        shell: Arc<dyn Shell>,
        intel_path: PathBuf,
        arm_path: PathBuf,
        zprofile: PathBuf,
    ) -> Self {
        Self {
            shell,
            intel_path,
            arm_path,
            zprofile,
        }
    }

    fn brew_installed(&self) -> bool {
        self.intel_path.exists() || self.arm_path.exists()
    }

    /// ARM location wins when both exist.
    fn brew_path(&self) -> &Path {
        if self.arm_path.exists() {
            &self.arm_path
        } else {
            &self.intel_path
        }
    }

    async fn install_homebrew(&self) -> StepResult {
        let command = format!("/bin/bash -c \"$(curl -fsSL {INSTALL_SCRIPT})\"");
        let result = self.shell.run_interactive(&command).await;
        if !result.success {
            return Err(StepError::command_failed(
                "homebrew install script",
                "installer exited with a failure status",
            ));
        }
        Ok(())
    }

    /// Append the shellenv hook to ~/.zprofile unless it is already there,
    /// then evaluate it for the current run.
    async fn configure_shell(&self) -> StepResult {
        let shellenv_line = format!("eval \"$({} shellenv)\"", self.brew_path().display());

        let already_present = match std::fs::read_to_string(&self.zprofile) {
            Ok(content) => content.contains(&shellenv_line),
            Err(_) => false,
        };

        if !already_present {
            let mut content = std::fs::read_to_string(&self.zprofile).unwrap_or_default();
            content.push('\n');
            content.push_str(&shellenv_line);
            content.push('\n');
            std::fs::write(&self.zprofile, content)?;
        }

        self.shell.run(&shellenv_line).await;
        Ok(())
    }

    async fn disable_analytics(&self) {
        let command = format!("{} analytics off", self.brew_path().display());
        self.shell.run(&command).await;
    }
}

#[async_trait]
impl Step for Homebrew {
    fn name(&self) -> &str {
        "Homebrew"
    }

    async fn probe(&self) -> bool {
        self.brew_installed()
    }

    async fn apply(&self) -> StepResult {
        info!("installing homebrew");
        self.install_homebrew().await?;
        self.configure_shell().await?;
        self.disable_analytics().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeShell;

    struct Fixture {
        shell: Arc<FakeShell>,
        step: Homebrew,
        _dir: tempfile::TempDir,
        arm_path: PathBuf,
        zprofile: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(FakeShell::new());
        let intel_path = dir.path().join("usr-local-brew");
        let arm_path = dir.path().join("opt-homebrew-brew");
        let zprofile = dir.path().join(".zprofile");
        let step = Homebrew::with_paths(
            shell.clone(),
            intel_path,
            arm_path.clone(),
            zprofile.clone(),
        );
        Fixture {
            shell,
            step,
            _dir: dir,
            arm_path,
            zprofile,
        }
    }

    #[tokio::test]
    async fn probe_false_when_no_brew_binary() {
        let f = fixture();
        assert!(!f.step.probe().await);
    }

    #[tokio::test]
    async fn probe_true_when_arm_binary_exists() {
        let f = fixture();
        std::fs::write(&f.arm_path, "").unwrap();
        assert!(f.step.probe().await);
    }

    #[tokio::test]
    async fn apply_fails_when_installer_fails() {
        let f = fixture();
        let command = format!("/bin/bash -c \"$(curl -fsSL {INSTALL_SCRIPT})\"");
        f.shell.respond_err(&command, "interrupted");

        let err = f.step.apply().await.unwrap_err();

        assert!(matches!(err, StepError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn apply_appends_shellenv_once_and_disables_analytics() {
        let f = fixture();
        std::fs::write(&f.arm_path, "").unwrap();

        f.step.apply().await.unwrap();
        f.step.apply().await.unwrap();

        let content = std::fs::read_to_string(&f.zprofile).unwrap();
        let line = format!("eval \"$({} shellenv)\"", f.arm_path.display());
        assert_eq!(content.matches(&line).count(), 1, "shellenv appended once");
        assert!(f.shell.ran("analytics off"));
    }
}
