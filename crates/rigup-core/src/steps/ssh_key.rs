//! SSH key pair provisioning from the vault.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StepError, StepResult};
use crate::settings::Settings;
use crate::shell::Shell;
use crate::step::Step;
use crate::vault::{enforce_key_permissions, VaultSession};

pub struct SshKey {
    shell: Arc<dyn Shell>,
    ssh_dir: PathBuf,
    key_name: String,
    item_name: Option<String>,
}

impl SshKey {
    pub fn new(shell: Arc<dyn Shell>, settings: &Settings, home: &Path) -> Self {
        Self {
            shell,
            ssh_dir: home.join(".ssh"),
            key_name: settings.str_or("ssh.key_name", "id_ed25519"),
            item_name: settings.get_str("bitwarden.ssh_item").map(str::to_string),
        }
    }

    fn private_key_path(&self) -> PathBuf {
        self.ssh_dir.join(&self.key_name)
    }

    fn public_key_path(&self) -> PathBuf {
        self.ssh_dir.join(format!("{}.pub", self.key_name))
    }

    fn ensure_ssh_directory(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.ssh_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.ssh_dir, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Step for SshKey {
    fn name(&self) -> &str {
        "SSH Key"
    }

    async fn probe(&self) -> bool {
        self.private_key_path().exists()
    }

    async fn apply(&self) -> StepResult {
        let item_name = self
            .item_name
            .as_deref()
            .ok_or_else(|| StepError::MissingSetting("bitwarden.ssh_item".to_string()))?;

        self.ensure_ssh_directory()?;

        info!(item = item_name, "fetching ssh key pair from vault");
        let session = VaultSession::open(self.shell.as_ref()).await;

        let private = self.private_key_path();
        let public = self.public_key_path();
        let public_name = format!("{}.pub", self.key_name);
        session
            .fetch_attachments(
                item_name,
                &[
                    (self.key_name.as_str(), private.as_path()),
                    (public_name.as_str(), public.as_path()),
                ],
            )
            .await?;

        enforce_key_permissions(&private, &public)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeShell;

    const CONFIG: &str = "\
bitwarden:
  server: https://vault.example.com
  ssh_item: SSH Key
ssh:
  key_name: id_ed25519
";

    fn fixture() -> (Arc<FakeShell>, SshKey, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(FakeShell::new());
        let settings = Settings::from_yaml(CONFIG).unwrap();
        let step = SshKey::new(shell.clone(), &settings, dir.path());
        (shell, step, dir)
    }

    #[tokio::test]
    async fn probe_false_when_key_not_present() {
        let (_, step, _dir) = fixture();
        assert!(!step.probe().await);
    }

    #[tokio::test]
    async fn probe_true_when_key_exists() {
        let (_, step, dir) = fixture();
        let ssh_dir = dir.path().join(".ssh");
        std::fs::create_dir_all(&ssh_dir).unwrap();
        std::fs::write(ssh_dir.join("id_ed25519"), "test_key").unwrap();

        assert!(step.probe().await);
    }

    #[tokio::test]
    async fn apply_downloads_both_attachments() {
        let (shell, step, _dir) = fixture();
        shell.respond_ok("bw status", r#"{"status":"unlocked"}"#);
        shell.respond_ok("bw unlock --raw", "session123");
        shell.respond_ok(
            "bw get item 'SSH Key' --session 'session123'",
            r#"{"id":"item-123"}"#,
        );

        step.apply().await.unwrap();

        assert_eq!(shell.count_ran("bw get attachment"), 2);
        assert!(shell.ran("'id_ed25519' --itemid 'item-123' --session 'session123'"));
        assert!(shell.ran("'id_ed25519.pub' --itemid 'item-123' --session 'session123'"));
    }

    #[tokio::test]
    async fn apply_creates_ssh_directory() {
        let (shell, step, dir) = fixture();
        shell.respond_ok("bw status", r#"{"status":"unlocked"}"#);
        shell.respond_ok("bw unlock --raw", "session123");
        shell.respond_ok(
            "bw get item 'SSH Key' --session 'session123'",
            r#"{"id":"item-123"}"#,
        );

        step.apply().await.unwrap();

        assert!(dir.path().join(".ssh").is_dir());
    }

    #[tokio::test]
    async fn apply_fails_when_item_lookup_fails() {
        let (shell, step, _dir) = fixture();
        shell.respond_ok("bw status", r#"{"status":"unlocked"}"#);
        shell.respond_ok("bw unlock --raw", "session123");
        shell.respond_err(
            "bw get item 'SSH Key' --session 'session123'",
            "Not found.",
        );

        let err = step.apply().await.unwrap_err();

        assert!(matches!(err, StepError::Vault(_)));
        assert!(!shell.ran("bw get attachment"));
    }

    #[tokio::test]
    async fn apply_requires_the_item_setting() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(FakeShell::new());
        let step = SshKey::new(shell, &Settings::empty(), dir.path());

        let err = step.apply().await.unwrap_err();

        assert!(matches!(err, StepError::MissingSetting(_)));
    }
}
