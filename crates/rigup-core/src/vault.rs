//! Credential provisioning against a Bitwarden-compatible vault CLI.
//!
//! The one multi-stage external protocol in the system: check status, log in
//! when unauthenticated, unlock for a session token, resolve a named item to
//! its id, then download attachments one by one. Every secret-bearing step
//! opens its own session; tokens are never persisted or shared across steps.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::VaultError;
use crate::shell::Shell;

/// Authentication state of the vault CLI, re-derived on every session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    Unauthenticated,
    Locked,
    Unlocked,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: String,
}

#[derive(Deserialize)]
struct ItemPayload {
    id: String,
}

/// Query `bw status` and parse the reported state.
///
/// Malformed or absent output maps to `Unauthenticated`: asking the user to
/// log in again beats silently skipping provisioning.
pub async fn query_status(shell: &dyn Shell) -> VaultStatus {
    let result = shell.run("bw status").await;
    let parsed: Option<StatusPayload> = serde_json::from_str(result.trimmed()).ok();

    match parsed.as_ref().map(|p| p.status.as_str()) {
        Some("unlocked") => VaultStatus::Unlocked,
        Some("locked") => VaultStatus::Locked,
        Some(_) | None => VaultStatus::Unauthenticated,
    }
}

/// An unlocked vault session, scoped to one step's `apply`.
pub struct VaultSession<'a> {
    shell: &'a dyn Shell,
    token: String,
}

impl<'a> VaultSession<'a> {
    /// Authenticate (when needed) and unlock the vault.
    ///
    /// When the CLI reports `unauthenticated`, hands the terminal to
    /// `bw login` first. The login result is deliberately not inspected;
    /// control proceeds to unlock either way and a failed login surfaces as
    /// failures of the session's later commands. The unlock prompt goes to
    /// the terminal while its stdout (the raw token) is captured. A blank
    /// token is passed through untouched for the same reason.
    pub async fn open(shell: &'a dyn Shell) -> VaultSession<'a> {
        if query_status(shell).await == VaultStatus::Unauthenticated {
            info!("vault unauthenticated; starting interactive login");
            shell.run_interactive("bw login").await;
        }

        info!("unlocking vault");
        let unlock = shell.run_interactive_capturing("bw unlock --raw").await;
        let token = unlock.trimmed().to_string();
        if token.is_empty() {
            warn!("vault unlock produced no session token");
        }

        VaultSession { shell, token }
    }

    /// Session constructor for tests that need a fixed token.
    pub fn with_token(shell: &'a dyn Shell, token: impl Into<String>) -> VaultSession<'a> {
        VaultSession {
            shell,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Resolve a named vault item to its id.
    pub async fn item_id(&self, item_name: &str) -> Result<String, VaultError> {
        let command = format!("bw get item '{}' --session '{}'", item_name, self.token);
        let result = self.shell.run(&command).await;
        if !result.success {
            return Err(VaultError::ItemLookup {
                item: item_name.to_string(),
                stderr: result.stderr,
            });
        }

        let item: ItemPayload =
            serde_json::from_str(result.trimmed()).map_err(|e| VaultError::ItemLookup {
                item: item_name.to_string(),
                stderr: e.to_string(),
            })?;
        Ok(item.id)
    }

    /// Download one attachment of an item to a destination path.
    pub async fn download_attachment(
        &self,
        item_id: &str,
        attachment: &str,
        destination: &Path,
    ) -> Result<(), VaultError> {
        let command = format!(
            "bw get attachment '{}' --itemid '{}' --session '{}' --output '{}'",
            attachment,
            item_id,
            self.token,
            destination.display()
        );
        let result = self.shell.run(&command).await;
        if !result.success {
            return Err(VaultError::Attachment {
                name: attachment.to_string(),
                stderr: result.stderr,
            });
        }
        Ok(())
    }

    /// Resolve an item and download each named attachment to its destination.
    ///
    /// Destinations that already exist are left alone. A lookup failure
    /// prevents any download; the first download failure aborts the rest.
    pub async fn fetch_attachments(
        &self,
        item_name: &str,
        attachments: &[(&str, &Path)],
    ) -> Result<(), VaultError> {
        if attachments.iter().all(|(_, dest)| dest.exists()) {
            debug!(item = item_name, "all attachments already on disk");
            return Ok(());
        }

        let item_id = self.item_id(item_name).await?;

        for (attachment, destination) in attachments {
            if destination.exists() {
                debug!(attachment, "destination exists; not re-fetching");
                continue;
            }
            self.download_attachment(&item_id, attachment, destination)
                .await?;
        }
        Ok(())
    }
}

/// Narrow a private key to owner read/write and relax its public counterpart
/// to world-readable. Paths that do not exist are left alone.
#[cfg(unix)]
pub fn enforce_key_permissions(private: &Path, public: &Path) -> std::io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    if private.exists() {
        std::fs::set_permissions(private, Permissions::from_mode(0o600))?;
    }
    if public.exists() {
        std::fs::set_permissions(public, Permissions::from_mode(0o644))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn enforce_key_permissions(_private: &Path, _public: &Path) -> std::io::Result<()> {
    Ok(())
}
