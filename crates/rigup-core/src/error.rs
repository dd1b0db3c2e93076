//! Error taxonomy for steps and the vault provisioning protocol.

/// Errors produced by the vault provisioning protocol.
///
/// Both variants are fatal to the step that opened the session and carry the
/// external command's stderr verbatim for operator diagnosis.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("failed to look up vault item '{item}': {stderr}")]
    ItemLookup { item: String, stderr: String },

    #[error("failed to download attachment '{name}': {stderr}")]
    Attachment { name: String, stderr: String },
}

/// Errors escalated out of a step's `apply`.
///
/// The engine records any of these as a failed outcome and continues with
/// the next step; nothing here aborts the overall run.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("timed out after {waited_secs}s waiting for {what}")]
    Timeout { what: String, waited_secs: u64 },

    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// Build a `CommandFailed` from a command string and its output.
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

/// Result type for step mutations.
pub type StepResult = std::result::Result<(), StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_display_names_the_command() {
        let err = StepError::command_failed("brew install mise", "no network");
        let msg = err.to_string();
        assert!(msg.contains("brew install mise"));
        assert!(msg.contains("no network"));
    }

    #[test]
    fn vault_errors_carry_stderr_verbatim() {
        let err = StepError::from(VaultError::ItemLookup {
            item: "SSH Key".to_string(),
            stderr: "Not found.".to_string(),
        });
        assert!(err.to_string().contains("SSH Key"));
        assert!(err.to_string().contains("Not found."));
    }

    #[test]
    fn timeout_display_includes_duration() {
        let err = StepError::Timeout {
            what: "command line tools".to_string(),
            waited_secs: 600,
        };
        assert!(err.to_string().contains("600"));
        assert!(err.to_string().contains("command line tools"));
    }
}
