//! Machine hostname via scutil.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{StepError, StepResult};
use crate::settings::Settings;
use crate::shell::Shell;
use crate::step::Step;

pub struct Hostname {
    shell: Arc<dyn Shell>,
    desired: Option<String>,
}

impl Hostname {
    pub fn new(shell: Arc<dyn Shell>, settings: &Settings) -> Self {
        Self {
            shell,
            desired: settings.get_str("mac.hostname").map(str::to_string),
        }
    }

    async fn current_hostname(&self) -> Option<String> {
        let result = self.shell.run("scutil --get ComputerName").await;
        result.success.then(|| result.trimmed().to_string())
    }
}

#[async_trait]
impl Step for Hostname {
    fn name(&self) -> &str {
        "Hostname"
    }

    async fn probe(&self) -> bool {
        match self.desired.as_deref() {
            Some(desired) => self.current_hostname().await.as_deref() == Some(desired),
            None => false,
        }
    }

    async fn apply(&self) -> StepResult {
        let desired = self
            .desired
            .as_deref()
            .ok_or_else(|| StepError::MissingSetting("mac.hostname".to_string()))?;

        for scope in ["ComputerName", "HostName", "LocalHostName"] {
            let command = format!("sudo scutil --set {scope} {desired}");
            self.shell.run(&command).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeShell;

    fn step_with(shell: Arc<FakeShell>, hostname: Option<&str>) -> Hostname {
        let settings = match hostname {
            Some(h) => Settings::from_yaml(&format!("mac:\n  hostname: {h}\n")).unwrap(),
            None => Settings::empty(),
        };
        Hostname::new(shell, &settings)
    }

    #[tokio::test]
    async fn probe_true_when_hostname_matches() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_ok("scutil --get ComputerName", "workbench\n");

        let step = step_with(shell, Some("workbench"));
        assert!(step.probe().await);
    }

    #[tokio::test]
    async fn probe_false_when_hostname_differs_or_query_fails() {
        let shell = Arc::new(FakeShell::new());
        shell.respond_ok("scutil --get ComputerName", "other");
        assert!(!step_with(shell.clone(), Some("workbench")).probe().await);

        shell.respond_err("scutil --get ComputerName", "denied");
        assert!(!step_with(shell, Some("workbench")).probe().await);
    }

    #[tokio::test]
    async fn apply_sets_all_three_hostname_scopes() {
        let shell = Arc::new(FakeShell::new());
        let step = step_with(shell.clone(), Some("workbench"));

        step.apply().await.unwrap();

        assert!(shell.ran("sudo scutil --set ComputerName workbench"));
        assert!(shell.ran("sudo scutil --set HostName workbench"));
        assert!(shell.ran("sudo scutil --set LocalHostName workbench"));
    }

    #[tokio::test]
    async fn apply_requires_the_hostname_setting() {
        let shell = Arc::new(FakeShell::new());
        let step = step_with(shell, None);

        let err = step.apply().await.unwrap_err();

        assert!(matches!(err, StepError::MissingSetting(_)));
    }
}
