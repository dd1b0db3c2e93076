//! Xcode Command Line Tools installation.
//!
//! `xcode-select --install` hands off to an asynchronous OS installer, so
//! this step polls for the tools directory on a fixed interval up to a
//! bounded maximum wait. It is the only step carrying its own retry logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StepError, StepResult};
use crate::shell::Shell;
use crate::step::Step;

const TOOLS_PATH: &str = "/Library/Developer/CommandLineTools";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_WAIT: Duration = Duration::from_secs(600);

pub struct XcodeClt {
    shell: Arc<dyn Shell>,
    tools_path: PathBuf,
    poll_interval: Duration,
    max_wait: Duration,
}

impl XcodeClt {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self {
            shell,
            tools_path: PathBuf::from(TOOLS_PATH),
            poll_interval: POLL_INTERVAL,
            max_wait: MAX_WAIT,
        }
    }

    /// Override the probed directory and poll timing (tests).
    pub fn with_timing(
        shell: Arc<dyn Shell>,
        tools_path: PathBuf,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            shell,
            tools_path,
            poll_interval,
            max_wait,
        }
    }

    fn tools_present(&self) -> bool {
        self.tools_path.is_dir()
    }

    async fn wait_for_installation(&self) -> StepResult {
        let mut elapsed = Duration::ZERO;
        while !self.tools_present() && elapsed < self.max_wait {
            tokio::time::sleep(self.poll_interval).await;
            elapsed += self.poll_interval;
        }

        if self.tools_present() {
            Ok(())
        } else {
            Err(StepError::Timeout {
                what: "Xcode Command Line Tools installation".to_string(),
                waited_secs: self.max_wait.as_secs(),
            })
        }
    }
}

#[async_trait]
impl Step for XcodeClt {
    fn name(&self) -> &str {
        "Xcode Command Line Tools"
    }

    async fn probe(&self) -> bool {
        self.tools_present()
    }

    async fn apply(&self) -> StepResult {
        info!("requesting command line tools install");
        self.shell.run("xcode-select --install").await;
        self.wait_for_installation().await
    }
}
