//! rigup core library
//!
//! Converges a workstation toward a declared desired state: an ordered list
//! of idempotent steps, each probing whether it is already satisfied and
//! applying a mutation when it is not. Secret-bearing steps provision key
//! material from a Bitwarden-compatible vault CLI.

pub mod engine;
pub mod error;
pub mod fakes;
pub mod settings;
pub mod shell;
pub mod step;
pub mod steps;
pub mod telemetry;
pub mod vault;

pub use engine::{ConsoleReporter, Engine, Reporter, RunReport};
pub use error::{StepError, StepResult, VaultError};
pub use settings::{Settings, SettingsError};
pub use shell::{CommandOutput, Shell, SystemShell};
pub use step::{Step, StepOutcome, StepStatus};
pub use telemetry::init_tracing;
pub use vault::{enforce_key_permissions, query_status, VaultSession, VaultStatus};

/// rigup version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
