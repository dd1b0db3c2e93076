//! Concrete configuration steps, in their default convergence order.

mod bitwarden_cli;
mod control_repo;
mod homebrew;
mod hostname;
mod mise;
mod ssh_key;
mod xcode_clt;

pub use bitwarden_cli::BitwardenCli;
pub use control_repo::ControlRepo;
pub use homebrew::Homebrew;
pub use hostname::Hostname;
pub use mise::Mise;
pub use ssh_key::SshKey;
pub use xcode_clt::XcodeClt;

use std::path::Path;
use std::sync::Arc;

use crate::settings::Settings;
use crate::shell::Shell;
use crate::step::Step;

/// The full step list in its fixed order: toolchain first, then the vault
/// chain (CLI before the steps that need it), the control repo last.
pub fn default_steps(
    shell: Arc<dyn Shell>,
    settings: &Settings,
    home: &Path,
) -> Vec<Box<dyn Step>> {
    vec![
        Box::new(XcodeClt::new(Arc::clone(&shell))),
        Box::new(Homebrew::new(Arc::clone(&shell), home)),
        Box::new(Hostname::new(Arc::clone(&shell), settings)),
        Box::new(Mise::new(Arc::clone(&shell), home)),
        Box::new(BitwardenCli::new(Arc::clone(&shell), settings)),
        Box::new(SshKey::new(Arc::clone(&shell), settings, home)),
        Box::new(ControlRepo::new(shell, settings, home)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeShell;

    #[test]
    fn default_steps_keep_their_fixed_order() {
        let shell: Arc<dyn Shell> = Arc::new(FakeShell::new());
        let settings = Settings::empty();
        let steps = default_steps(shell, &settings, Path::new("/tmp"));

        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "Xcode Command Line Tools",
                "Homebrew",
                "Hostname",
                "Mise",
                "Bitwarden CLI",
                "SSH Key",
                "Control Repo",
            ]
        );
    }
}
