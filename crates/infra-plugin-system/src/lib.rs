// # System plugins
//
// Machine-level provisioning units:
// - **Hostname**: stateful, converges the machine's hostname
// - **InstallHomebrew**: stateless, bootstraps the Homebrew package
//   manager itself
// - **InstallRye**: stateless, installs the Rye Python toolchain
//   manager

pub mod hostname;
pub mod installers;

pub use hostname::Hostname;
pub use installers::{InstallHomebrew, InstallRye};
