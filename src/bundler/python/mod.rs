//! Interpreter provisioning: pyenv toolchain, virtual environment and pip.

pub mod pip;
pub mod pyenv;
pub mod venv;

pub use pyenv::Toolchain;
pub use venv::VirtualEnv;
