//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "MPC_FOLLOWER_ROOT";

/// Get the root directory of the software, as given by the `MPC_FOLLOWER_ROOT` environment
/// variable.
///
/// Parameter files are found in `<root>/params`, and sessions are created under `<root>`.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
