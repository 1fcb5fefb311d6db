//! Path resolution for infragraph's config and state
//!
//! # Environment Variables
//!
//! - `INFRAGRAPH_CONFIG_DIR` - Override config directory
//! - `INFRAGRAPH_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `INFRAGRAPH_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/infragraph` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\infragraph`
//!    - macOS/Linux: `~/.config/infragraph`
//!
//! For state_dir():
//! 1. `INFRAGRAPH_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/infragraph` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\infragraph`
//!    - macOS/Linux: `~/.local/state/infragraph`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "infragraph";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "INFRAGRAPH_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "INFRAGRAPH_STATE_DIR";

/// Get the infragraph config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the infragraph state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path string
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set, restoring the previous value afterwards
    ///
    /// # Safety
    /// Mutates process environment; only safe while no other thread reads it.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Run `f` with `key` unset, restoring the previous value afterwards
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/infragraph/config", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/infragraph/config"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/infragraph-tilde-test", || {
            assert_eq!(
                config_dir().unwrap(),
                home.join("dotfiles").join("infragraph-tilde-test")
            );
        });
    }

    #[test]
    fn test_xdg_config_home() {
        without_env_var(ENV_CONFIG_DIR, || {
            with_env_var("XDG_CONFIG_HOME", "/tmp/xdg-config-test", || {
                assert_eq!(
                    config_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-config-test/infragraph")
                );
            });
        });
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/infragraph/state", || {
            assert_eq!(state_dir().unwrap(), PathBuf::from("/custom/infragraph/state"));
        });
    }

    #[test]
    fn test_xdg_state_home() {
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                assert_eq!(
                    state_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-state-test/infragraph")
                );
            });
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_default_state_dir_unix() {
        without_env_var(ENV_STATE_DIR, || {
            without_env_var("XDG_STATE_HOME", || {
                let home = dirs::home_dir().unwrap();
                assert_eq!(
                    state_dir().unwrap(),
                    home.join(".local").join("state").join("infragraph")
                );
            });
        });
    }

    #[test]
    fn test_expand() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/graphs/prod.json"), home.join("graphs").join("prod.json"));
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(
            expand("/path/$NONEXISTENT_INFRAGRAPH_VAR/file"),
            PathBuf::from("/path/$NONEXISTENT_INFRAGRAPH_VAR/file")
        );
    }
}
