use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

use startup_odds::app_dirs::HOME_ENV_VAR;
use startup_odds::config::{BIND_ENV_VAR, MODEL_ENV_VAR};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const MANAGED_VARS: [&str; 3] = [HOME_ENV_VAR, BIND_ENV_VAR, MODEL_ENV_VAR];

/// Points the app root at a temp dir and clears the other overrides.
///
/// Restores the previous values on drop.
pub struct AppEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl AppEnvGuard {
    pub fn set_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = MANAGED_VARS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var(HOME_ENV_VAR, path);
            std::env::remove_var(BIND_ENV_VAR);
            std::env::remove_var(MODEL_ENV_VAR);
        }
        Self {
            previous,
            _lock: lock,
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        // SAFETY: the guard holds the global env lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

impl Drop for AppEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
