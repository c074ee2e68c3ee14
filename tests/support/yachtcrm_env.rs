use std::{
    ffi::OsString,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use yachtcrm::app_dirs::CONFIG_HOME_ENV;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Points `YACHTCRM_CONFIG_HOME` at a temp dir until dropped.
pub struct YachtcrmEnvGuard {
    saved: Option<OsString>,
    _serial: MutexGuard<'static, ()>,
}

impl YachtcrmEnvGuard {
    pub fn set_config_home(path: PathBuf) -> Self {
        let serial = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = std::env::var_os(CONFIG_HOME_ENV);
        // SAFETY: every env write in this test binary holds ENV_LOCK.
        unsafe { std::env::set_var(CONFIG_HOME_ENV, path) };
        Self {
            saved,
            _serial: serial,
        }
    }
}

impl Drop for YachtcrmEnvGuard {
    fn drop(&mut self) {
        // SAFETY: ENV_LOCK is still held through `_serial`.
        unsafe {
            match self.saved.take() {
                Some(value) => std::env::set_var(CONFIG_HOME_ENV, value),
                None => std::env::remove_var(CONFIG_HOME_ENV),
            }
        }
    }
}
