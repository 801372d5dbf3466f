use std::{
    collections::HashMap,
    env,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Guards environment-variable fixtures so tests touching the process
/// environment cannot interleave. Redefined variables are restored when the
/// guard drops.
pub(crate) struct EnvMutex(Mutex<()>);

impl EnvMutex {
    pub const fn new() -> Self {
        Self(Mutex::new(()))
    }

    pub fn lock(&self) -> EnvMutexGuard<'_> {
        let inner = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        EnvMutexGuard {
            _inner: inner,
            redefined_vars: HashMap::new(),
        }
    }
}

pub(crate) struct EnvMutexGuard<'a> {
    _inner: MutexGuard<'a, ()>,
    redefined_vars: HashMap<String, Option<String>>,
}

impl EnvMutexGuard<'_> {
    /// Sets environment variables from a `NAME=VALUE`-per-line fixture.
    /// Values may be double-quoted.
    pub fn set_env(&mut self, fixture: &str) {
        for line in fixture.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (name, value) = line
                .split_once('=')
                .unwrap_or_else(|| panic!("malformed fixture line: {line}"));
            let value = value.trim_matches('"');
            self.redefined_vars
                .entry(name.to_owned())
                .or_insert_with(|| env::var(name).ok());
            env::set_var(name, value);
        }
    }
}

impl Drop for EnvMutexGuard<'_> {
    fn drop(&mut self) {
        for (name, value) in self.redefined_vars.drain() {
            match value {
                Some(value) => env::set_var(&name, value),
                None => env::remove_var(&name),
            }
        }
    }
}
