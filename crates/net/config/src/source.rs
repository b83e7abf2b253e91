use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use figment::providers::Env;

/// A flat, string-keyed configuration source.
pub trait ConfigSource {
    /// Raw value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;
}

impl<S: BuildHasher> ConfigSource for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// A snapshot of the process environment, read through figment's [`Env`]
/// provider.
///
/// Values stay raw strings; coercion is left to [`crate::parse::ConfigReader`].
/// Lookups ignore key case, as figment does.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv {
    vars: HashMap<String, String>,
}

impl ProcessEnv {
    /// Snapshot every variable.
    pub fn load() -> Self {
        Self::from_provider(Env::raw())
    }

    /// Snapshot the variables `env` selects.
    pub fn from_provider(env: Env) -> Self {
        let vars = env
            .iter()
            .map(|(key, value)| (key.as_str().to_ascii_uppercase(), value))
            .collect();
        Self { vars }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(&key.to_ascii_uppercase()).cloned()
    }
}
