use std::collections::HashMap;

/// Read-only view over configuration values.
pub trait ConfigSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Process environment, optionally seeded from a `.env` file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn load_dotenv() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment overrides from {}", path.display());
        }
        ProcessEnv
    }
}

impl ConfigSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}
