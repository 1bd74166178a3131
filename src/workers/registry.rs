//! Work-unit registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::executor::WorkUnitExecutor;
use super::http::HttpWorkUnit;

/// Work-unit kinds the compiler accepts on worker nodes.
pub const KNOWN_WORK_UNIT_KINDS: &[&str] = &[
    "text_generation",
    "image_generation",
    "video_generation",
    "speech_generation",
    "webhook",
];

/// Registry of work-unit executors by kind.
pub struct WorkUnitRegistry {
    executors: HashMap<String, Arc<dyn WorkUnitExecutor>>,
}

impl WorkUnitRegistry {
    pub fn new() -> Self {
        WorkUnitRegistry {
            executors: HashMap::new(),
        }
    }

    /// Registry with every known kind handed off over HTTP. Individual
    /// kinds can be re-registered with in-process executors.
    pub fn with_http_defaults() -> Self {
        let mut registry = Self::new();
        let http = Arc::new(HttpWorkUnit::new());
        for kind in KNOWN_WORK_UNIT_KINDS {
            registry.register(kind, http.clone());
        }
        registry
    }

    pub fn register(&mut self, kind: &str, executor: Arc<dyn WorkUnitExecutor>) {
        self.executors.insert(kind.to_string(), executor);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn WorkUnitExecutor>> {
        self.executors.get(kind).cloned()
    }

    pub fn registered_kinds(&self) -> Vec<String> {
        self.executors.keys().cloned().collect()
    }
}

impl Default for WorkUnitRegistry {
    fn default() -> Self {
        Self::with_http_defaults()
    }
}
