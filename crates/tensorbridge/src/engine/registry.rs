//! Runtime engine registry for selecting a native engine by name.
//!
//! Engine crates register a constructor under one or more names; the bridge's
//! factory entry points resolve the currently selected name on every call.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::TensorEngine;
use crate::config;
use crate::error::{BridgeError, BridgeResult};

/// Factory function that creates a new engine instance.
pub type EngineConstructor = Box<dyn Fn() -> Arc<dyn TensorEngine> + Send + Sync>;

struct EngineRegistry {
    engines: RwLock<HashMap<String, EngineConstructor>>,
    selected: RwLock<Option<String>>,
}

impl EngineRegistry {
    fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
            selected: RwLock::new(None),
        }
    }

    fn register(&self, name: String, constructor: EngineConstructor) {
        let mut engines = self
            .engines
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        engines.insert(name, constructor);
    }

    fn create(&self, name: &str) -> Option<Arc<dyn TensorEngine>> {
        let engines = self
            .engines
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        engines.get(name).map(|constructor| constructor())
    }

    fn list(&self) -> Vec<String> {
        let engines = self
            .engines
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = engines.keys().cloned().collect();
        names.sort();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.engines
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }
}

static GLOBAL_REGISTRY: OnceLock<EngineRegistry> = OnceLock::new();

fn global_registry() -> &'static EngineRegistry {
    GLOBAL_REGISTRY.get_or_init(EngineRegistry::new)
}

/// Register an engine by name. Re-registering a name replaces its constructor.
pub fn register_engine<F>(name: impl Into<String>, constructor: F)
where
    F: Fn() -> Arc<dyn TensorEngine> + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(engine = %name, "registering tensor engine");
    global_registry().register(name, Box::new(constructor));
}

/// Create an engine instance by name.
pub fn create_engine(name: &str) -> Option<Arc<dyn TensorEngine>> {
    global_registry().create(name)
}

/// All registered engine names, sorted.
pub fn list_engines() -> Vec<String> {
    global_registry().list()
}

pub fn has_engine(name: &str) -> bool {
    global_registry().contains(name)
}

/// Make `name` the engine used by subsequent factory calls.
///
/// Existing bridge objects keep the handles they already hold.
pub fn select_engine(name: &str) -> BridgeResult<()> {
    if !has_engine(name) {
        return Err(unknown_engine(name));
    }
    let mut selected = global_registry()
        .selected
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *selected = Some(name.to_string());
    tracing::debug!(engine = name, "selected tensor engine");
    Ok(())
}

/// Name of the engine factory calls will use: the explicit selection if any,
/// otherwise the configured default.
pub fn current_engine_name() -> String {
    global_registry()
        .selected
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
        .unwrap_or_else(|| config::global().engine.clone())
}

/// Instantiate the currently selected engine.
pub fn current_engine() -> BridgeResult<Arc<dyn TensorEngine>> {
    let name = current_engine_name();
    create_engine(&name).ok_or_else(|| unknown_engine(&name))
}

fn unknown_engine(name: &str) -> BridgeError {
    BridgeError::UnknownEngine {
        name: name.to_string(),
        available: list_engines().join(", "),
    }
}
