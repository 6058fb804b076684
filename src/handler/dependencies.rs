use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BusError, HandlerError};
use crate::registry::HandlerRegistry;

type Value = Arc<dyn Any + Send + Sync>;

/// Named dependencies available to every handler constructor.
///
/// Frozen once the bus is initialized. Values are shared, so handlers get
/// `Arc<T>` handles to the same singletons.
#[derive(Clone, Default)]
pub struct Dependencies {
    values: HashMap<String, Value>,
}

impl Dependencies {
    /// Get a dependency by name, typed.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, HandlerError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| HandlerError::MissingDependency(name.to_string()))?;
        Arc::clone(value)
            .downcast::<T>()
            .map_err(|_| HandlerError::DependencyType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Write-once name -> value map populated during setup.
#[derive(Default)]
pub struct DependencyRegistry {
    values: HashMap<String, Value>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`. Fails if the name is already bound.
    pub fn add<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), BusError> {
        self.add_shared(name, Arc::new(value))
    }

    /// Bind `name` to an already shared value.
    pub fn add_shared<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: Arc<T>,
    ) -> Result<(), BusError> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(BusError::DependencyAlreadyRegistered(name));
        }
        debug!(dependency = %name, "registering dependency");
        let value: Value = value;
        self.values.insert(name, value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Hand the bound values to every handler type in `registry`.
    ///
    /// Checks each handler's declared requirements and freezes the map.
    pub fn broadcast(&self, registry: &HandlerRegistry) -> Result<Arc<Dependencies>, BusError> {
        for handler in registry.handler_types() {
            if let Some(missing) = handler
                .requires()
                .iter()
                .find(|name| !self.values.contains_key(**name))
            {
                return Err(BusError::MissingDependency {
                    handler: handler.name(),
                    dependency: *missing,
                });
            }
            debug!(
                handler = handler.name(),
                requires = ?handler.requires(),
                "dependencies injected"
            );
        }

        Ok(Arc::new(Dependencies {
            values: self.values.clone(),
        }))
    }
}
