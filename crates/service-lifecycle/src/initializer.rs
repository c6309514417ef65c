//! Late-bound post-start initializers
//!
//! A service's initializer depends on a client that only exists after the
//! service is installed, so initializers are resolved from this registry
//! at the point of use rather than constructed up front.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Error, Result};

/// Performs a service's one-time post-start initialization
#[async_trait]
pub trait Initializer: Send + Sync {
    /// Carry out the declarative bootstrap directives
    async fn initialize(&self, directives: &serde_yaml::Value) -> Result<()>;
}

type InitializerFactory = Box<dyn Fn() -> Box<dyn Initializer> + Send + Sync>;

/// Factory registry keyed by stable initializer ids
#[derive(Default)]
pub struct InitializerRegistry {
    factories: HashMap<String, InitializerFactory>,
}

impl InitializerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for an id, replacing any previous one
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<dyn Initializer> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_string(), Box::new(factory));
    }

    /// Resolve an initializer, constructing it now
    pub fn resolve(&self, id: &str) -> Result<Box<dyn Initializer>> {
        match self.factories.get(id) {
            Some(factory) => Ok(factory()),
            None => Err(Error::UnknownInitializer(id.to_string())),
        }
    }

    /// Registered ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Initializer for Noop {
        async fn initialize(&self, _directives: &serde_yaml::Value) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolves_registered_factories() {
        let mut registry = InitializerRegistry::new();
        registry.register("noop", || Box::new(Noop));
        assert!(registry.resolve("noop").is_ok());
    }

    #[test]
    fn unknown_id_is_an_error() {
        let registry = InitializerRegistry::new();
        let err = registry.resolve("ghost").err().unwrap();
        assert!(matches!(err, Error::UnknownInitializer(id) if id == "ghost"));
    }
}
