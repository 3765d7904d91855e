use super::builtin::builtin_services;
use super::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Lookup from service name to descriptor.
///
/// The orchestrator consumes one descriptor at a time and never mutates the
/// registry.
pub trait ServiceRegistry: Send + Sync {
    /// Fails with [`Error::UnsupportedService`] for unknown names.
    fn lookup(&self, name: &str) -> Result<ServiceDescriptor>;

    /// Supported names, in display order.
    fn names(&self) -> Vec<String>;
}

/// In-memory registry keeping names in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    order: Vec<String>,
    services: HashMap<String, ServiceDescriptor>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in service table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, descriptor) in builtin_services() {
            registry.insert(name, descriptor);
        }
        registry
    }

    /// Add or replace a descriptor. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ServiceDescriptor) {
        let name = name.into();
        if self.services.insert(name.clone(), descriptor).is_none() {
            self.order.push(name);
        }
    }

    /// Merge descriptors from config, validating each one first.
    pub fn extend_validated<I>(&mut self, descriptors: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, ServiceDescriptor)>,
    {
        for (name, descriptor) in descriptors {
            descriptor.validate(&name)?;
            self.insert(name, descriptor);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceDescriptor)> {
        self.order
            .iter()
            .filter_map(|name| self.services.get(name).map(|d| (name.as_str(), d)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl ServiceRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Result<ServiceDescriptor> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnsupportedService {
                name: name.to_string(),
                supported: self.order.clone(),
            })
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortMapping;

    #[test]
    fn builtin_registry_lists_services_in_order() {
        let registry = StaticRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec![
                "postgres",
                "mysql",
                "mongodb",
                "redis",
                "rabbitmq",
                "elasticsearch",
                "minio"
            ]
        );
    }

    #[test]
    fn lookup_unknown_service_is_unsupported() {
        let registry = StaticRegistry::builtin();
        match registry.lookup("oracle") {
            Err(Error::UnsupportedService { name, supported }) => {
                assert_eq!(name, "oracle");
                assert!(supported.contains(&"redis".to_string()));
            }
            other => panic!("expected UnsupportedService, got {:?}", other),
        }
    }

    #[test]
    fn lookup_returns_a_copy() {
        let registry = StaticRegistry::builtin();
        let mut redis = registry.lookup("redis").unwrap();
        redis.port.host = 1;
        assert_eq!(registry.lookup("redis").unwrap().port.host, 6379);
    }

    #[test]
    fn replacing_keeps_position_and_adding_appends() {
        let mut registry = StaticRegistry::builtin();
        let custom = ServiceDescriptor::new(
            "redis:6",
            PortMapping::new("6379", 16379),
            "redis://localhost:{port}",
        );
        registry.insert("redis", custom.clone());
        registry.insert(
            "cache",
            ServiceDescriptor::new("cache:7", PortMapping::new("6379", 6379), "cache://{port}"),
        );

        let names = registry.names();
        assert_eq!(names[3], "redis");
        assert_eq!(names.last().map(String::as_str), Some("cache"));
        assert_eq!(registry.get("redis"), Some(&custom));
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn extend_validated_rejects_invalid_descriptor() {
        let mut registry = StaticRegistry::new();
        let bad = ServiceDescriptor::new("img", PortMapping::new("80", 8080), "http://localhost");
        let err = registry
            .extend_validated([("web".to_string(), bad)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor { .. }));
        assert!(registry.is_empty());
    }
}
