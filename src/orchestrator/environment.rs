use crate::service::{container_name, ServiceInstance};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// One isolated set of service containers.
///
/// Every container the environment creates is named `<prefix>_<service>`.
/// The tracked map holds one entry per service whose container exists and is
/// starting, running, or stopping. The lock is only held for short,
/// synchronous sections and never across an `.await`.
#[derive(Debug)]
pub struct Environment {
    prefix: String,
    instances: RwLock<BTreeMap<String, ServiceInstance>>,
}

impl Environment {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            instances: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn container_name(&self, service: &str) -> String {
        container_name(&self.prefix, service)
    }

    /// Track an instance, replacing any previous entry for the same service.
    pub fn register(&self, instance: ServiceInstance) {
        self.instances
            .write()
            .insert(instance.service.clone(), instance);
    }

    /// Apply `f` to the tracked entry in place and return the updated copy.
    pub fn update<F>(&self, service: &str, f: F) -> Option<ServiceInstance>
    where
        F: FnOnce(&mut ServiceInstance),
    {
        let mut instances = self.instances.write();
        let instance = instances.get_mut(service)?;
        f(instance);
        Some(instance.clone())
    }

    pub fn deregister(&self, service: &str) -> Option<ServiceInstance> {
        self.instances.write().remove(service)
    }

    pub fn get(&self, service: &str) -> Option<ServiceInstance> {
        self.instances.read().get(service).cloned()
    }

    pub fn contains(&self, service: &str) -> bool {
        self.instances.read().contains_key(service)
    }

    /// Tracked service names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.instances.read().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ServiceInstance> {
        self.instances.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}
