//! Shared helpers for integration tests: an in-memory container engine and
//! a small service registry.

#![allow(dead_code)]

use async_trait::async_trait;
use itenv::config::{PortMapping, ProbeCommand, ProbeSpec, ServiceDescriptor, StaticRegistry};
use itenv::docker::{ContainerEngine, ContainerInfo, ContainerSpec, ContainerState, DockerError};
use itenv::{Orchestrator, Settings};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// A container as the fake engine remembers it.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub spec: ContainerSpec,
    pub state: ContainerState,
}

#[derive(Default)]
struct FakeState {
    containers: BTreeMap<String, FakeContainer>,
    next_id: u64,
    calls: Vec<String>,
    missing_images: HashSet<String>,
    fail_create: HashSet<String>,
    exit_on_start: HashSet<String>,
    hang_start: HashSet<String>,
    slow_create: HashMap<String, Duration>,
    never_running: HashSet<String>,
    unhealthy_checks: HashMap<String, u32>,
    fail_stop: HashSet<String>,
    hang_stop: HashSet<String>,
}

/// In-memory [`ContainerEngine`].
///
/// Behaviors are keyed by container name. Containers reach `running` as
/// soon as they are started unless told otherwise.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend `image` is not present locally, so starts must pull it.
    pub fn missing_image(&self, image: &str) {
        self.state.lock().missing_images.insert(image.to_string());
    }

    pub fn fail_create(&self, container_name: &str) {
        self.state.lock().fail_create.insert(container_name.to_string());
    }

    /// The container exits immediately after start.
    pub fn exit_on_start(&self, container_name: &str) {
        self.state.lock().exit_on_start.insert(container_name.to_string());
    }

    /// `create` registers the container at once but only returns after `delay`.
    pub fn slow_create(&self, container_name: &str, delay: Duration) {
        self.state
            .lock()
            .slow_create
            .insert(container_name.to_string(), delay);
    }

    /// `start` never returns for this container.
    pub fn hang_start(&self, container_name: &str) {
        self.state.lock().hang_start.insert(container_name.to_string());
    }

    /// The container stays `created` after start.
    pub fn never_running(&self, container_name: &str) {
        self.state.lock().never_running.insert(container_name.to_string());
    }

    /// The first `count` healthchecks in this container fail.
    pub fn unhealthy_for(&self, container_name: &str, count: u32) {
        self.state
            .lock()
            .unhealthy_checks
            .insert(container_name.to_string(), count);
    }

    pub fn fail_stop(&self, container_name: &str) {
        self.state.lock().fail_stop.insert(container_name.to_string());
    }

    /// `stop` never returns for this container.
    pub fn hang_stop(&self, container_name: &str) {
        self.state.lock().hang_stop.insert(container_name.to_string());
    }

    /// Force a container into `state`, as if it crashed or was stopped outside.
    pub fn set_state(&self, container_name: &str, state: ContainerState) {
        let mut st = self.state.lock();
        if let Some(container) = find(&mut st, container_name) {
            container.state = state;
        }
    }

    /// Simulate a leftover container from an earlier run.
    pub fn seed_container(&self, name: &str, state: ContainerState) -> String {
        let mut st = self.state.lock();
        let id = next_id(&mut st);
        st.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                spec: ContainerSpec {
                    name: name.to_string(),
                    image: "leftover:latest".to_string(),
                    ..Default::default()
                },
                state,
            },
        );
        id
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls of one operation (`"create"`, `"stop"`, ...).
    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.split_whitespace().next() == Some(op))
            .count()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state
            .lock()
            .containers
            .values()
            .find(|c| c.spec.name == name)
            .cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .containers
            .values()
            .map(|c| c.spec.name.clone())
            .collect();
        names.sort();
        names
    }
}

fn next_id(state: &mut FakeState) -> String {
    state.next_id += 1;
    format!("fake{:08x}", state.next_id)
}

fn find<'a>(state: &'a mut FakeState, name_or_id: &str) -> Option<&'a mut FakeContainer> {
    if state.containers.contains_key(name_or_id) {
        return state.containers.get_mut(name_or_id);
    }
    state
        .containers
        .values_mut()
        .find(|c| c.spec.name == name_or_id)
}

fn not_found(object: &str) -> DockerError {
    DockerError::NotFound {
        object: object.to_string(),
    }
}

fn command_failed(command: &str, stderr: &str) -> DockerError {
    DockerError::CommandFailed {
        command: command.to_string(),
        stderr: stderr.to_string(),
        exit_code: Some(1),
    }
}

fn info(container: &FakeContainer) -> ContainerInfo {
    ContainerInfo {
        id: container.id.clone(),
        name: container.spec.name.clone(),
        state: container.state.clone(),
    }
}

fn create(st: &mut FakeState, spec: &ContainerSpec) -> Result<ContainerInfo, DockerError> {
    st.calls.push(format!("create {}", spec.name));

    if st.fail_create.contains(&spec.name) {
        return Err(command_failed("docker create", "simulated create failure"));
    }
    if st.missing_images.contains(&spec.image) {
        return Err(command_failed("docker create", "image not present"));
    }
    if st.containers.values().any(|c| c.spec.name == spec.name) {
        return Err(command_failed(
            "docker create",
            "Conflict. The container name is already in use",
        ));
    }

    let id = next_id(st);
    let container = FakeContainer {
        id: id.clone(),
        spec: spec.clone(),
        state: ContainerState::Created,
    };
    let result = info(&container);
    st.containers.insert(id, container);
    Ok(result)
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn get_container(&self, name_or_id: &str) -> Result<ContainerInfo, DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("get {}", name_or_id));
        find(&mut st, name_or_id)
            .map(|c| info(c))
            .ok_or_else(|| not_found(name_or_id))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerInfo, DockerError> {
        let (result, delay) = {
            let mut st = self.state.lock();
            let result = create(&mut st, spec);
            (result, st.slow_create.get(&spec.name).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn start(&self, id: &str) -> Result<(), DockerError> {
        let hang = {
            let mut st = self.state.lock();
            st.calls.push(format!("start {}", id));
            let hang_start = st.hang_start.clone();
            let exit_on_start = st.exit_on_start.clone();
            let never_running = st.never_running.clone();
            let container = find(&mut st, id).ok_or_else(|| not_found(id))?;
            let name = container.spec.name.clone();
            container.state = if exit_on_start.contains(&name) {
                ContainerState::Exited
            } else if never_running.contains(&name) {
                ContainerState::Created
            } else {
                ContainerState::Running
            };
            hang_start.contains(&name)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop(&self, id: &str, _timeout: Duration) -> Result<(), DockerError> {
        let hang = {
            let mut st = self.state.lock();
            st.calls.push(format!("stop {}", id));
            let fail_stop = st.fail_stop.clone();
            let hang_stop = st.hang_stop.clone();
            let container = find(&mut st, id).ok_or_else(|| not_found(id))?;
            let name = container.spec.name.clone();
            if fail_stop.contains(&name) {
                return Err(command_failed("docker stop", "simulated stop failure"));
            }
            if !hang_stop.contains(&name) {
                container.state = ContainerState::Exited;
            }
            hang_stop.contains(&name)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("remove {}", id));
        let container = find(&mut st, id).ok_or_else(|| not_found(id))?;
        if container.state == ContainerState::Running && !force {
            return Err(command_failed(
                "docker rm",
                "You cannot remove a running container",
            ));
        }
        let key = container.id.clone();
        st.containers.remove(&key);
        Ok(())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInfo, DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("inspect {}", id));
        find(&mut st, id)
            .map(|c| info(c))
            .ok_or_else(|| not_found(id))
    }

    async fn image_exists(&self, image: &str) -> Result<(), DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("image {}", image));
        if st.missing_images.contains(image) {
            Err(not_found(image))
        } else {
            Ok(())
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("pull {}", image));
        st.missing_images.remove(image);
        Ok(())
    }

    async fn exec(&self, id: &str, _cmd: &[String]) -> Result<i32, DockerError> {
        let mut st = self.state.lock();
        st.calls.push(format!("exec {}", id));
        let name = find(&mut st, id)
            .map(|c| c.spec.name.clone())
            .ok_or_else(|| not_found(id))?;
        match st.unhealthy_checks.get_mut(&name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// Descriptor with a healthcheck: `<name>:test` on `port`.
pub fn probed(name: &str, port: u16) -> ServiceDescriptor {
    ServiceDescriptor::new(
        format!("{}:test", name),
        PortMapping::new(port.to_string(), port),
        format!("{}://localhost:{{port}}", name),
    )
    .with_env("USER", "test")
    .with_healthcheck(ProbeSpec::new(
        ProbeCommand::Exec(vec!["true".to_string()]),
        Duration::from_secs(1),
        Duration::from_secs(10),
    ))
}

/// `cache:7` on 6379 with no healthcheck.
pub fn cache() -> ServiceDescriptor {
    ServiceDescriptor::new(
        "cache:7",
        PortMapping::new("6379", 6379),
        "cache://localhost:{port}",
    )
}

/// Registry with `a`, `b`, and `c` (probed) plus `cache`.
pub fn test_registry() -> StaticRegistry {
    let mut registry = StaticRegistry::new();
    registry.insert("a", probed("a", 15001));
    registry.insert("b", probed("b", 15002));
    registry.insert("c", probed("c", 15003));
    registry.insert("cache", cache());
    registry
}

/// Settings with fast polling; everything else default.
pub fn fast_settings() -> Settings {
    Settings {
        prefix: "itest".to_string(),
        poll_interval: Duration::from_millis(100),
        ..Default::default()
    }
}

pub fn orchestrator(engine: Arc<FakeEngine>) -> Orchestrator {
    orchestrator_with(engine, fast_settings())
}

pub fn orchestrator_with(engine: Arc<FakeEngine>, settings: Settings) -> Orchestrator {
    Orchestrator::builder()
        .registry(Arc::new(test_registry()))
        .engine(engine)
        .settings(settings)
        .build()
        .expect("valid settings")
}
