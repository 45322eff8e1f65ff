//! Test doubles for the collaborator traits

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sc_core::backend::template_checksum;
use sc_core::error::{RenderError, SupervisorError, TransportError};
use sc_core::traits::{CatalogFetch, ConfigRenderer, Supervisor, Transport};
use sc_core::{BackendDefinition, BackendId, ChangeToken, StatusCell};
use sc_protocol::{RegistrationRequest, RegistrationResponse};

/// A definition with a template derived from its name
pub fn definition(id: &str, name: &str) -> BackendDefinition {
    let template = format!("# {}\n", name);
    BackendDefinition {
        id: BackendId::new(id),
        name: name.to_string(),
        service_type: "exec".to_string(),
        operating_system: "linux".to_string(),
        executable_path: PathBuf::from(format!("/usr/bin/{}", name)),
        execute_parameters: vec!["-c".to_string(), "%s".to_string()],
        validation_parameters: vec![],
        checksum: template_checksum(&template),
        template,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorCall {
    Add(String),
    Delete(String),
    Restart(String),
    StopAll,
}

/// Supervisor that records calls and can be told to fail restarts
#[derive(Default)]
pub struct RecordingSupervisor {
    calls: Mutex<Vec<SupervisorCall>>,
    failing: Mutex<HashSet<String>>,
    rejected: Mutex<HashSet<PathBuf>>,
}

impl RecordingSupervisor {
    pub fn calls(&self) -> Vec<SupervisorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn restarts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SupervisorCall::Restart(_)))
            .count()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SupervisorCall::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn fail_restart(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }

    pub fn reject_executable(&self, executable: &str) {
        self.rejected.lock().unwrap().insert(PathBuf::from(executable));
    }
}

#[async_trait]
impl Supervisor for RecordingSupervisor {
    async fn add_backend(&self, definition: Arc<BackendDefinition>, _status: Arc<StatusCell>) {
        self.calls
            .lock()
            .unwrap()
            .push(SupervisorCall::Add(definition.name.clone()));
    }

    fn check_backend(&self, definition: &BackendDefinition) -> Result<(), SupervisorError> {
        if self.rejected.lock().unwrap().contains(&definition.executable_path) {
            return Err(SupervisorError::NotWhitelisted(definition.executable_path.clone()));
        }
        Ok(())
    }

    async fn delete_backend(&self, name: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(SupervisorCall::Delete(name.to_string()));
    }

    async fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        self.calls
            .lock()
            .unwrap()
            .push(SupervisorCall::Restart(name.to_string()));
        if self.failing.lock().unwrap().contains(name) {
            return Err(SupervisorError::Spawn {
                name: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "exec format error"),
            });
        }
        Ok(())
    }

    async fn stop_all(&self) {
        self.calls.lock().unwrap().push(SupervisorCall::StopAll);
    }
}

/// Renderer that tracks written checksums in memory
pub struct MemoryRenderer {
    written: Mutex<std::collections::HashMap<String, String>>,
    renders: Mutex<Vec<String>>,
    valid: Mutex<bool>,
    writable: Mutex<bool>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Default::default()),
            renders: Mutex::new(Vec::new()),
            valid: Mutex::new(true),
            writable: Mutex::new(true),
        }
    }

    pub fn renders(&self) -> Vec<String> {
        self.renders.lock().unwrap().clone()
    }

    pub fn set_valid(&self, valid: bool) {
        *self.valid.lock().unwrap() = valid;
    }

    pub fn set_writable(&self, writable: bool) {
        *self.writable.lock().unwrap() = writable;
    }
}

#[async_trait]
impl ConfigRenderer for MemoryRenderer {
    async fn render_on_change(&self, definition: &BackendDefinition) -> Result<bool, RenderError> {
        self.renders.lock().unwrap().push(definition.name.clone());
        if !*self.writable.lock().unwrap() {
            return Err(RenderError::Write {
                path: PathBuf::from(format!("{}.conf", definition.name)),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        let previous = self
            .written
            .lock()
            .unwrap()
            .insert(definition.name.clone(), definition.checksum.clone());
        Ok(previous.as_deref() != Some(definition.checksum.as_str()))
    }

    async fn validate_configuration_file(
        &self,
        _definition: &BackendDefinition,
    ) -> Result<bool, RenderError> {
        Ok(*self.valid.lock().unwrap())
    }
}

/// Transport answering from pre-loaded queues
#[derive(Default)]
pub struct ScriptedTransport {
    registrations: Mutex<VecDeque<Result<RegistrationResponse, TransportError>>>,
    catalogs: Mutex<VecDeque<Result<CatalogFetch, TransportError>>>,
    sent: Mutex<Vec<RegistrationRequest>>,
    tokens: Mutex<Vec<ChangeToken>>,
}

impl ScriptedTransport {
    pub fn push_registration(&self, response: Result<RegistrationResponse, TransportError>) {
        self.registrations.lock().unwrap().push_back(response);
    }

    pub fn push_catalog(&self, response: Result<CatalogFetch, TransportError>) {
        self.catalogs.lock().unwrap().push_back(response);
    }

    pub fn sent(&self) -> Vec<RegistrationRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<ChangeToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn report_status(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        self.registrations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("connection refused".to_string())))
    }

    async fn fetch_catalog(&self, last_token: &ChangeToken) -> Result<CatalogFetch, TransportError> {
        self.tokens.lock().unwrap().push(last_token.clone());
        self.catalogs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("connection refused".to_string())))
    }
}
