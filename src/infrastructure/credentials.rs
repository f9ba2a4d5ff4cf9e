//! Agent credential store backed by a human-editable JSON file
//!
//! The file holds every known platform credential plus an optional
//! `active` pointer. Selection never falls back to an inactive entry,
//! and a missing or corrupt file degrades to an empty store so the
//! client still starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Claimed,
    Inactive,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Claimed => "claimed",
            AgentStatus::Inactive => "inactive",
        }
    }
}

fn default_status() -> AgentStatus {
    AgentStatus::Pending
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCredential {
    pub name: String,
    pub api_key: String,
    #[serde(default = "default_status")]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,
    #[serde(default)]
    agents: Vec<AgentCredential>,
}

/// Name and status of the credential a platform call will run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveIdentity {
    pub name: String,
    pub status: AgentStatus,
}

/// Thread-safe credential store persisted to disk after every mutation.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<CredentialFile>,
}

impl CredentialStore {
    /// Load the store from `path`, degrading to an empty store when the
    /// file is absent or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = read_state(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Secret for the credential the platform call should run as.
    ///
    /// Resolution order: the explicit `identity` when given, then the
    /// `active` pointer, then the first non-inactive entry.
    pub fn active_secret(&self, identity: Option<&str>) -> Option<String> {
        let state = self.lock();
        resolve(&state, identity).map(|credential| credential.api_key.clone())
    }

    /// Identity the store would resolve for a call without an explicit
    /// override.
    pub fn active_identity(&self) -> Option<ActiveIdentity> {
        let state = self.lock();
        resolve(&state, None).map(|credential| ActiveIdentity {
            name: credential.name.clone(),
            status: credential.status,
        })
    }

    pub fn has_agents(&self) -> bool {
        !self.lock().agents.is_empty()
    }

    /// Stamp the resolved credential's `last_active` and persist.
    /// Called by the transport after every successful platform call.
    pub fn touch_last_active(&self, identity: Option<&str>) {
        let mut state = self.lock();
        let name = match resolve(&state, identity) {
            Some(credential) => credential.name.clone(),
            None => return,
        };
        if let Some(credential) = state.agents.iter_mut().find(|agent| agent.name == name) {
            credential.last_active = Some(Utc::now());
        }
        self.persist(&state);
    }

    fn lock(&self) -> MutexGuard<'_, CredentialFile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &CredentialFile) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let serialized = match serde_json::to_string_pretty(state) {
            Ok(serialized) => serialized,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "Failed to serialize credential store");
                return;
            }
        };
        if let Err(error) = fs::write(&self.path, serialized) {
            warn!(path = %self.path.display(), %error, "Failed to persist credential store");
        }
    }
}

fn read_state(path: &Path) -> CredentialFile {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(error) => {
                warn!(path = %path.display(), %error, "Credential file is malformed, starting with an empty store");
                CredentialFile::default()
            }
        },
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Credential file not found, starting with an empty store");
            CredentialFile::default()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "Credential file is unreadable, starting with an empty store");
            CredentialFile::default()
        }
    }
}

fn resolve<'a>(state: &'a CredentialFile, identity: Option<&str>) -> Option<&'a AgentCredential> {
    if let Some(name) = identity {
        return state
            .agents
            .iter()
            .find(|agent| agent.name == name && agent.status != AgentStatus::Inactive);
    }
    if let Some(active) = state.active.as_deref() {
        let found = state
            .agents
            .iter()
            .find(|agent| agent.name == active && agent.status != AgentStatus::Inactive);
        if found.is_some() {
            return found;
        }
    }
    state
        .agents
        .iter()
        .find(|agent| agent.status != AgentStatus::Inactive)
}
