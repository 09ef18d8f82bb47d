use std::collections::HashMap;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use crate::config::WorkspaceConfig;
use crate::credentials::BcryptHasher;
use crate::service::Session;
use crate::store::RecordStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub config: WorkspaceConfig,
    pub store: Option<RecordStore>,
    pub hasher: BcryptHasher,
    /// Logged-in students keyed by session token.
    pub sessions: HashMap<String, Session>,
    /// Consecutive failed logins keyed by normalized email.
    pub login_failures: HashMap<String, u32>,
    pub rng: StdRng,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            config: WorkspaceConfig::default(),
            store: None,
            hasher: BcryptHasher::default(),
            sessions: HashMap::new(),
            login_failures: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }
}
