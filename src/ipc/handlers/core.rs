use crate::config::{parse_corrupt_policy, WorkspaceConfig};
use crate::credentials::BcryptHasher;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::RecordStore;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "config": state.workspace.as_ref().map(|_| &state.config),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = std::fs::create_dir_all(&path) {
        return err(&req.id, "storage_error", e.to_string(), None);
    }
    let mut config = match WorkspaceConfig::load(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "bad_config", format!("{e:#}"), None),
    };
    if let Some(raw) = req.params.get("onCorrupt").and_then(|v| v.as_str()) {
        match parse_corrupt_policy(raw) {
            Some(policy) => config.on_corrupt = policy,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "onCorrupt must be \"reset\" or \"fail\"",
                    None,
                )
            }
        }
    }

    let data_path = config.data_path(&path);
    match RecordStore::open(&data_path, config.on_corrupt) {
        Ok(store) => {
            state.hasher = BcryptHasher::new(config.bcrypt_cost);
            info!(
                workspace = %path.display(),
                on_corrupt = ?config.on_corrupt,
                bcrypt_cost = state.hasher.cost(),
                "workspace selected"
            );
            state.workspace = Some(path.clone());
            state.config = config;
            state.store = Some(store);
            // Sessions belong to the previous store.
            state.sessions.clear();
            state.login_failures.clear();
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "dataFile": data_path.to_string_lossy(),
                }),
            )
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
