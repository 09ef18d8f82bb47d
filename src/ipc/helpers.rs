use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::service::Session;
use crate::store::RecordStore;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

pub fn store<'a>(state: &'a AppState, req: &Request) -> Result<&'a RecordStore, serde_json::Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn session(state: &AppState, req: &Request) -> Result<Session, serde_json::Value> {
    let token = required_str(req, "sessionToken")?;
    state
        .sessions
        .get(token)
        .cloned()
        .ok_or_else(|| err(&req.id, "not_logged_in", "unknown or expired session", None))
}
