use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, store};
use crate::ipc::types::{AppState, Request};
use crate::store::check_store_document;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match backup::export_store_bundle(store.path(), &out_path) {
        Ok(summary) => {
            info!(out = %out_path.display(), students = summary.student_count, "store exported");
            ok(
                &req.id,
                json!({
                    "bundleFormat": summary.bundle_format,
                    "studentCount": summary.student_count,
                    "sha256": summary.sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let data_path = match store(state, req) {
        Ok(s) => s.path().to_path_buf(),
        Err(resp) => return resp,
    };
    let validate = |bytes: &[u8]| check_store_document(bytes).map_err(anyhow::Error::from);
    match backup::import_store_bundle(&in_path, &data_path, validate) {
        Ok(summary) => {
            // Restored records may not contain the logged-in students.
            state.sessions.clear();
            info!(from = %in_path.display(), students = summary.student_count, "store imported");
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "studentCount": summary.student_count,
                }),
            )
        }
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportStore" => Some(handle_export(state, req)),
        "backup.importStore" => Some(handle_import(state, req)),
        _ => None,
    }
}
