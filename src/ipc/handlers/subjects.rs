use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, session};
use crate::ipc::types::{AppState, Request};
use crate::models::MAX_SUBJECTS_PER_STUDENT;
use crate::service::StudentService;
use serde_json::json;

fn handle_enroll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let svc = StudentService::new(store, &state.hasher);
    match svc.enroll_subject(&session, name, &mut state.rng) {
        Ok((student, subject)) => ok(
            &req.id,
            json!({
                "subject": subject,
                "count": student.subjects.len(),
                "max": MAX_SUBJECTS_PER_STUDENT,
            }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match StudentService::new(store, &state.hasher).remove_subject(&session, subject_id) {
        Ok(student) => ok(
            &req.id,
            json!({
                "removedSubjectId": subject_id,
                "count": student.subjects.len(),
                "max": MAX_SUBJECTS_PER_STUDENT,
            }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.enroll" => Some(handle_enroll(state, req)),
        "subjects.remove" => Some(handle_remove(state, req)),
        _ => None,
    }
}
