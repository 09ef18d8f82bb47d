use crate::error::StoreError;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, session, store};
use crate::ipc::types::{AppState, Request};
use crate::service::{Session, StudentService};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let first_name = match required_str(req, "firstName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let last_name = match required_str(req, "lastName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let svc = StudentService::new(store, &state.hasher);
    match svc.register(first_name, last_name, email, password, &mut state.rng) {
        Ok(student) => ok(&req.id, json!({ "student": student.summary() })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let key = email.trim().to_lowercase();
    let result = StudentService::new(store, &state.hasher).login(email, password);
    match result {
        Ok(student) => {
            state.login_failures.remove(&key);
            let token = Uuid::new_v4().to_string();
            state.sessions.insert(
                token.clone(),
                Session {
                    student_id: student.student_id.clone(),
                },
            );
            ok(
                &req.id,
                json!({ "sessionToken": token, "student": student.summary() }),
            )
        }
        Err(e @ (StoreError::InvalidCredentials | StoreError::NotFound(_))) => {
            let failures = {
                let count = state.login_failures.entry(key.clone()).or_insert(0);
                *count += 1;
                *count
            };
            if failures >= MAX_LOGIN_ATTEMPTS {
                state.login_failures.remove(&key);
                warn!("too many failed login attempts");
                return err(
                    &req.id,
                    "too_many_attempts",
                    "too many failed attempts",
                    Some(json!({ "maxAttempts": MAX_LOGIN_ATTEMPTS })),
                );
            }
            let remaining = MAX_LOGIN_ATTEMPTS - failures;
            err(
                &req.id,
                e.code(),
                e.to_string(),
                Some(json!({ "attemptsRemaining": remaining })),
            )
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = match required_str(req, "sessionToken") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let removed = state.sessions.remove(token).is_some();
    ok(&req.id, json!({ "loggedOut": removed }))
}

fn handle_enrollment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match StudentService::new(store, &state.hasher).enrollment(&session) {
        Ok(view) => ok(&req.id, json!({ "enrollment": view })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_change_password(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let new_password = match required_str(req, "newPassword") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let confirm_password = match required_str(req, "confirmPassword") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match StudentService::new(store, &state.hasher).change_password(
        &session,
        new_password,
        confirm_password,
    ) {
        Ok(student) => ok(&req.id, json!({ "studentId": student.student_id })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.register" => Some(handle_register(state, req)),
        "students.login" => Some(handle_login(state, req)),
        "students.logout" => Some(handle_logout(state, req)),
        "students.enrollment" => Some(handle_enrollment(state, req)),
        "students.changePassword" => Some(handle_change_password(state, req)),
        _ => None,
    }
}
