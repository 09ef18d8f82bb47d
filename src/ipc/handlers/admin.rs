use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, store};
use crate::ipc::types::{AppState, Request};
use crate::models::Student;
use crate::service::AdminService;
use serde_json::json;
use tracing::info;

fn summaries(students: &[Student]) -> Vec<serde_json::Value> {
    students
        .iter()
        .map(|s| json!(s.summary()))
        .collect()
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match AdminService::new(store).list_students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = AdminService::new(store).remove_student(&student_id) {
        return store_err(&req.id, &e);
    }
    state.sessions.retain(|_, s| s.student_id != student_id);
    ok(&req.id, json!({ "removed": student_id }))
}

fn handle_group_by_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match AdminService::new(store).group_by_grade() {
        Ok(groups) => {
            let groups: Vec<serde_json::Value> = groups
                .iter()
                .map(|g| {
                    json!({
                        "grade": g.bucket.label(),
                        "students": summaries(&g.students),
                    })
                })
                .collect();
            ok(&req.id, json!({ "groups": groups }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_partition(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match AdminService::new(store).partition_pass_fail() {
        Ok((pass, fail)) => ok(
            &req.id,
            json!({ "pass": summaries(&pass), "fail": summaries(&fail) }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let confirmed = req
        .params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !confirmed {
        return err(
            &req.id,
            "bad_params",
            "clearing requires confirm: true",
            None,
        );
    }
    let store = match store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = AdminService::new(store).clear_all() {
        return store_err(&req.id, &e);
    }
    state.sessions.clear();
    info!("all student data cleared");
    ok(&req.id, json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.students.list" => Some(handle_list(state, req)),
        "admin.students.remove" => Some(handle_remove(state, req)),
        "admin.groupByGrade" => Some(handle_group_by_grade(state, req)),
        "admin.partitionPassFail" => Some(handle_partition(state, req)),
        "admin.clear" => Some(handle_clear(state, req)),
        _ => None,
    }
}
