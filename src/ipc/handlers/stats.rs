use crate::db::Workspace;
use crate::ipc::error::{err, grade_err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_stats_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ws = Workspace::new(conn);
    if let Err(e) = state.gradebook.refresh_stats(&ws) {
        return grade_err(&req.id, &e);
    }
    let stats = state.gradebook.stats();
    if let Some(assignment_id) = param_str(req, "assignmentId") {
        return match stats.get(assignment_id) {
            Some(s) => ok(&req.id, json!({ "assignmentId": assignment_id, "stats": s })),
            None => err(
                &req.id,
                "not_found",
                "assignment not found",
                Some(json!({ "assignmentId": assignment_id })),
            ),
        };
    }
    ok(&req.id, json!({ "assignments": stats.rows() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.get" => Some(handle_stats_get(state, req)),
        _ => None,
    }
}
