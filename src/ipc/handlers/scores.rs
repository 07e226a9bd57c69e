use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_f64, param_str, require_db};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn resolve_pair<'a>(
    conn: &Connection,
    req: &'a Request,
) -> Result<(&'a str, &'a str), HandlerErr> {
    let Some(student_id) = param_str(req, "studentId") else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "missing studentId".to_string(),
            details: None,
        });
    };
    let Some(assignment_id) = param_str(req, "assignmentId") else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "missing assignmentId".to_string(),
            details: None,
        });
    };

    let query_failed = |e: crate::error::GradeError| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    };
    if !db::student_exists(conn, student_id).map_err(query_failed)? {
        return Err(HandlerErr {
            code: "not_found",
            message: "student not found".to_string(),
            details: Some(json!({ "studentId": student_id })),
        });
    }
    if !db::assignment_exists(conn, assignment_id).map_err(query_failed)? {
        return Err(HandlerErr {
            code: "not_found",
            message: "assignment not found".to_string(),
            details: Some(json!({ "assignmentId": assignment_id })),
        });
    }
    Ok((student_id, assignment_id))
}

fn handle_scores_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (student_id, assignment_id) = match resolve_pair(conn, req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(value) = param_f64(req, "value") else {
        return err(&req.id, "bad_params", "value must be a finite number", None);
    };
    if value < 0.0 {
        return err(
            &req.id,
            "bad_params",
            "negative marks are not allowed",
            Some(json!({ "value": value })),
        );
    }

    match db::score_set(conn, student_id, assignment_id, value) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "scores" })),
        ),
    }
}

fn handle_scores_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (student_id, assignment_id) = match resolve_pair(conn, req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match db::score_clear(conn, student_id, assignment_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scores.set" => Some(handle_scores_set(state, req)),
        "scores.clear" => Some(handle_scores_clear(state, req)),
        _ => None,
    }
}
