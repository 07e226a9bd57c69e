use crate::curve::CurveState;
use crate::db;
use crate::ipc::error::{err, grade_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::scheme::GradeScheme;
use serde_json::json;

fn handle_scheme_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::grade_scheme_load(conn) {
        Ok(scheme) => ok(&req.id, json!({ "ranges": scheme })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn parse_cutoffs(params: &serde_json::Value) -> Result<Vec<(String, f64)>, String> {
    let Some(ranges) = params.get("ranges").and_then(|v| v.as_array()) else {
        return Err("missing ranges array".to_string());
    };
    let mut cutoffs = Vec::with_capacity(ranges.len());
    for (i, r) in ranges.iter().enumerate() {
        let Some(letter) = r.get("letter").and_then(|v| v.as_str()) else {
            return Err(format!("ranges[{}].letter must be a string", i));
        };
        let Some(lower) = r.get("lowerBound").and_then(|v| v.as_f64()) else {
            return Err(format!("ranges[{}].lowerBound must be a number", i));
        };
        cutoffs.push((letter.to_string(), lower));
    }
    Ok(cutoffs)
}

/// Replaces the committed scheme wholesale. Refused while a curve edit is open
/// so the edit cannot silently overwrite it later.
fn handle_scheme_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if state.gradebook.curve().state() == CurveState::Editing {
        return err(
            &req.id,
            "edit_in_progress",
            "commit or discard the open curve edit first",
            None,
        );
    }
    let cutoffs = match parse_cutoffs(&req.params) {
        Ok(v) => v,
        Err(message) => return err(&req.id, "bad_params", message, None),
    };
    let scheme = match GradeScheme::from_cutoffs(cutoffs) {
        Ok(s) => s,
        Err(e) => return grade_err(&req.id, &e),
    };
    if scheme.is_empty() {
        return err(&req.id, "bad_params", "a scheme needs at least one range", None);
    }

    match db::grade_scheme_replace(conn, &scheme) {
        Ok(()) => {
            tracing::info!(ranges = scheme.ranges().len(), "grade scheme replaced");
            ok(&req.id, json!({ "ranges": scheme }))
        }
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scheme.get" => Some(handle_scheme_get(state, req)),
        "scheme.set" => Some(handle_scheme_set(state, req)),
        _ => None,
    }
}
