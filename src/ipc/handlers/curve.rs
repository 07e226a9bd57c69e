use crate::db::{self, Workspace};
use crate::ipc::error::{err, grade_err, ok};
use crate::ipc::helpers::{param_f64, param_str};
use crate::ipc::types::{AppState, Request};
use crate::scheme::{LetterGrade, Percentage};
use serde_json::json;

fn handle_curve_begin(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let committed = match db::grade_scheme_load(conn) {
        Ok(s) => s,
        Err(e) => return grade_err(&req.id, &e),
    };
    let curve = state.gradebook.curve_mut();
    curve.begin_edit(&committed);
    ok(
        &req.id,
        json!({ "state": curve.state(), "working": curve.working() }),
    )
}

fn handle_curve_adjust(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(letter) = param_str(req, "letter").map(LetterGrade::new) else {
        return err(&req.id, "bad_params", "missing letter", None);
    };
    let Some(lower) = param_f64(req, "lowerBound").map(Percentage::new) else {
        return err(&req.id, "bad_params", "lowerBound must be a finite number", None);
    };
    let committed = match db::grade_scheme_load(conn) {
        Ok(s) => s,
        Err(e) => return grade_err(&req.id, &e),
    };
    match state
        .gradebook
        .curve_mut()
        .adjust_boundary(&committed, &letter, lower)
    {
        Ok(working) => ok(&req.id, json!({ "working": working })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_curve_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut store = Workspace::new(conn);
    match state.gradebook.curve_mut().commit(&mut store) {
        Ok(committed) => ok(&req.id, json!({ "committed": committed })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_curve_discard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let curve = state.gradebook.curve_mut();
    curve.discard();
    ok(&req.id, json!({ "state": curve.state() }))
}

fn handle_curve_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let committed = match db::grade_scheme_load(conn) {
        Ok(s) => s,
        Err(e) => return grade_err(&req.id, &e),
    };
    let curve = state.gradebook.curve();
    ok(
        &req.id,
        json!({
            "state": curve.state(),
            "committed": committed,
            "working": curve.working(),
        }),
    )
}

/// Re-bins the class from the workspace, then labels every row against the
/// committed scheme.
fn handle_curve_histogram(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ws = Workspace::new(conn);
    if let Err(e) = state.gradebook.refresh_histogram(&ws) {
        return grade_err(&req.id, &e);
    }
    let committed = match db::grade_scheme_load(conn) {
        Ok(s) => s,
        Err(e) => return grade_err(&req.id, &e),
    };
    let curve = state.gradebook.curve();
    match curve.entries(&committed) {
        Ok(entries) => ok(
            &req.id,
            json!({
                "students": curve.buckets().iter().sum::<usize>(),
                "entries": entries,
            }),
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "curve.begin" => Some(handle_curve_begin(state, req)),
        "curve.adjust" => Some(handle_curve_adjust(state, req)),
        "curve.commit" => Some(handle_curve_commit(state, req)),
        "curve.discard" => Some(handle_curve_discard(state, req)),
        "curve.state" => Some(handle_curve_state(state, req)),
        "curve.histogram" => Some(handle_curve_histogram(state, req)),
        _ => None,
    }
}
