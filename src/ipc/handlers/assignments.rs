use crate::db;
use crate::ipc::error::{err, grade_err, ok};
use crate::ipc::helpers::{param_f64, param_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_categories_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(name) = param_str(req, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let weight = match req.params.get("weight") {
        None => 1.0,
        Some(_) => match param_f64(req, "weight") {
            Some(w) if w >= 0.0 => w,
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    "weight must be a number >= 0",
                    Some(json!({ "weight": req.params.get("weight") })),
                )
            }
        },
    };
    match db::category_create(conn, name, weight) {
        Ok(category_id) => ok(&req.id, json!({ "categoryId": category_id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(category_id) = param_str(req, "categoryId") else {
        return err(&req.id, "bad_params", "missing categoryId", None);
    };
    let Some(title) = param_str(req, "title") else {
        return err(&req.id, "bad_params", "missing title", None);
    };
    let Some(out_of) = param_f64(req, "outOf").filter(|v| *v > 0.0) else {
        return err(
            &req.id,
            "bad_params",
            "outOf must be a number > 0",
            Some(json!({ "outOf": req.params.get("outOf") })),
        );
    };

    match db::category_exists(conn, category_id) {
        Ok(true) => {}
        Ok(false) => {
            return err(
                &req.id,
                "not_found",
                "category not found",
                Some(json!({ "categoryId": category_id })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    match db::assignment_create(conn, category_id, title, out_of) {
        Ok(assignment) => ok(&req.id, json!({ "assignment": assignment })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match db::assignment_tree(conn) {
        Ok(tree) => ok(&req.id, json!({ "categories": tree })),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.create" => Some(handle_categories_create(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.list" => Some(handle_assignments_list(state, req)),
        _ => None,
    }
}
