use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_graderd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn graderd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn entry(histogram: &serde_json::Value, percent: usize) -> &serde_json::Value {
    &histogram["entries"][percent]
}

#[test]
fn curve_edit_discard_and_commit_roundtrip() {
    let workspace = tempfile::tempdir().expect("temp dir");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "scheme.set",
        json!({ "ranges": [
            { "letter": "F", "lowerBound": 0 },
            { "letter": "C", "lowerBound": 60 },
            { "letter": "A", "lowerBound": 80 }
        ]}),
    );
    let category_id = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "categories.create",
        json!({ "name": "Final", "weight": 1 }),
    )["categoryId"]
        .as_str()
        .expect("categoryId")
        .to_string();
    let assignment_id = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "categoryId": category_id, "title": "Exam", "outOf": 1000 }),
    )["assignment"]["id"]
        .as_str()
        .expect("assignment id")
        .to_string();

    for (i, raw) in [592.0, 600.0, 999.0].iter().enumerate() {
        let student_id = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "name": format!("Student {}", i) }),
        )["student"]["id"]
            .as_str()
            .expect("student id")
            .to_string();
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("v{}", i),
            "scores.set",
            json!({ "studentId": student_id, "assignmentId": assignment_id, "value": raw }),
        );
    }

    let histogram = request_ok(&mut stdin, &mut reader, "5", "curve.histogram", json!({}));
    assert_eq!(histogram["students"].as_u64(), Some(3));
    assert_eq!(histogram["entries"].as_array().map(|a| a.len()), Some(101));
    assert_eq!(entry(&histogram, 60)["count"].as_u64(), Some(2));
    assert_eq!(entry(&histogram, 100)["count"].as_u64(), Some(1));
    assert!(entry(&histogram, 60)["label"]
        .as_str()
        .expect("label")
        .contains('C'));
    assert_eq!(entry(&histogram, 61)["label"].as_str(), Some(""));

    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "curve.adjust",
        json!({ "letter": "C", "lowerBound": 55 }),
    );
    let rejected = request(
        &mut stdin,
        &mut reader,
        "7",
        "curve.adjust",
        json!({ "letter": "F", "lowerBound": 56 }),
    );
    assert_eq!(error_code(&rejected), Some("invalid_boundary"));
    let unknown = request(
        &mut stdin,
        &mut reader,
        "8",
        "curve.adjust",
        json!({ "letter": "B", "lowerBound": 70 }),
    );
    assert_eq!(error_code(&unknown), Some("unknown_grade"));

    let blocked = request(
        &mut stdin,
        &mut reader,
        "9",
        "scheme.set",
        json!({ "ranges": [{ "letter": "P", "lowerBound": 0 }] }),
    );
    assert_eq!(error_code(&blocked), Some("edit_in_progress"));

    let st = request_ok(&mut stdin, &mut reader, "10", "curve.state", json!({}));
    assert_eq!(st["state"].as_str(), Some("editing"));
    assert_eq!(st["working"][1]["lowerBound"].as_f64(), Some(55.0));
    assert_eq!(st["committed"][1]["lowerBound"].as_f64(), Some(60.0));

    request_ok(&mut stdin, &mut reader, "11", "curve.discard", json!({}));
    let scheme = request_ok(&mut stdin, &mut reader, "12", "scheme.get", json!({}));
    assert_eq!(scheme["ranges"][1]["lowerBound"].as_f64(), Some(60.0));
    assert_eq!(scheme["ranges"][0]["upperBound"].as_f64(), Some(60.0));

    request_ok(&mut stdin, &mut reader, "13", "curve.begin", json!({}));
    request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "curve.adjust",
        json!({ "letter": "C", "lowerBound": 55 }),
    );
    let committed = request_ok(&mut stdin, &mut reader, "15", "curve.commit", json!({}));
    assert_eq!(committed["committed"][1]["lowerBound"].as_f64(), Some(55.0));

    let histogram = request_ok(&mut stdin, &mut reader, "16", "curve.histogram", json!({}));
    assert!(entry(&histogram, 55)["label"]
        .as_str()
        .expect("label")
        .starts_with('C'));
    assert_eq!(entry(&histogram, 60)["label"].as_str(), Some(""));
    assert_eq!(entry(&histogram, 0)["label"].as_str(), Some("F -------"));

    let st = request_ok(&mut stdin, &mut reader, "17", "curve.state", json!({}));
    assert_eq!(st["state"].as_str(), Some("idle"));
    assert!(st["working"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn histogram_surfaces_missing_scores() {
    let workspace = tempfile::tempdir().expect("temp dir");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let category_id = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "categories.create",
        json!({ "name": "Homework" }),
    )["categoryId"]
        .as_str()
        .expect("categoryId")
        .to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.create",
        json!({ "categoryId": category_id, "title": "HW1", "outOf": 10 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "name": "No Marks" }),
    );

    let resp = request(&mut stdin, &mut reader, "5", "curve.histogram", json!({}));
    assert_eq!(error_code(&resp), Some("missing_score"));

    drop(stdin);
    let _ = child.wait();
}
