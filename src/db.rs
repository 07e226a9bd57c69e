use crate::error::GradeError;
use crate::scheme::GradeScheme;
use crate::source::{
    Assignment, AssignmentTree, Category, DataSource, SchemeStore, ScoreMap, Student,
};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("grader.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            weight REAL NOT NULL,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            title TEXT NOT NULL,
            out_of REAL NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES categories(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_category ON assignments(category_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            student_id TEXT NOT NULL,
            assignment_id TEXT NOT NULL,
            raw_value REAL NOT NULL,
            updated_at TEXT,
            PRIMARY KEY(student_id, assignment_id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(assignment_id) REFERENCES assignments(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_ranges(
            sort_order INTEGER PRIMARY KEY,
            letter TEXT NOT NULL UNIQUE,
            lower_bound REAL NOT NULL
        )",
        [],
    )?;

    seed_grade_scheme(&conn)?;
    Ok(conn)
}

// A fresh workspace starts with the standard scheme.
fn seed_grade_scheme(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM grade_ranges", [], |r| r.get(0))?;
    if count == 0 {
        grade_scheme_replace(conn, &GradeScheme::standard())?;
    }
    Ok(())
}

fn next_sort_order(conn: &Connection, table: &str) -> Result<i64, GradeError> {
    let sql = format!("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM {}", table);
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, GradeError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

pub fn student_exists(conn: &Connection, id: &str) -> Result<bool, GradeError> {
    row_exists(conn, "students", id)
}

pub fn category_exists(conn: &Connection, id: &str) -> Result<bool, GradeError> {
    row_exists(conn, "categories", id)
}

pub fn assignment_exists(conn: &Connection, id: &str) -> Result<bool, GradeError> {
    row_exists(conn, "assignments", id)
}

pub fn students_list(conn: &Connection) -> Result<Vec<Student>, GradeError> {
    let mut stmt = conn.prepare("SELECT id, name FROM students ORDER BY sort_order")?;
    let students = stmt
        .query_map([], |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(students)
}

pub fn student_create(conn: &Connection, name: &str) -> Result<Student, GradeError> {
    let id = Uuid::new_v4().to_string();
    let sort_order = next_sort_order(conn, "students")?;
    conn.execute(
        "INSERT INTO students(id, name, sort_order) VALUES(?, ?, ?)",
        (&id, name, sort_order),
    )?;
    Ok(Student {
        id,
        name: name.to_string(),
    })
}

pub fn category_create(conn: &Connection, name: &str, weight: f64) -> Result<String, GradeError> {
    let id = Uuid::new_v4().to_string();
    let sort_order = next_sort_order(conn, "categories")?;
    conn.execute(
        "INSERT INTO categories(id, name, weight, sort_order) VALUES(?, ?, ?, ?)",
        (&id, name, weight, sort_order),
    )?;
    Ok(id)
}

pub fn assignment_create(
    conn: &Connection,
    category_id: &str,
    title: &str,
    out_of: f64,
) -> Result<Assignment, GradeError> {
    let id = Uuid::new_v4().to_string();
    let sort_order = next_sort_order(conn, "assignments")?;
    conn.execute(
        "INSERT INTO assignments(id, category_id, title, out_of, sort_order) VALUES(?, ?, ?, ?, ?)",
        (&id, category_id, title, out_of, sort_order),
    )?;
    Ok(Assignment {
        id,
        category_id: category_id.to_string(),
        title: title.to_string(),
        out_of,
    })
}

pub fn assignment_tree(conn: &Connection) -> Result<AssignmentTree, GradeError> {
    let mut cat_stmt =
        conn.prepare("SELECT id, name, weight FROM categories ORDER BY sort_order")?;
    let mut categories: Vec<Category> = cat_stmt
        .query_map([], |r| {
            Ok(Category {
                id: r.get(0)?,
                name: r.get(1)?,
                weight: r.get(2)?,
                assignments: Vec::new(),
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let index: HashMap<String, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();

    let mut assess_stmt = conn.prepare(
        "SELECT id, category_id, title, out_of FROM assignments ORDER BY sort_order",
    )?;
    let assignments = assess_stmt
        .query_map([], |r| {
            Ok(Assignment {
                id: r.get(0)?,
                category_id: r.get(1)?,
                title: r.get(2)?,
                out_of: r.get(3)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    for a in assignments {
        if let Some(&i) = index.get(&a.category_id) {
            categories[i].assignments.push(a);
        }
    }

    Ok(AssignmentTree::new(categories))
}

pub fn score_set(
    conn: &Connection,
    student_id: &str,
    assignment_id: &str,
    raw_value: f64,
) -> Result<(), GradeError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO scores(student_id, assignment_id, raw_value, updated_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, assignment_id) DO UPDATE SET
           raw_value = excluded.raw_value,
           updated_at = excluded.updated_at",
        (student_id, assignment_id, raw_value, &now),
    )?;
    Ok(())
}

pub fn score_clear(
    conn: &Connection,
    student_id: &str,
    assignment_id: &str,
) -> Result<bool, GradeError> {
    let n = conn.execute(
        "DELETE FROM scores WHERE student_id = ? AND assignment_id = ?",
        (student_id, assignment_id),
    )?;
    Ok(n > 0)
}

pub fn score_get(
    conn: &Connection,
    student_id: &str,
    assignment_id: &str,
) -> Result<Option<f64>, GradeError> {
    Ok(conn
        .query_row(
            "SELECT raw_value FROM scores WHERE student_id = ? AND assignment_id = ?",
            (student_id, assignment_id),
            |r| r.get(0),
        )
        .optional()?)
}

pub fn scores_for_student(conn: &Connection, student_id: &str) -> Result<ScoreMap, GradeError> {
    let mut stmt =
        conn.prepare("SELECT assignment_id, raw_value FROM scores WHERE student_id = ?")?;
    let rows = stmt
        .query_map([student_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows.into_iter().collect())
}

pub fn grade_scheme_load(conn: &Connection) -> Result<GradeScheme, GradeError> {
    let mut stmt =
        conn.prepare("SELECT letter, lower_bound FROM grade_ranges ORDER BY sort_order")?;
    let cutoffs = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    GradeScheme::from_cutoffs(cutoffs)
}

/// Swaps the stored scheme in one transaction.
pub fn grade_scheme_replace(conn: &Connection, scheme: &GradeScheme) -> Result<(), GradeError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM grade_ranges", [])?;
    for (i, (letter, lower)) in scheme.cutoffs().enumerate() {
        tx.execute(
            "INSERT INTO grade_ranges(sort_order, letter, lower_bound) VALUES(?, ?, ?)",
            (i as i64, letter.as_str(), lower.value()),
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// A workspace connection seen as the core's data source and scheme owner.
pub struct Workspace<'a> {
    conn: &'a Connection,
}

impl<'a> Workspace<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DataSource for Workspace<'_> {
    fn students(&self) -> Result<Vec<Student>, GradeError> {
        students_list(self.conn)
    }

    fn assignment_tree(&self) -> Result<AssignmentTree, GradeError> {
        assignment_tree(self.conn)
    }

    fn raw_score(&self, student: &Student, assignment: &Assignment) -> Result<f64, GradeError> {
        score_get(self.conn, &student.id, &assignment.id)?.ok_or_else(|| {
            GradeError::MissingScore {
                student_id: student.id.clone(),
                assignment_id: assignment.id.clone(),
            }
        })
    }

    fn scores_for(&self, student: &Student) -> Result<ScoreMap, GradeError> {
        scores_for_student(self.conn, &student.id)
    }
}

impl SchemeStore for Workspace<'_> {
    fn committed_scheme(&self) -> Result<GradeScheme, GradeError> {
        grade_scheme_load(self.conn)
    }

    fn replace_scheme(&mut self, scheme: &GradeScheme) -> Result<(), GradeError> {
        grade_scheme_replace(self.conn, scheme)
    }
}
