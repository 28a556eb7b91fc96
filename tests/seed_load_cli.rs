mod test_support;

use rusqlite::Connection;
use test_support::{row_counts, run_load, stdout_line, temp_dir, total_rows};

#[test]
fn scenario_load_is_idempotent() {
    let workspace = temp_dir("sgpa-seed-scenario");
    let db = workspace.join("sgpa.sqlite3");

    let first = run_load(&db, "scenario.json", &[]);
    assert!(first.status.success(), "first load: {}", stdout_line(&first));
    let line = stdout_line(&first);
    assert!(line.starts_with("OK: seed committed (12 inserted, 0 skipped)"), "{}", line);

    let counts = row_counts(&db);
    for (table, n) in &counts {
        let expected = if table == "attendance_records" { 2 } else { 1 };
        assert_eq!(*n, expected, "rows in {}", table);
    }

    let second = run_load(&db, "scenario.json", &[]);
    assert!(second.status.success());
    assert!(stdout_line(&second).starts_with("OK: seed committed (0 inserted, 12 skipped)"));
    assert_eq!(row_counts(&db), counts);

    let conn = Connection::open(&db).expect("open store");
    let runs: i64 = conn
        .query_row("SELECT COUNT(*) FROM seed_runs", [], |r| r.get(0))
        .expect("count runs");
    assert_eq!(runs, 2);
    let digests: i64 = conn
        .query_row("SELECT COUNT(DISTINCT input_digest) FROM seed_runs", [], |r| r.get(0))
        .expect("count digests");
    assert_eq!(digests, 1);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn conflicting_university_keeps_original_name() {
    let workspace = temp_dir("sgpa-seed-conflict");
    let db = workspace.join("sgpa.sqlite3");

    assert!(run_load(&db, "scenario.json", &[]).status.success());
    let resubmit = run_load(&db, "university_renamed.json", &[]);
    assert!(resubmit.status.success());
    assert!(stdout_line(&resubmit).starts_with("OK: seed committed (0 inserted, 1 skipped)"));

    let conn = Connection::open(&db).expect("open store");
    let name: String = conn
        .query_row("SELECT name FROM universities WHERE id = 1", [], |r| r.get(0))
        .expect("university name");
    assert_eq!(name, "Universidade Federal");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn dangling_term_reference_fails_whole_run() {
    let workspace = temp_dir("sgpa-seed-dangling");
    let db = workspace.join("sgpa.sqlite3");

    let out = run_load(&db, "dangling_term.json", &[]);
    assert!(!out.status.success());
    let line = stdout_line(&out);
    assert!(line.starts_with("ERROR: seed rolled back:"), "{}", line);
    assert!(line.contains("sections 1"), "{}", line);
    assert_eq!(total_rows(&db), 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn attendance_failure_discards_earlier_levels() {
    let workspace = temp_dir("sgpa-seed-atomic");
    let db = workspace.join("sgpa.sqlite3");

    let out = run_load(&db, "duplicate_attendance.json", &[]);
    assert!(!out.status.success());
    let line = stdout_line(&out);
    assert!(line.contains("attendance_records 2"), "{}", line);
    assert!(line.contains("UNIQUE"), "{}", line);
    assert_eq!(total_rows(&db), 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_document_never_touches_store() {
    let workspace = temp_dir("sgpa-seed-invalid");
    let db = workspace.join("sgpa.sqlite3");

    assert!(run_load(&db, "scenario.json", &[]).status.success());
    let before = row_counts(&db);

    let out = run_load(&db, "inverted_term.json", &[]);
    assert!(!out.status.success());
    assert!(stdout_line(&out).contains("invalid academic term 1"));

    let missing = run_load(&db, "does_not_exist.json", &[]);
    assert!(!missing.status.success());
    assert!(stdout_line(&missing).contains("failed to read seed document"));

    assert_eq!(row_counts(&db), before);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn dry_run_reports_without_writing() {
    let workspace = temp_dir("sgpa-seed-dry-run");
    let db = workspace.join("sgpa.sqlite3");

    let out = run_load(&db, "scenario.json", &["--dry-run"]);
    assert!(out.status.success());
    assert_eq!(
        stdout_line(&out),
        "OK: dry run rolled back (12 would insert, 0 skipped)"
    );
    assert_eq!(total_rows(&db), 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn counts_command_lists_every_table() {
    let workspace = temp_dir("sgpa-seed-counts");
    let db = workspace.join("sgpa.sqlite3");
    assert!(run_load(&db, "scenario.json", &[]).status.success());

    let out = std::process::Command::new(env!("CARGO_BIN_EXE_sgpa-seed"))
        .arg("counts")
        .env("SGPA_DB", &db)
        .env("RUST_LOG", "off")
        .output()
        .expect("run sgpa-seed counts");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout).to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), test_support::ENTITY_TABLES.len());
    assert_eq!(lines[0], "universities\t1");
    assert!(lines.contains(&"attendance_records\t2"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn locked_store_rolls_back_with_store_failure() {
    let workspace = temp_dir("sgpa-seed-locked");
    let db = workspace.join("sgpa.sqlite3");

    let bootstrap = std::process::Command::new(env!("CARGO_BIN_EXE_sgpa-seed"))
        .arg("counts")
        .arg("--db")
        .arg(&db)
        .env("RUST_LOG", "off")
        .output()
        .expect("bootstrap schema");
    assert!(bootstrap.status.success());

    let writer = Connection::open(&db).expect("open competing writer");
    writer
        .execute_batch(
            "BEGIN IMMEDIATE;
             INSERT INTO professors(id, name, email) VALUES(900, 'Holder', 'holder@uf.edu');",
        )
        .expect("hold write lock");

    let out = run_load(&db, "scenario.json", &["--busy-timeout-ms", "50"]);
    assert_eq!(out.status.code(), Some(1));
    let line = stdout_line(&out);
    assert!(line.starts_with("ERROR: seed rolled back:"), "{}", line);
    assert!(line.contains("locked"), "{}", line);
    assert!(!line.contains("universities 1"), "{}", line);

    writer.execute_batch("ROLLBACK").expect("release write lock");
    drop(writer);
    assert_eq!(total_rows(&db), 0);

    let _ = std::fs::remove_dir_all(workspace);
}
