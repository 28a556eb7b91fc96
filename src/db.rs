use crate::config::StoreConfig;
use rusqlite::Connection;

// Seed traversal order: parents before children.
pub const ENTITY_TABLES: &[&str] = &[
    "universities",
    "departments",
    "courses",
    "subjects",
    "professors",
    "students",
    "academic_terms",
    "sections",
    "enrollments",
    "attendance_records",
    "absence_justifications",
];

pub fn open_db(config: &StoreConfig) -> anyhow::Result<Connection> {
    if let Some(parent) = config.path().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(config.path())?;
    conn.busy_timeout(config.busy_timeout)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS universities(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            acronym TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            id INTEGER PRIMARY KEY,
            university_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(university_id) REFERENCES universities(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_departments_university ON departments(university_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY,
            department_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(department_id) REFERENCES departments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_department ON courses(department_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            credit_hours INTEGER NOT NULL CHECK(credit_hours >= 0),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_course ON subjects(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS professors(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            registration TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            registration TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_terms(
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sections(
            id INTEGER PRIMARY KEY,
            subject_id INTEGER NOT NULL,
            professor_id INTEGER NOT NULL,
            academic_term_id INTEGER NOT NULL,
            code TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(professor_id) REFERENCES professors(id),
            FOREIGN KEY(academic_term_id) REFERENCES academic_terms(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_subject ON sections(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_professor ON sections(professor_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_term ON sections(academic_term_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            section_id INTEGER NOT NULL,
            enrollment_date TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(section_id) REFERENCES sections(id),
            UNIQUE(student_id, section_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_section ON enrollments(section_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            id INTEGER PRIMARY KEY,
            enrollment_id INTEGER NOT NULL,
            class_date TEXT NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY(enrollment_id) REFERENCES enrollments(id),
            UNIQUE(enrollment_id, class_date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_records_enrollment ON attendance_records(enrollment_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS absence_justifications(
            id INTEGER PRIMARY KEY,
            attendance_record_id INTEGER NOT NULL,
            reason TEXT NOT NULL,
            attachment TEXT,
            approval_status TEXT NOT NULL DEFAULT 'pending',
            FOREIGN KEY(attendance_record_id) REFERENCES attendance_records(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_absence_justifications_record ON absence_justifications(attendance_record_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS seed_runs(
            id TEXT PRIMARY KEY,
            input_digest TEXT NOT NULL,
            loaded_at TEXT NOT NULL,
            rows_inserted INTEGER NOT NULL,
            rows_skipped INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

pub fn table_counts(conn: &Connection) -> rusqlite::Result<Vec<(&'static str, i64)>> {
    let mut out = Vec::with_capacity(ENTITY_TABLES.len());
    for table in ENTITY_TABLES {
        out.push((*table, count_rows(conn, table)?));
    }
    Ok(out)
}

pub fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    conn.query_row(&sql, [], |r| r.get(0))
}
