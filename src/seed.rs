use crate::config::LoadOptions;
use crate::document::{read_document, SeedDocument};
use crate::error::SeedError;
use rusqlite::{CachedStatement, Connection, ErrorCode, Transaction};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTally {
    pub entity: &'static str,
    pub inserted: u64,
    pub skipped: u64,
}

impl EntityTally {
    fn new(entity: &'static str) -> Self {
        Self {
            entity,
            inserted: 0,
            skipped: 0,
        }
    }

    fn record(&mut self, changed: usize) {
        if changed == 0 {
            self.skipped += 1;
        } else {
            self.inserted += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub run_id: String,
    pub input_digest: String,
    pub committed: bool,
    pub entities: Vec<EntityTally>,
}

impl LoadReport {
    pub fn total_inserted(&self) -> u64 {
        self.entities.iter().map(|t| t.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.entities.iter().map(|t| t.skipped).sum()
    }
}

#[cfg(test)]
impl LoadReport {
    fn tally(&self, entity: &str) -> Option<&EntityTally> {
        self.entities.iter().find(|t| t.entity == entity)
    }
}

pub fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn load_file(
    conn: &Connection,
    path: &Path,
    opts: &LoadOptions,
) -> Result<LoadReport, SeedError> {
    let loaded = read_document(path)?;
    loaded.document.validate()?;
    let digest = digest_hex(&loaded.bytes);
    info!(
        path = %path.display(),
        records = loaded.document.record_count(),
        digest = %digest,
        "seed document read"
    );
    load_document(conn, &loaded.document, &digest, opts)
}

pub fn load_document(
    conn: &Connection,
    doc: &SeedDocument,
    input_digest: &str,
    opts: &LoadOptions,
) -> Result<LoadReport, SeedError> {
    let run_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("seed_load", run_id = %run_id, dry_run = opts.dry_run);
    let _guard = span.enter();

    let tx = conn.unchecked_transaction()?;

    let entities = match insert_all(&tx, doc) {
        Ok(v) => v,
        Err(e) => {
            let _ = tx.rollback();
            warn!(error = %e, "seed load aborted, transaction rolled back");
            return Err(e);
        }
    };

    let mut report = LoadReport {
        run_id,
        input_digest: input_digest.to_string(),
        committed: false,
        entities,
    };

    if opts.dry_run {
        tx.rollback()?;
        info!(
            inserted = report.total_inserted(),
            skipped = report.total_skipped(),
            "dry run finished, transaction rolled back"
        );
        return Ok(report);
    }

    if let Err(e) = record_run(&tx, &report) {
        let _ = tx.rollback();
        warn!(error = %e, "failed to record seed run, transaction rolled back");
        return Err(e);
    }
    tx.commit()?;
    report.committed = true;

    info!(
        inserted = report.total_inserted(),
        skipped = report.total_skipped(),
        "seed committed"
    );
    Ok(report)
}

fn insert_all(tx: &Transaction<'_>, doc: &SeedDocument) -> Result<Vec<EntityTally>, SeedError> {
    let mut out = Vec::with_capacity(11);

    out.push(insert_level(
        tx,
        "universities",
        "INSERT INTO universities(id, name, acronym) VALUES(?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.universities.iter(),
        |u| u.id,
        |stmt, u| stmt.execute((u.id, &u.name, &u.acronym)),
    )?);

    out.push(insert_level(
        tx,
        "departments",
        "INSERT INTO departments(id, university_id, name) VALUES(?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.universities
            .iter()
            .flat_map(|u| u.departments.iter().map(move |d| (u.id, d))),
        |(_, d)| d.id,
        |stmt, (university_id, d)| stmt.execute((d.id, university_id, &d.name)),
    )?);

    out.push(insert_level(
        tx,
        "courses",
        "INSERT INTO courses(id, department_id, name) VALUES(?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.universities
            .iter()
            .flat_map(|u| u.departments.iter())
            .flat_map(|d| d.courses.iter().map(move |c| (d.id, c))),
        |(_, c)| c.id,
        |stmt, (department_id, c)| stmt.execute((c.id, department_id, &c.name)),
    )?);

    out.push(insert_level(
        tx,
        "subjects",
        "INSERT INTO subjects(id, course_id, name, code, credit_hours) VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.universities
            .iter()
            .flat_map(|u| u.departments.iter())
            .flat_map(|d| d.courses.iter())
            .flat_map(|c| c.subjects.iter().map(move |s| (c.id, s))),
        |(_, s)| s.id,
        |stmt, (course_id, s)| stmt.execute((s.id, course_id, &s.name, &s.code, s.credit_hours)),
    )?);

    out.push(insert_level(
        tx,
        "professors",
        "INSERT INTO professors(id, name, email, registration) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.professors.iter(),
        |p| p.id,
        |stmt, p| stmt.execute((p.id, &p.name, &p.email, &p.registration)),
    )?);

    out.push(insert_level(
        tx,
        "students",
        "INSERT INTO students(id, name, email, registration) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.students.iter(),
        |s| s.id,
        |stmt, s| stmt.execute((s.id, &s.name, &s.email, &s.registration)),
    )?);

    out.push(insert_level(
        tx,
        "academic_terms",
        "INSERT INTO academic_terms(id, code, start_date, end_date) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.academic_terms.iter(),
        |t| t.id,
        |stmt, t| {
            stmt.execute((
                t.id,
                &t.code,
                t.start_date.to_string(),
                t.end_date.to_string(),
            ))
        },
    )?);

    out.push(insert_level(
        tx,
        "sections",
        "INSERT INTO sections(id, subject_id, professor_id, academic_term_id, code)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.sections.iter(),
        |s| s.id,
        |stmt, s| {
            stmt.execute((
                s.id,
                s.subject_id,
                s.professor_id,
                s.academic_term_id,
                &s.code,
            ))
        },
    )?);

    out.push(insert_level(
        tx,
        "enrollments",
        "INSERT INTO enrollments(id, student_id, section_id, enrollment_date) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.enrollments.iter(),
        |e| e.id,
        |stmt, e| {
            stmt.execute((
                e.id,
                e.student_id,
                e.section_id,
                e.enrollment_date.to_string(),
            ))
        },
    )?);

    out.push(insert_level(
        tx,
        "attendance_records",
        "INSERT INTO attendance_records(id, enrollment_id, class_date, status) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.attendance_records.iter(),
        |a| a.id,
        |stmt, a| {
            stmt.execute((
                a.id,
                a.enrollment_id,
                a.class_date.to_string(),
                a.status.as_str(),
            ))
        },
    )?);

    out.push(insert_level(
        tx,
        "absence_justifications",
        "INSERT INTO absence_justifications(id, attendance_record_id, reason, attachment, approval_status)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        doc.absence_justifications.iter(),
        |j| j.id,
        |stmt, j| {
            stmt.execute((
                j.id,
                j.attendance_record_id,
                &j.reason,
                &j.attachment,
                j.approval_status.as_str(),
            ))
        },
    )?);

    Ok(out)
}

// One cached statement per level. Only constraint failures are pinned on
// the record; lock, busy and I/O errors belong to the store.
fn insert_level<I, F, G>(
    tx: &Transaction<'_>,
    entity: &'static str,
    sql: &str,
    rows: impl IntoIterator<Item = I>,
    id_of: F,
    mut insert: G,
) -> Result<EntityTally, SeedError>
where
    F: Fn(&I) -> i64,
    G: FnMut(&mut CachedStatement<'_>, &I) -> rusqlite::Result<usize>,
{
    let mut stmt = tx.prepare_cached(sql)?;
    let mut tally = EntityTally::new(entity);
    for row in rows {
        let changed = insert(&mut stmt, &row).map_err(|source| {
            match source.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => SeedError::Insert {
                    entity,
                    id: id_of(&row),
                    source,
                },
                _ => SeedError::Store(source),
            }
        })?;
        tally.record(changed);
    }
    debug!(
        entity,
        inserted = tally.inserted,
        skipped = tally.skipped,
        "level loaded"
    );
    Ok(tally)
}

fn record_run(tx: &Transaction<'_>, report: &LoadReport) -> Result<(), SeedError> {
    let loaded_at = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO seed_runs(id, input_digest, loaded_at, rows_inserted, rows_skipped)
         VALUES(?, ?, ?, ?, ?)",
        (
            &report.run_id,
            &report.input_digest,
            &loaded_at,
            report.total_inserted() as i64,
            report.total_skipped() as i64,
        ),
    )?;
    Ok(())
}
