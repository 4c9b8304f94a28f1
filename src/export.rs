use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::models::TableRow;
use crate::pipeline::Tables;

/// Writes `rows` as CSV with a header row, replacing any existing file. The
/// header is written even when there are no rows.
pub fn write_table<T: TableRow>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_tables(out_dir: &Path, tables: &Tables) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let users = out_dir.join("users.csv");
    write_table(&users, &tables.users)?;
    let submissions = out_dir.join("submissions.csv");
    write_table(&submissions, &tables.submissions)?;
    let assessments = out_dir.join("assessments.csv");
    write_table(&assessments, &tables.assessments)?;

    Ok(vec![users, submissions, assessments])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        AssessmentRow, AssessmentStats, Lateness, SubmissionRow, SubmissionStatus, UserRow,
    };

    fn tables() -> Tables {
        Tables {
            users: vec![UserRow {
                canvas_id: 10,
                name: "Jo Doe".to_string(),
                student_id: 1001,
                ccid: "jdoe".to_string(),
            }],
            submissions: vec![SubmissionRow {
                submission_id: 501,
                student_id: None,
                submitted_at: None,
                hours_late: 0.0,
                lateness: Lateness::NotSubmitted,
                status: SubmissionStatus::Unsubmitted,
                attempt: 0,
            }],
            assessments: vec![AssessmentRow {
                assessment_id: 1,
                assessed_student_id: None,
                assessor_student_id: Some(1001),
                score: 3.5,
                attempt: 1,
            }],
            stats: AssessmentStats::default(),
            rubric_title: "Peer rubric".to_string(),
        }
    }

    #[test]
    fn tables_are_written_with_headers_and_holes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_tables(dir.path(), &tables()).unwrap();
        assert_eq!(paths.len(), 3);

        let users = std::fs::read_to_string(dir.path().join("users.csv")).unwrap();
        assert_eq!(users, "canvas_id,name,student_id,ccid\n10,Jo Doe,1001,jdoe\n");

        let submissions = std::fs::read_to_string(dir.path().join("submissions.csv")).unwrap();
        assert_eq!(
            submissions,
            "submission_id,student_id,submitted_at,hours_late,lateness,status,attempt\n\
             501,,,0.0,not_submitted,unsubmitted,0\n"
        );

        let assessments = std::fs::read_to_string(dir.path().join("assessments.csv")).unwrap();
        assert_eq!(
            assessments,
            "assessment_id,assessed_student_id,assessor_student_id,score,attempt\n1,,1001,3.5,1\n"
        );
    }

    #[test]
    fn rerun_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        write_table::<UserRow>(&path, &[]).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "canvas_id,name,student_id,ccid\n"
        );
    }

    #[test]
    fn empty_tables_still_get_headers() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Tables {
            users: Vec::new(),
            submissions: Vec::new(),
            assessments: Vec::new(),
            stats: AssessmentStats::default(),
            rubric_title: String::new(),
        };

        write_tables(dir.path(), &empty).unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("users.csv"), "canvas_id,name,student_id,ccid\n");
        assert_eq!(
            read("submissions.csv"),
            "submission_id,student_id,submitted_at,hours_late,lateness,status,attempt\n"
        );
        assert_eq!(
            read("assessments.csv"),
            "assessment_id,assessed_student_id,assessor_student_id,score,attempt\n"
        );
    }
}
