use std::collections::HashMap;
use std::fmt::Write;

use crate::config::ExportTarget;
use crate::models::{AssessmentRow, LatenessSummary, SubmissionRow};
use crate::pipeline::Tables;

pub fn summarize_lateness(submissions: &[SubmissionRow]) -> Vec<LatenessSummary> {
    let mut map = HashMap::new();

    for submission in submissions {
        let entry = map.entry(submission.lateness).or_insert((0usize, 0.0f64));
        entry.0 += 1;
        entry.1 += submission.hours_late;
    }

    let mut summaries: Vec<LatenessSummary> = map
        .into_iter()
        .map(|(lateness, (count, total_hours))| LatenessSummary {
            lateness,
            count,
            avg_hours_late: if count == 0 {
                0.0
            } else {
                total_hours / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.lateness.label().cmp(b.lateness.label()))
    });
    summaries
}

pub fn average_score(assessments: &[AssessmentRow]) -> Option<f64> {
    if assessments.is_empty() {
        return None;
    }
    let total: f64 = assessments.iter().map(|a| a.score).sum();
    Some(total / assessments.len() as f64)
}

pub fn build_report(target: &ExportTarget, tables: &Tables) -> String {
    let summaries = summarize_lateness(&tables.submissions);
    let stats = &tables.stats;

    let mut output = String::new();

    let _ = writeln!(output, "# Peer Review Summary");
    let _ = writeln!(
        output,
        "Course {} / assignment {} / rubric {} ({}) association {}",
        target.course_id,
        target.assignment_id,
        target.rubric_id,
        tables.rubric_title,
        target.rubric_association_id
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Assessments");
    let _ = writeln!(
        output,
        "- {} of {} rubric assessments belong to association {}",
        stats.matching_association, stats.total, target.rubric_association_id
    );
    let _ = writeln!(output, "- {} are peer reviews", stats.peer_reviews);
    let _ = writeln!(output, "- {} assess a submission", stats.submission_artifacts);

    match average_score(&tables.assessments) {
        Some(average) => {
            let total: f64 = tables.assessments.iter().map(|a| a.score).sum();
            let _ = writeln!(
                output,
                "- Average score: {:.2} ({}/{})",
                average,
                total,
                tables.assessments.len()
            );
        }
        None => {
            let _ = writeln!(output, "- No assessments for this association.");
        }
    }

    let unresolved = tables
        .assessments
        .iter()
        .filter(|a| a.assessor_student_id.is_none() || a.assessed_student_id.is_none())
        .count();
    if unresolved > 0 {
        let _ = writeln!(output, "- {} with an unresolved student", unresolved);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Submissions");

    if summaries.is_empty() {
        let _ = writeln!(output, "No submissions recorded for this assignment.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} submissions (avg {:.1} hours late)",
                summary.lateness.label(),
                summary.count,
                summary.avg_hours_late
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssessmentStats, Lateness, SubmissionStatus};

    fn submission(hours_late: Option<f64>) -> SubmissionRow {
        SubmissionRow {
            submission_id: 1,
            student_id: Some(1001),
            submitted_at: None,
            hours_late: hours_late.unwrap_or(0.0),
            lateness: Lateness::from_hours(hours_late),
            status: SubmissionStatus::Submitted,
            attempt: 1,
        }
    }

    fn assessment(score: f64) -> AssessmentRow {
        AssessmentRow {
            assessment_id: 1,
            assessed_student_id: Some(1002),
            assessor_student_id: Some(1001),
            score,
            attempt: 1,
        }
    }

    #[test]
    fn lateness_groups_by_state() {
        let summaries = summarize_lateness(&[
            submission(Some(2.0)),
            submission(Some(4.0)),
            submission(None),
        ]);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].lateness, Lateness::Late);
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_hours_late - 3.0).abs() < 0.001);
        assert_eq!(summaries[1].lateness, Lateness::NotSubmitted);
    }

    #[test]
    fn average_score_over_assessments() {
        assert_eq!(average_score(&[]), None);
        assert_eq!(average_score(&[assessment(3.0), assessment(4.0)]), Some(3.5));
    }

    #[test]
    fn report_lists_counts_and_average() {
        let target = ExportTarget {
            course_id: 1,
            assignment_id: 2,
            rubric_id: 3,
            rubric_association_id: 40,
        };
        let tables = Tables {
            users: Vec::new(),
            submissions: vec![submission(Some(-1.0))],
            assessments: vec![assessment(3.0), assessment(4.0)],
            stats: AssessmentStats {
                total: 5,
                matching_association: 2,
                peer_reviews: 2,
                submission_artifacts: 2,
            },
            rubric_title: "Peer rubric".to_string(),
        };

        let report = build_report(&target, &tables);

        assert!(report.contains("2 of 5 rubric assessments belong to association 40"));
        assert!(report.contains("Average score: 3.50 (7/2)"));
        assert!(report.contains("- on time: 1 submissions"));
        assert!(!report.contains("unresolved"));
    }
}
