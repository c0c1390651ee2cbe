//! Pure progress calculators over the subject hierarchy.

use std::collections::HashMap;

use crate::model::{SubjectData, SubjectInfo, SubjectKey, TOTAL_ROUNDS};

/// Percentage completion for a single subject.
///
/// `total` is `rows × TOTAL_ROUNDS × 2` (mcq and essay counted
/// independently); returns `0` for a subject with no rows.
#[must_use]
pub fn subject_progress(data: &SubjectData) -> u8 {
    let (done, total) = flag_counts(data);
    percent(done, total)
}

/// Percentage completion aggregated across all subjects.
///
/// Subjects without an entry in `data` are skipped entirely rather than
/// contributing zero-progress rows to the denominator.
#[must_use]
pub fn total_progress(subjects: &[SubjectInfo], data: &HashMap<SubjectKey, SubjectData>) -> u8 {
    let mut done = 0;
    let mut total = 0;
    for subject in subjects {
        let Some(subject_data) = data.get(subject.key()) else {
            continue;
        };
        let (d, t) = flag_counts(subject_data);
        done += d;
        total += t;
    }
    percent(done, total)
}

fn flag_counts(data: &SubjectData) -> (usize, usize) {
    let total = data.rows().len() * TOTAL_ROUNDS * 2;
    let mut done = 0;
    for row in data.rows() {
        for round in row.rounds() {
            if round.mcq {
                done += 1;
            }
            if round.essay {
                done += 1;
            }
        }
    }
    (done, total)
}

// Round-half-up to the nearest integer percent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}
