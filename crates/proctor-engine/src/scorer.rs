//! Integrity scoring.
//!
//! The score starts at 100 and loses a fixed number of points per event,
//! looked up by event type. Unknown types cost nothing. Scoring is total:
//! any event slice, including an empty one, produces a report.

use std::collections::BTreeMap;

use proctor_models::{
    detected_item_label, event_type_label, event_types, DetectedItem, Event, IntegrityReport,
    SummaryDetails,
};

/// Perfect score before deductions.
pub const BASELINE_SCORE: u32 = 100;

/// Points deducted per event, in breakdown order.
pub const PENALTIES: &[(&str, u32)] = &[
    (event_types::FACE_ABSENT, 10),
    (event_types::MULTIPLE_FACES, 20),
    (event_types::FOCUS_LOST, 5),
    ("cell_phone_detected", 15),
    ("book_detected", 10),
    ("laptop_detected", 10),
    ("paper_detected", 10),
];

/// Penalty for one event of the given type.
pub fn penalty_for(event_type: &str) -> u32 {
    PENALTIES
        .iter()
        .find(|(t, _)| *t == event_type)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Compute the integrity report for a session's events.
pub fn score(events: &[Event]) -> IntegrityReport {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for event in events {
        *counts.entry(event.event_type.as_str()).or_default() += 1;
    }

    let mut total_deduction: u32 = 0;
    let mut deductions_breakdown = Vec::new();
    for (event_type, points) in PENALTIES {
        let count = counts.get(event_type).copied().unwrap_or(0);
        let deduction = points.saturating_mul(count);
        if deduction == 0 {
            continue;
        }
        total_deduction = total_deduction.saturating_add(deduction);
        deductions_breakdown.push(format!(
            "Lost {} points for {} instance(s) of '{}'",
            deduction,
            count,
            event_type_label(event_type)
        ));
    }

    let detected_items = counts
        .iter()
        .filter_map(|(event_type, count)| {
            detected_item_label(event_type).map(|label| {
                (
                    event_type.to_string(),
                    DetectedItem {
                        label,
                        count: *count,
                    },
                )
            })
        })
        .collect();

    let count_of = |event_type: &str| counts.get(event_type).copied().unwrap_or(0);

    IntegrityReport {
        final_integrity_score: BASELINE_SCORE.saturating_sub(total_deduction),
        summary_details: SummaryDetails {
            focus_lost_count: count_of(event_types::FOCUS_LOST),
            face_absent_count: count_of(event_types::FACE_ABSENT),
            multiple_faces_count: count_of(event_types::MULTIPLE_FACES),
            detected_items,
        },
        deductions_breakdown,
    }
}
