use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Which "thinking" feedback modality a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackCondition {
    Baseline,
    Gestures,
    Visual,
    Verbal,
}

impl fmt::Display for FeedbackCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackCondition::Baseline => "Baseline",
            FeedbackCondition::Gestures => "Gestures",
            FeedbackCondition::Visual => "Visual",
            FeedbackCondition::Verbal => "Verbal",
        };
        f.write_str(name)
    }
}

use FeedbackCondition::{Baseline, Gestures, Verbal, Visual};

/// Balanced Latin-square rows, repeated across the participant roster.
const BASE_SQUARE: [[FeedbackCondition; 4]; 4] = [
    [Baseline, Gestures, Visual, Verbal],
    [Gestures, Visual, Verbal, Baseline],
    [Visual, Verbal, Baseline, Gestures],
    [Verbal, Baseline, Gestures, Visual],
];

/// Explicit per-participant orders, P01 through P24. Kept as a table rather
/// than computed from the id so experimenters can audit the assignment.
static SESSION_ORDERS: Lazy<HashMap<&'static str, [FeedbackCondition; 4]>> = Lazy::new(|| {
    let ids = [
        "P01", "P02", "P03", "P04", "P05", "P06", "P07", "P08", "P09", "P10", "P11", "P12",
        "P13", "P14", "P15", "P16", "P17", "P18", "P19", "P20", "P21", "P22", "P23", "P24",
    ];
    ids.iter()
        .enumerate()
        .map(|(i, &id)| (id, BASE_SQUARE[i % 4]))
        .collect()
});

/// Look up the feedback condition for a participant's nth session.
///
/// An experimenter typo must not crash an unattended session, so unknown
/// participants and out-of-range session numbers fall back to [`Baseline`]
/// with a warning.
pub fn resolve_condition(participant_id: &str, session_number: u8) -> FeedbackCondition {
    let pid = participant_id.trim().to_uppercase();

    let Some(order) = SESSION_ORDERS.get(pid.as_str()) else {
        warn!(participant = %pid, "unknown participant id, defaulting to Baseline");
        return Baseline;
    };

    if !(1..=4).contains(&session_number) {
        warn!(
            participant = %pid,
            session = session_number,
            "session number out of range 1..=4, defaulting to Baseline"
        );
        return Baseline;
    }

    order[usize::from(session_number) - 1]
}
