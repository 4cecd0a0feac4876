//! Filler phrase inventory and selection heuristics.
//!
//! The phrases mirror the rig's prerecorded clip set; the coordinator picks
//! a category from a cheap look at the pending reply text and a random
//! phrase within it.

use rand::seq::SliceRandom;
use rand::Rng;

pub const SHORT: &[&str] = &["um", "uh", "hmm", "ah", "er", "oh"];

pub const THINKING: &[&str] = &[
    "let me think",
    "hmm let me see",
    "uh let me think about that",
    "that's a good question",
    "interesting question",
    "hmm interesting",
];

pub const PROCESSING: &[&str] = &[
    "hmm give me a second",
    "let me think for a moment",
    "uh I need to think about that",
    "that's a great question let me see",
];

pub const HESITATION: &[&str] = &[
    "hmm how do I put it",
    "uh how should I say",
    "let me put it this way",
    "hmm where do I start",
];

/// Pick a filler for the turn whose reply preview is `preview`.
///
/// A question mark suggests the user asked something, so a questioning
/// filler fits; long previews get a longer "processing" filler; everything
/// else gets a short sound.
pub fn choose_filler<R: Rng + ?Sized>(preview: &str, rng: &mut R) -> String {
    let pool = if preview.contains('?') {
        THINKING
    } else if preview.len() > 100 {
        PROCESSING
    } else {
        SHORT
    };
    pool.choose(rng)
        .copied()
        .unwrap_or("hmm")
        .to_string()
}
