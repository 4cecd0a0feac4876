use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// One discoverable fact about the avatar character.
///
/// Title and keywords are fixed at creation; `completed` flips false→true at
/// most once per session (only [`crate::TaskRegistry::reset`] clears it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    /// The keyword that marked this task discovered, once it is.
    #[serde(default)]
    pub matched_keyword: Option<String>,
}

impl Task {
    pub fn new(title: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            title: title.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            completed: false,
            matched_keyword: None,
        }
    }
}

/// The full pool of background facts for the avatar character, a CS junior
/// at UC Berkeley. Sessions draw their active set from here by index, so the
/// order of this list is part of the persisted-record contract and must not
/// be reshuffled once sessions have been recorded.
pub fn master_pool() -> Vec<Task> {
    vec![
        Task::new("Lives in dorms", &["dorm", "residence hall", "live on campus"]),
        Task::new("Has roommate named Jake", &["roommate", "jake"]),
        Task::new("Works as teaching assistant", &["teaching assistant", "ta for", "office hours"]),
        Task::new("Member of CS club and Robotics team", &["cs club", "computer science club", "robotics"]),
        Task::new("Enjoys hiking", &["hiking", "hike", "trail"]),
        Task::new("Favorite campus spot is the library", &["favorite spot", "favorite place", "library overlooking"]),
        Task::new("Dining hall and food truck habits", &["dining hall", "food truck", "telegraph"]),
        Task::new("Takes BART to SF on weekends", &["bart", "san francisco", "explore sf"]),
        Task::new("Majors in computer science", &["computer science", "cs major", "my major"]),
        Task::new("Focuses on AI and machine learning", &["machine learning", "ai class", "neural network"]),
        Task::new("Is in third year", &["junior", "third year"]),
        Task::new("Grew up in San Francisco", &["grew up", "from san francisco", "hometown"]),
        Task::new("Jake studies mechanical engineering", &["mechanical engineering", "mech eng"]),
        Task::new("Plays intramural soccer", &["intramural", "soccer", "pickup game"]),
        Task::new("Does a research project with a professor", &["research project", "my professor", "lab work"]),
        Task::new("Drinks too much coffee during finals", &["coffee", "finals week", "all-nighter"]),
        Task::new("Wants an internship at a startup", &["internship", "startup", "intern"]),
        Task::new("Learned guitar during freshman year", &["guitar", "learned to play"]),
        Task::new("Volunteers teaching kids to code", &["volunteer", "teach kids", "coding camp"]),
        Task::new("Misses home-cooked food", &["home-cooked", "mom's cooking", "miss the food"]),
    ]
}

/// Draw `count` tasks from `pool` uniformly at random, skipping indices in
/// `exclude`. Returns the drawn tasks and their pool indices; indices are
/// what gets persisted, since tasks themselves are plain data.
///
/// When fewer than `count` indices remain the draw degrades to "everything
/// left" with a warning rather than failing: a participant on their last
/// session still gets a conversation.
pub fn select_active_tasks<R: Rng + ?Sized>(
    pool: &[Task],
    count: usize,
    exclude: &HashSet<usize>,
    rng: &mut R,
) -> (Vec<Task>, Vec<usize>) {
    let mut available: Vec<usize> = (0..pool.len()).filter(|i| !exclude.contains(i)).collect();

    if available.len() < count {
        warn!(
            available = available.len(),
            requested = count,
            "task pool nearly exhausted, selecting all remaining tasks"
        );
    }

    available.shuffle(rng);
    available.truncate(count);

    let tasks = available.iter().map(|&i| pool[i].clone()).collect();
    (tasks, available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_has_twenty_unique_titles() {
        let pool = master_pool();
        assert_eq!(pool.len(), 20);
        let titles: HashSet<_> = pool.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles.len(), pool.len());
    }

    #[test]
    fn every_task_starts_incomplete_with_keywords() {
        for task in master_pool() {
            assert!(!task.completed, "{} starts completed", task.title);
            assert!(!task.keywords.is_empty(), "{} has no keywords", task.title);
        }
    }
}
