use crate::condition::{resolve_condition, FeedbackCondition};
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tasks::{select_active_tasks, Task};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record already exists for {participant_id} session {session_number}")]
    AlreadyRecorded {
        participant_id: String,
        session_number: u8,
    },
}

/// Identity of one experimental session, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    participant_id: String,
    session_number: u8,
}

impl SessionKey {
    /// Participant ids are normalized to upper case so "p01" and "P01" name
    /// the same record on disk.
    pub fn new(participant_id: impl AsRef<str>, session_number: u8) -> Self {
        Self {
            participant_id: participant_id.as_ref().trim().to_uppercase(),
            session_number,
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn session_number(&self) -> u8 {
        self.session_number
    }
}

/// What got persisted for one session: which pool entries were used and
/// under which condition. Once written this is immutable truth; replays load
/// it verbatim and sibling sessions use it as their exclusion set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub participant_id: String,
    pub session_number: u8,
    pub task_indices: Vec<usize>,
    pub feedback_condition: FeedbackCondition,
    pub timestamp: String,
}

/// Directory of per-session JSON records, one file per
/// (participant, session) pair, named so they are greppable by hand.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SessionError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(format!(
            "{}_Session{}_Config.json",
            key.participant_id(),
            key.session_number()
        ))
    }

    /// Load the record for `key` if one was ever written.
    pub fn load(&self, key: &SessionKey) -> Result<Option<SessionRecord>, SessionError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Persist `record`, refusing to overwrite: records are write-once per
    /// session key.
    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let key = SessionKey::new(&record.participant_id, record.session_number);
        let path = self.record_path(&key);
        if path.exists() {
            return Err(SessionError::AlreadyRecorded {
                participant_id: record.participant_id.clone(),
                session_number: record.session_number,
            });
        }
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "session record saved");
        Ok(())
    }

    /// Pool indices already consumed by this participant's *other* sessions.
    pub fn used_indices(&self, participant_id: &str, excluding_session: u8) -> HashSet<usize> {
        let mut used = HashSet::new();
        for session in 1..=4u8 {
            if session == excluding_session {
                continue;
            }
            let key = SessionKey::new(participant_id, session);
            match self.load(&key) {
                Ok(Some(record)) => used.extend(record.task_indices),
                Ok(None) => {}
                Err(e) => warn!(session, "unreadable session record skipped: {e}"),
            }
        }
        used
    }

    /// Which of the four sessions already have a record on disk.
    pub fn completed_sessions(&self, participant_id: &str) -> Vec<u8> {
        (1..=4u8)
            .filter(|&s| self.record_path(&SessionKey::new(participant_id, s)).exists())
            .collect()
    }

    /// One-line audit summary, e.g. "P01: 2/4 sessions recorded, 8/20 tasks used".
    pub fn progress_summary(&self, participant_id: &str, pool_size: usize) -> String {
        let completed = self.completed_sessions(participant_id).len();
        let used = self.used_indices(participant_id, 0).len();
        format!(
            "{}: {completed}/4 sessions recorded, {used}/{pool_size} tasks used",
            SessionKey::new(participant_id, 1).participant_id()
        )
    }

    /// Resolve the active task set for `key`: replay the stored record when
    /// one exists, otherwise draw a fresh disjoint subset and persist it.
    ///
    /// A failed write is logged loudly but does not abort: the session runs
    /// with the freshly drawn set even if the record could not be stored.
    pub fn load_or_create<R: Rng + ?Sized>(
        &self,
        key: &SessionKey,
        pool: &[Task],
        count: usize,
        rng: &mut R,
    ) -> Result<(Vec<Task>, Vec<usize>), SessionError> {
        if let Some(record) = self.load(key)? {
            info!(
                participant = key.participant_id(),
                session = key.session_number(),
                indices = ?record.task_indices,
                "replaying stored session record"
            );
            let tasks = record
                .task_indices
                .iter()
                .filter_map(|&i| pool.get(i).cloned())
                .collect();
            return Ok((tasks, record.task_indices));
        }

        let exclude = self.used_indices(key.participant_id(), key.session_number());
        let (tasks, indices) = select_active_tasks(pool, count, &exclude, rng);

        let record = SessionRecord {
            participant_id: key.participant_id().to_string(),
            session_number: key.session_number(),
            task_indices: indices.clone(),
            feedback_condition: resolve_condition(key.participant_id(), key.session_number()),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        if let Err(e) = self.save(&record) {
            error!("failed to persist session record, continuing without replay: {e}");
        }

        Ok((tasks, indices))
    }
}
