use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::open_db_connection;

/// Trailing window covered by [`SessionLog::weekly_report`].
pub const REPORT_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// One pose held to the end of its timer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseCompletion {
    pub user_id: String,
    pub pose_name: String,
    pub duration_secs: u32,
    pub is_correct: bool,
    /// Unix seconds.
    pub completed_at: i64,
}

impl PoseCompletion {
    pub fn feedback_text(&self) -> String {
        format!(
            "Completed {} for {} seconds",
            self.pose_name, self.duration_secs
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseCount {
    pub pose_name: String,
    pub completions: u32,
}

pub trait SessionLog: Send {
    fn record(&mut self, entry: &PoseCompletion) -> Result<()>;

    /// Completions for `user_id` at or after `since`, oldest first.
    fn completions_since(&self, user_id: &str, since: i64) -> Result<Vec<PoseCompletion>>;

    /// Per-pose completion counts over the seven days before `now`, most
    /// frequent first, ties by name.
    fn weekly_report(&self, user_id: &str, now: i64) -> Result<Vec<PoseCount>> {
        let entries = self.completions_since(user_id, now - REPORT_WINDOW_SECS)?;
        Ok(tally(
            entries
                .iter()
                .filter(|e| e.completed_at <= now)
                .map(|e| e.pose_name.as_str()),
        ))
    }
}

fn tally<'a>(names: impl Iterator<Item = &'a str>) -> Vec<PoseCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    let mut out: Vec<PoseCount> = counts
        .into_iter()
        .map(|(pose_name, completions)| PoseCount {
            pose_name: pose_name.to_string(),
            completions,
        })
        .collect();
    out.sort_by(|a, b| {
        b.completions
            .cmp(&a.completions)
            .then_with(|| a.pose_name.cmp(&b.pose_name))
    });
    out
}

pub struct SqliteSessionLog {
    conn: Connection,
}

impl SqliteSessionLog {
    /// Open (or create) the log. `file:` URIs are opened as URIs, which is how
    /// tests get a shared in-memory database.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = open_db_connection(db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_logs (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL,
              pose_name TEXT NOT NULL,
              duration INTEGER NOT NULL,
              feedback TEXT NOT NULL,
              is_correct INTEGER NOT NULL,
              created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_logs_user_time
              ON session_logs(user_id, created_at);
            "#,
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM session_logs", [], |row| row.get(0))?;
        u64::try_from(n).map_err(|_| anyhow!("corrupt session log: negative row count"))
    }
}

impl SessionLog for SqliteSessionLog {
    fn record(&mut self, entry: &PoseCompletion) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_logs(user_id, pose_name, duration, feedback, is_correct, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.user_id,
                entry.pose_name,
                entry.duration_secs,
                entry.feedback_text(),
                entry.is_correct,
                entry.completed_at
            ],
        )?;
        log::debug!(
            "logged {} for {} ({} s)",
            entry.pose_name,
            entry.user_id,
            entry.duration_secs
        );
        Ok(())
    }

    fn completions_since(&self, user_id: &str, since: i64) -> Result<Vec<PoseCompletion>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, pose_name, duration, is_correct, created_at
            FROM session_logs
            WHERE user_id = ?1 AND created_at >= ?2
            ORDER BY created_at ASC, id ASC
            "#,
        )?;
        let mut rows = stmt.query(params![user_id, since])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(PoseCompletion {
                user_id: row.get(0)?,
                pose_name: row.get(1)?,
                duration_secs: row.get(2)?,
                is_correct: row.get(3)?,
                completed_at: row.get(4)?,
            });
        }
        Ok(out)
    }

    fn weekly_report(&self, user_id: &str, now: i64) -> Result<Vec<PoseCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT pose_name, COUNT(*) AS completions
            FROM session_logs
            WHERE user_id = ?1 AND created_at >= ?2 AND created_at <= ?3
            GROUP BY pose_name
            ORDER BY completions DESC, pose_name ASC
            "#,
        )?;
        let mut rows = stmt.query(params![user_id, now - REPORT_WINDOW_SECS, now])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(PoseCount {
                pose_name: row.get(0)?,
                completions: row.get(1)?,
            });
        }
        Ok(out)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemorySessionLog {
    entries: Vec<PoseCompletion>,
}

impl InMemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PoseCompletion] {
        &self.entries
    }
}

impl SessionLog for InMemorySessionLog {
    fn record(&mut self, entry: &PoseCompletion) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn completions_since(&self, user_id: &str, since: i64) -> Result<Vec<PoseCompletion>> {
        let mut out: Vec<PoseCompletion> = self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.completed_at >= since)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.completed_at);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_memory_uri;

    fn done(user: &str, pose: &str, at: i64) -> PoseCompletion {
        PoseCompletion {
            user_id: user.to_string(),
            pose_name: pose.to_string(),
            duration_secs: 32,
            is_correct: true,
            completed_at: at,
        }
    }

    fn seed(log: &mut dyn SessionLog, now: i64) {
        log.record(&done("u1", "Tree Pose", now - 100)).unwrap();
        log.record(&done("u1", "Mountain Pose", now - 200)).unwrap();
        log.record(&done("u1", "Tree Pose", now - 3 * 86_400)).unwrap();
        log.record(&done("u1", "Warrior II", now - 8 * 86_400)).unwrap();
        log.record(&done("u2", "Tree Pose", now - 50)).unwrap();
    }

    #[test]
    fn feedback_text_matches_log_format() {
        assert_eq!(
            done("u", "Boat Pose", 0).feedback_text(),
            "Completed Boat Pose for 32 seconds"
        );
    }

    #[test]
    fn in_memory_weekly_report() {
        let now = 1_700_000_000;
        let mut log = InMemorySessionLog::new();
        seed(&mut log, now);
        let report = log.weekly_report("u1", now).unwrap();
        assert_eq!(
            report,
            vec![
                PoseCount {
                    pose_name: "Tree Pose".into(),
                    completions: 2
                },
                PoseCount {
                    pose_name: "Mountain Pose".into(),
                    completions: 1
                },
            ]
        );
        assert!(log.weekly_report("nobody", now).unwrap().is_empty());
    }

    #[test]
    fn sqlite_store_matches_in_memory_store() {
        let now = 1_700_000_000;
        let mut sqlite = SqliteSessionLog::open(&shared_memory_uri()).unwrap();
        let mut memory = InMemorySessionLog::new();
        seed(&mut sqlite, now);
        seed(&mut memory, now);
        assert_eq!(sqlite.count().unwrap(), 5);
        assert_eq!(
            sqlite.weekly_report("u1", now).unwrap(),
            memory.weekly_report("u1", now).unwrap()
        );
        let since = sqlite.completions_since("u1", now - 86_400).unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].pose_name, "Mountain Pose");
        assert!(since[0].is_correct);
    }

    #[test]
    fn weekly_report_ignores_completions_after_now() {
        let now = 1_700_000_000;
        let mut sqlite = SqliteSessionLog::open(&shared_memory_uri()).unwrap();
        let mut memory = InMemorySessionLog::new();
        let logs: [&mut dyn SessionLog; 2] = [&mut sqlite, &mut memory];
        for log in logs {
            log.record(&done("u1", "Chair Pose", now)).unwrap();
            log.record(&done("u1", "Boat Pose", now + 1)).unwrap();
            log.record(&done("u1", "Boat Pose", now + 86_400)).unwrap();
        }
        let expected = vec![PoseCount {
            pose_name: "Chair Pose".into(),
            completions: 1,
        }];
        assert_eq!(sqlite.weekly_report("u1", now).unwrap(), expected);
        assert_eq!(memory.weekly_report("u1", now).unwrap(), expected);
    }
}
