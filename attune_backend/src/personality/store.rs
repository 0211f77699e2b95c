use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use super::topics::TopicInterest;
use super::{PersonalityTrait, TraitScores};
use crate::database::parse_rfc3339;

/// A copy of the trait scores at a point in time, appended after every
/// persisted transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    /// What caused the update ("interaction", "feedback", "defaults")
    pub trigger: String,
    pub traits: TraitScores,
}

/// Durable backing for the personality profile and topic interests.
pub struct PersonalityStore {
    conn: Mutex<Connection>,
}

impl PersonalityStore {
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Personality database lock poisoned: {}", e))
    }

    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open personality database")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS personality_traits (
                trait_name TEXT PRIMARY KEY,
                trait_value REAL NOT NULL,
                last_updated TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS topic_interests (
                topic TEXT PRIMARY KEY,
                interest_level REAL NOT NULL,
                mention_count INTEGER NOT NULL,
                last_mentioned TEXT NOT NULL
            )"#,
            [],
        )?;

        // Trait evolution over time
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS persona_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                captured_at TEXT NOT NULL,
                trigger TEXT NOT NULL,
                traits_json TEXT NOT NULL
            )"#,
            [],
        )?;

        Ok(())
    }

    /// Stored trait rows, or `None` when nothing has been persisted yet.
    /// Unknown trait names are ignored; missing traits keep their default.
    pub fn load_traits(&self) -> Result<Option<TraitScores>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT trait_name, trait_value FROM personality_traits")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut scores = TraitScores::default();
        for (name, value) in rows {
            match PersonalityTrait::from_name(&name) {
                Some(personality_trait) => scores.set(personality_trait, value),
                None => tracing::debug!("Ignoring unknown trait '{}'", name),
            }
        }
        Ok(Some(scores))
    }

    pub fn save_traits(&self, scores: &TraitScores) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for (personality_trait, value) in scores.iter() {
            tx.execute(
                "INSERT OR REPLACE INTO personality_traits (trait_name, trait_value, last_updated)
                 VALUES (?1, ?2, ?3)",
                params![personality_trait.name(), value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn save_snapshot(&self, trigger: &str, scores: &TraitScores) -> Result<i64> {
        let traits_json =
            serde_json::to_string(scores).context("Failed to serialize persona traits")?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO persona_history (captured_at, trigger, traits_json) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), trigger, traits_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent snapshots first.
    pub fn get_persona_history(&self, limit: usize) -> Result<Vec<PersonaSnapshot>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, captured_at, trigger, traits_json
             FROM persona_history
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let snapshots = stmt
            .query_map([limit as i64], |row| {
                let traits_json: String = row.get(3)?;
                Ok(PersonaSnapshot {
                    id: row.get(0)?,
                    captured_at: parse_rfc3339(row.get::<_, String>(1)?, 1)?,
                    trigger: row.get(2)?,
                    traits: serde_json::from_str(&traits_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    pub fn get_topic(&self, topic: &str) -> Result<Option<TopicInterest>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT topic, interest_level, mention_count, last_mentioned
             FROM topic_interests WHERE topic = ?1",
            [topic],
            row_to_topic,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn upsert_topic(&self, interest: &TopicInterest) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO topic_interests (topic, interest_level, mention_count, last_mentioned)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                interest.topic,
                interest.interest_level,
                interest.mention_count,
                interest.last_mentioned.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn all_topics(&self) -> Result<Vec<TopicInterest>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT topic, interest_level, mention_count, last_mentioned
             FROM topic_interests
             ORDER BY interest_level DESC, mention_count DESC",
        )?;
        let topics = stmt
            .query_map([], row_to_topic)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(topics)
    }

    pub fn favorite_topics(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT topic FROM topic_interests
             ORDER BY interest_level DESC, mention_count DESC
             LIMIT ?1",
        )?;
        let topics = stmt
            .query_map([limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(topics)
    }
}

fn row_to_topic(row: &rusqlite::Row<'_>) -> rusqlite::Result<TopicInterest> {
    Ok(TopicInterest {
        topic: row.get(0)?,
        interest_level: row.get(1)?,
        mention_count: row.get(2)?,
        last_mentioned: parse_rfc3339(row.get::<_, String>(3)?, 3)?,
    })
}
