use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use crate::emotion::Emotion;

pub const MIN_FEEDBACK_SCORE: u8 = 1;
pub const MAX_FEEDBACK_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_db_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn from_db(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub context: String,
}

/// A persisted chat message. Messages are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub emotion: Emotion,
    pub emotion_confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub is_long_term: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFeedback {
    pub id: i64,
    pub message_id: i64,
    pub score: u8,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of conversations, their messages and feedback on them.
pub struct ChatDatabase {
    conn: Mutex<Connection>,
}

impl ChatDatabase {
    /// Helper to lock the connection
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Create or open the database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open chat database")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                conversation_context TEXT
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                emotion TEXT NOT NULL,
                emotion_confidence REAL NOT NULL,
                timestamp TEXT NOT NULL,
                is_long_term INTEGER DEFAULT 0,
                FOREIGN KEY (conversation_id) REFERENCES conversations (id)
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS message_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                feedback_score INTEGER,
                feedback_text TEXT,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (message_id) REFERENCES messages (id)
            )"#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id)",
            [],
        )?;

        Ok(())
    }

    /// Start a new conversation with optional free-text context.
    pub fn create_conversation(&self, context: Option<&str>) -> Result<Conversation> {
        let now = Utc::now();
        let context = context.unwrap_or_default().to_string();
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO conversations (created_at, conversation_context) VALUES (?1, ?2)",
            params![now.to_rfc3339(), context],
        )?;
        Ok(Conversation {
            id: conn.last_insert_rowid(),
            created_at: now,
            context,
        })
    }

    pub fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, created_at, conversation_context FROM conversations WHERE id = ?1",
            [id],
            |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    created_at: parse_rfc3339(row.get::<_, String>(1)?, 1)?,
                    context: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn get_conversation_context(&self, id: i64) -> Result<Option<String>> {
        Ok(self.get_conversation(id)?.map(|c| c.context))
    }

    /// Append a message and return its id.
    pub fn save_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
        emotion: Emotion,
        emotion_confidence: f64,
        is_long_term: bool,
    ) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, emotion, emotion_confidence, timestamp, is_long_term)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                conversation_id,
                role.as_db_str(),
                content,
                emotion.as_str(),
                emotion_confidence,
                Utc::now().to_rfc3339(),
                is_long_term as i64
            ],
        )
        .with_context(|| format!("Failed to save message in conversation {}", conversation_id))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_message(&self, id: i64) -> Result<Option<ChatMessage>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, conversation_id, role, content, emotion, emotion_confidence, timestamp, is_long_term
             FROM messages WHERE id = ?1",
            [id],
            row_to_message,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Messages of a conversation in insertion order.
    pub fn get_conversation_messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, emotion, emotion_confidence, timestamp, is_long_term
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY id ASC",
        )?;
        let messages = stmt
            .query_map([conversation_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Record feedback on a message. Scores outside 1..=5 are rejected.
    pub fn save_feedback(&self, message_id: i64, score: u8, text: Option<&str>) -> Result<i64> {
        if !(MIN_FEEDBACK_SCORE..=MAX_FEEDBACK_SCORE).contains(&score) {
            anyhow::bail!(
                "Feedback score {} outside {}..={}",
                score,
                MIN_FEEDBACK_SCORE,
                MAX_FEEDBACK_SCORE
            );
        }
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO message_feedback (message_id, feedback_score, feedback_text, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message_id,
                score,
                text.unwrap_or_default(),
                Utc::now().to_rfc3339()
            ],
        )
        .with_context(|| format!("Failed to save feedback for message {}", message_id))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_feedback_for_message(&self, message_id: i64) -> Result<Vec<MessageFeedback>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, message_id, feedback_score, feedback_text, timestamp
             FROM message_feedback
             WHERE message_id = ?1
             ORDER BY id ASC",
        )?;
        let feedback = stmt
            .query_map([message_id], |row| {
                Ok(MessageFeedback {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    score: row.get(2)?,
                    text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    timestamp: parse_rfc3339(row.get::<_, String>(4)?, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feedback)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: MessageRole::from_db(&row.get::<_, String>(2)?),
        content: row.get(3)?,
        emotion: Emotion::from_label(&row.get::<_, String>(4)?),
        emotion_confidence: row.get(5)?,
        timestamp: parse_rfc3339(row.get::<_, String>(6)?, 6)?,
        is_long_term: row.get::<_, i64>(7)? != 0,
    })
}

pub(crate) fn parse_rfc3339(
    value: String,
    column: usize,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, ChatDatabase) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = ChatDatabase::new(dir.path().join("chat.db")).expect("db init");
        (dir, db)
    }

    #[test]
    fn conversation_message_feedback_roundtrip() {
        let (_dir, db) = temp_db();

        let conversation = db
            .create_conversation(Some("evening check-in"))
            .expect("create conversation");
        assert_eq!(
            db.get_conversation_context(conversation.id).unwrap().as_deref(),
            Some("evening check-in")
        );

        let user_id = db
            .save_message(conversation.id, MessageRole::User, "I lost my job today", Emotion::Sadness, 0.93, false)
            .expect("save user message");
        let reply_id = db
            .save_message(conversation.id, MessageRole::Assistant, "That sounds hard.", Emotion::Sadness, 0.93, false)
            .expect("save reply");
        assert!(reply_id > user_id);

        let messages = db.get_conversation_messages(conversation.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].emotion, Emotion::Sadness);
        assert!(!messages[1].is_long_term);

        let feedback_id = db.save_feedback(reply_id, 5, Some("thanks")).expect("feedback");
        let feedback = db.get_feedback_for_message(reply_id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].id, feedback_id);
        assert_eq!(feedback[0].score, 5);
        assert_eq!(feedback[0].text, "thanks");
    }

    #[test]
    fn missing_context_reads_back_empty() {
        let (_dir, db) = temp_db();
        let conversation = db.create_conversation(None).unwrap();
        assert_eq!(db.get_conversation_context(conversation.id).unwrap().as_deref(), Some(""));
        assert!(db.get_conversation_context(conversation.id + 100).unwrap().is_none());
    }

    #[test]
    fn out_of_range_feedback_is_rejected() {
        let (_dir, db) = temp_db();
        let conversation = db.create_conversation(None).unwrap();
        let id = db
            .save_message(conversation.id, MessageRole::Assistant, "hi", Emotion::Neutral, 0.5, false)
            .unwrap();

        assert!(db.save_feedback(id, 0, None).is_err());
        assert!(db.save_feedback(id, 6, None).is_err());
        assert!(db.get_feedback_for_message(id).unwrap().is_empty());
    }

    #[test]
    fn orphan_rows_violate_foreign_keys() {
        let (_dir, db) = temp_db();
        assert!(db
            .save_message(42, MessageRole::User, "nobody home", Emotion::Neutral, 0.5, false)
            .is_err());
        assert!(db.save_feedback(42, 4, None).is_err());
    }
}
