//! Typed rows for the BlackPulse message store and the read-only queries over it.
//!
//! Table schema (only the columns read here):
//! ```sql
//! CREATE TABLE messages (
//!     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//!     content       TEXT,
//!     timestamp     DATETIME,
//!     is_private    INTEGER DEFAULT 0,
//!     private_key   TEXT DEFAULT NULL,
//!     user_id       INTEGER DEFAULT NULL,
//!     comment_count INTEGER DEFAULT 0
//! );
//! CREATE TABLE comments (
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     message_id INTEGER,
//!     username   TEXT NOT NULL,
//!     text       TEXT NOT NULL,
//!     likes      INTEGER DEFAULT 0,
//!     time       DATETIME,
//!     pid        INTEGER DEFAULT NULL
//! );
//! ```
//!
//! `comment_count` is maintained by the ingestion process and can drift from the
//! real number of comment rows. It is only used as a hint for whether to look.

use crate::error::ExportError;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row};

const MESSAGE_COLUMNS: &str =
    "SELECT id, content, private_key, is_private, timestamp, user_id, comment_count FROM messages";

/// A row of the `messages` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub content: Option<String>,
    pub private_key: Option<String>,
    pub is_private: bool,
    /// Stored as-is; never parsed as a date.
    pub timestamp: Option<String>,
    pub user_id: Option<i64>,
    pub comment_count: i64,
}

impl Message {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            private_key: row.get(2)?,
            is_private: row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0,
            timestamp: opaque(row.get_ref(4)?),
            user_id: row.get(5)?,
            comment_count: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        })
    }

    /// Body text, or `None` when the row has no usable content.
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Private key, ignoring empty strings.
    pub fn key(&self) -> Option<&str> {
        self.private_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// A row of the `comments` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub message_id: i64,
    pub username: String,
    pub text: String,
    pub likes: i64,
    pub time: Option<String>,
    /// Parent comment when this is a reply. Not resolved or validated.
    pub pid: Option<i64>,
}

impl Comment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            message_id: row.get(1)?,
            username: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            likes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            time: opaque(row.get_ref(5)?),
            pid: row.get(6)?,
        })
    }
}

/// Textual form of a column whose type is not interpreted.
fn opaque(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Which messages to fetch.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    All,
    /// Looked up one by one, in the given order. Duplicates are kept.
    ByIds(Vec<i64>),
}

#[derive(Debug, Default)]
pub struct MessageListing {
    pub messages: Vec<Message>,
    /// Requested ids with no matching row, in request order.
    pub missing: Vec<i64>,
}

/// Read-only access to the message store.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn list_messages(&self, filter: &MessageFilter) -> Result<MessageListing, ExportError> {
        match filter {
            MessageFilter::All => {
                let sql = format!("{MESSAGE_COLUMNS} ORDER BY id ASC");
                let mut stmt = self
                    .conn
                    .prepare(&sql)
                    .map_err(|e| ExportError::store_read("preparing message query", e))?;
                let messages = stmt
                    .query_map([], Message::from_row)
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                    .map_err(|e| ExportError::store_read("reading messages", e))?;
                Ok(MessageListing {
                    messages,
                    missing: Vec::new(),
                })
            }
            MessageFilter::ByIds(ids) => {
                let sql = format!("{MESSAGE_COLUMNS} WHERE id = ?");
                let mut stmt = self
                    .conn
                    .prepare(&sql)
                    .map_err(|e| ExportError::store_read("preparing message lookup", e))?;
                let mut listing = MessageListing::default();
                for &id in ids {
                    let found = stmt
                        .query_row([id], Message::from_row)
                        .optional()
                        .map_err(|e| {
                            ExportError::store_read(format!("looking up message {id}"), e)
                        })?;
                    match found {
                        Some(msg) => listing.messages.push(msg),
                        None => listing.missing.push(id),
                    }
                }
                Ok(listing)
            }
        }
    }

    pub fn list_comments(&self, message_id: i64) -> Result<Vec<Comment>, ExportError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, message_id, username, text, likes, time, pid \
                 FROM comments WHERE message_id = ? ORDER BY id ASC",
            )
            .map_err(|e| ExportError::store_read("preparing comment query", e))?;
        stmt.query_map([message_id], Comment::from_row)
            .and_then(|rows| rows.collect())
            .map_err(|e| {
                ExportError::store_read(format!("reading comments of message {message_id}"), e)
            })
    }

    /// Comments for a message, skipping the query when its counter says there are none.
    pub fn comments_for(&self, msg: &Message) -> Result<Vec<Comment>, ExportError> {
        if msg.comment_count > 0 {
            self.list_comments(msg.id)
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (
                id INTEGER PRIMARY KEY, content TEXT, private_key TEXT,
                is_private INTEGER DEFAULT 0, timestamp DATETIME, user_id INTEGER,
                comment_count INTEGER DEFAULT 0
            );
            CREATE TABLE comments (
                id INTEGER PRIMARY KEY, message_id INTEGER, username TEXT, text TEXT,
                likes INTEGER DEFAULT 0, time DATETIME, pid INTEGER
            );
            INSERT INTO messages VALUES (7, 'seven', NULL, 0, '2024-01-02 10:00:00', NULL, 0);
            INSERT INTO messages VALUES (2, NULL, 'k3y', 1, 1700000000, 4, 3);
            INSERT INTO messages VALUES (5, '', '', NULL, NULL, NULL, NULL);
            INSERT INTO comments VALUES (3, 2, 'carol', 'third', 0, '2024-01-03', 1);
            INSERT INTO comments VALUES (1, 2, 'alice', 'first', 2, '2024-01-01', NULL);
            INSERT INTO comments VALUES (2, 2, 'bob', 'second', 1, '2024-01-02', NULL);
            INSERT INTO comments VALUES (9, 7, 'dave', 'elsewhere', 0, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn all_messages_ascending() {
        let store = Store::new(fixture());
        let listing = store.list_messages(&MessageFilter::All).unwrap();
        let ids: Vec<i64> = listing.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 5, 7]);
        assert!(listing.missing.is_empty());
    }

    #[test]
    fn decodes_loose_columns() {
        let store = Store::new(fixture());
        let listing = store.list_messages(&MessageFilter::All).unwrap();
        let m2 = &listing.messages[0];
        assert!(m2.is_private);
        assert_eq!(m2.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(m2.key(), Some("k3y"));
        assert_eq!(m2.body(), None);

        let m5 = &listing.messages[1];
        assert!(!m5.is_private);
        assert_eq!(m5.timestamp, None);
        assert_eq!(m5.comment_count, 0);
        assert_eq!(m5.key(), None);
        assert_eq!(m5.body(), None);
    }

    #[test]
    fn by_ids_keeps_request_order_and_reports_missing() {
        let store = Store::new(fixture());
        let listing = store
            .list_messages(&MessageFilter::ByIds(vec![7, 999, 2, 7]))
            .unwrap();
        let ids: Vec<i64> = listing.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![7, 2, 7]);
        assert_eq!(listing.missing, vec![999]);
    }

    #[test]
    fn comments_sorted_by_id() {
        let store = Store::new(fixture());
        let comments = store.list_comments(2).unwrap();
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(comments[2].pid, Some(1));
        assert_eq!(comments[0].pid, None);
    }

    #[test]
    fn stale_zero_counter_skips_lookup() {
        // message 7 has a comment row but a counter of zero
        let store = Store::new(fixture());
        let listing = store.list_messages(&MessageFilter::ByIds(vec![7])).unwrap();
        assert!(store.comments_for(&listing.messages[0]).unwrap().is_empty());
    }

    #[test]
    fn missing_table_is_store_read_error() {
        let store = Store::new(Connection::open_in_memory().unwrap());
        let err = store.list_messages(&MessageFilter::All).unwrap_err();
        assert!(matches!(err, ExportError::StoreRead { .. }));
    }
}
