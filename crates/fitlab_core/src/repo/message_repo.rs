//! Message and conversation repositories.
//!
//! # Responsibility
//! - Persist messages (timestamp-ordered within a conversation) and
//!   conversation headers (activity-ordered).
//! - Expose the unread-count helpers the message service uses to keep
//!   `conversations.unread_count` an exact derived value.
//!
//! # Invariants
//! - Message type names decode strictly; unknown names are `InvalidData`.
//! - Every write that can change a conversation's unread total recounts
//!   `conversations.unread_count` in the same mutation: message writes
//!   and deletes reconcile the owning header, and `put_conversation`
//!   overrides a caller-supplied stale count.

use crate::db::CacheDb;
use crate::model::codec::{decode_string_list, encode_string_list};
use crate::model::records::{Conversation, Message, MessageType};
use crate::model::RecordKind;
use crate::repo::{
    bool_to_int, collect_parsed, ensure_connection_ready, int_to_bool, DecodePolicy, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

const MESSAGE_SELECT_SQL: &str = "SELECT
    id,
    conversation_id,
    sender_id,
    receiver_id,
    content,
    timestamp,
    read,
    type,
    media_url,
    reply_to
FROM messages";

const CONVERSATION_SELECT_SQL: &str = "SELECT
    id,
    participant_ids,
    last_message_id,
    unread_count,
    last_activity
FROM conversations";

const MESSAGE_COLUMNS: &[&str] = &["id", "conversation_id", "timestamp", "read", "type"];
const CONVERSATION_COLUMNS: &[&str] = &["id", "participant_ids", "unread_count", "last_activity"];

/// SQLite-backed message repository.
pub struct SqliteMessageRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteMessageRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "messages", MESSAGE_COLUMNS))?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Raw insert-or-replace of one message row.
    ///
    /// Recounts the owning conversation's `unread_count` in the same
    /// transaction; `last_message_id`/`last_activity` stay with
    /// `MessageService`, which owns delivery ordering.
    pub fn put_message(&self, message: &Message) -> RepoResult<()> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                insert_message(&tx, message)?;
                reconcile_unread(&tx, &message.conversation_id)?;
                tx.commit()?;
                Ok(())
            },
        )
    }

    /// Batch insert-or-replace; all rows land atomically and every
    /// touched conversation's unread counter is recounted.
    pub fn put_messages(&self, messages: &[Message]) -> RepoResult<()> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                let mut touched = BTreeSet::new();
                for message in messages {
                    insert_message(&tx, message)?;
                    touched.insert(message.conversation_id.as_str());
                }
                for conversation_id in touched {
                    reconcile_unread(&tx, conversation_id)?;
                }
                tx.commit()?;
                Ok(())
            },
        )
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_message(&self, id: &str) -> RepoResult<Message> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_message_row(row),
                None => Err(RepoError::not_found(RecordKind::Message, id)),
            }
        })
    }

    /// Conversation transcript, oldest first.
    pub fn messages_in_conversation(&self, conversation_id: &str) -> RepoResult<Vec<Message>> {
        self.db
            .with_conn(|conn| query_messages_in_conversation(conn, self.policy, conversation_id))
    }

    pub fn messages_by_sender(&self, sender_id: &str) -> RepoResult<Vec<Message>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT_SQL} WHERE sender_id = ?1 ORDER BY timestamp ASC, id ASC;"
            ))?;
            let rows = stmt.query([sender_id])?;
            collect_parsed(rows, self.policy, RecordKind::Message, parse_message_row)
        })
    }

    pub fn unread_messages(&self) -> RepoResult<Vec<Message>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT_SQL} WHERE read = 0 ORDER BY timestamp ASC, id ASC;"
            ))?;
            let rows = stmt.query([])?;
            collect_parsed(rows, self.policy, RecordKind::Message, parse_message_row)
        })
    }

    /// Idempotent delete; returns whether a row was removed. An unread
    /// message leaving the table recounts its conversation's counter.
    pub fn delete_message(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                let owner: Option<String> = {
                    let mut stmt =
                        tx.prepare("SELECT conversation_id FROM messages WHERE id = ?1;")?;
                    let mut rows = stmt.query([id])?;
                    match rows.next()? {
                        Some(row) => Some(row.get(0)?),
                        None => None,
                    }
                };
                let changed = tx.execute("DELETE FROM messages WHERE id = ?1;", [id])?;
                if let Some(conversation_id) = owner {
                    reconcile_unread(&tx, &conversation_id)?;
                }
                tx.commit()?;
                Ok(changed > 0)
            },
        )
    }

    /// Delete-by-foreign-key; returns the count removed.
    pub fn delete_messages_in_conversation(&self, conversation_id: &str) -> RepoResult<usize> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM messages WHERE conversation_id = ?1;",
                    [conversation_id],
                )?;
                reconcile_unread(&tx, conversation_id)?;
                tx.commit()?;
                Ok(removed)
            },
        )
    }
}

/// SQLite-backed conversation repository.
pub struct SqliteConversationRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteConversationRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "conversations", CONVERSATION_COLUMNS))?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Insert-or-replace, with `unread_count` reconciled to the exact
    /// unread-message count regardless of the caller-supplied value.
    pub fn put_conversation(&self, conversation: &Conversation) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Conversation], |conn| {
            insert_conversation_reconciled(conn, conversation)
        })
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_conversations(&self, conversations: &[Conversation]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Conversation], |conn| {
            let tx = conn.transaction()?;
            for conversation in conversations {
                insert_conversation_reconciled(&tx, conversation)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_conversation(&self, id: &str) -> RepoResult<Conversation> {
        self.db.with_conn(|conn| {
            find_conversation(conn, id)?
                .ok_or_else(|| RepoError::not_found(RecordKind::Conversation, id))
        })
    }

    /// All conversations, most recent activity first.
    pub fn list_conversations(&self) -> RepoResult<Vec<Conversation>> {
        self.db
            .with_conn(|conn| query_conversations(conn, self.policy))
    }

    /// Conversations still carrying unread messages, most recent first.
    pub fn unread_conversations(&self) -> RepoResult<Vec<Conversation>> {
        self.db
            .with_conn(|conn| query_unread_conversations(conn, self.policy))
    }

    /// Conversations that include the given participant.
    ///
    /// Participant lists are JSON-encoded in storage, so the membership
    /// test runs on the decoded shape rather than on a substring match.
    pub fn conversations_for_participant(&self, athlete_id: &str) -> RepoResult<Vec<Conversation>> {
        self.db.with_conn(|conn| {
            let all = query_conversations(conn, self.policy)?;
            Ok(all
                .into_iter()
                .filter(|conversation| {
                    conversation
                        .participant_ids
                        .iter()
                        .any(|participant| participant == athlete_id)
                })
                .collect())
        })
    }

    /// Targeted counter update; fails with `NotFound` when absent.
    pub fn set_unread_count(&self, id: &str, unread_count: i64) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Conversation], |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET unread_count = ?2 WHERE id = ?1;",
                params![id, unread_count],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found(RecordKind::Conversation, id));
            }
            Ok(())
        })
    }

    /// Idempotent delete of the header row only. Use
    /// `MessageService::remove_conversation` for the explicit cascade.
    pub fn delete_conversation(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::Conversation], |conn| {
            let changed = conn.execute("DELETE FROM conversations WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }
}

pub(crate) fn insert_message(conn: &Connection, message: &Message) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO messages (
            id, conversation_id, sender_id, receiver_id, content,
            timestamp, read, type, media_url, reply_to
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            message.id,
            message.conversation_id,
            message.sender_id,
            message.receiver_id,
            message.content,
            message.timestamp,
            bool_to_int(message.read),
            message_type_to_db(message.kind),
            message.media_url,
            message.reply_to,
        ],
    )?;
    Ok(())
}

pub(crate) fn query_messages_in_conversation(
    conn: &Connection,
    policy: DecodePolicy,
    conversation_id: &str,
) -> RepoResult<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT_SQL} WHERE conversation_id = ?1 ORDER BY timestamp ASC, id ASC;"
    ))?;
    let rows = stmt.query([conversation_id])?;
    collect_parsed(rows, policy, RecordKind::Message, parse_message_row)
}

/// Exact unread count for one conversation, straight from the rows.
pub(crate) fn unread_count(conn: &Connection, conversation_id: &str) -> RepoResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1 AND read = 0;",
        [conversation_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Recounts one conversation's unread counter from its message rows.
///
/// A no-op when the header row does not exist, so raw message writes stay
/// legal for transcripts cached ahead of their conversation.
pub(crate) fn reconcile_unread(conn: &Connection, conversation_id: &str) -> RepoResult<()> {
    conn.execute(
        "UPDATE conversations
         SET unread_count = (
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = ?1 AND read = 0
         )
         WHERE id = ?1;",
        [conversation_id],
    )?;
    Ok(())
}

/// Flips every message in the conversation to read; returns rows changed.
pub(crate) fn mark_all_read(conn: &Connection, conversation_id: &str) -> RepoResult<usize> {
    let changed = conn.execute(
        "UPDATE messages SET read = 1 WHERE conversation_id = ?1 AND read = 0;",
        [conversation_id],
    )?;
    Ok(changed)
}

pub(crate) fn insert_conversation_reconciled(
    conn: &Connection,
    conversation: &Conversation,
) -> RepoResult<()> {
    let exact_unread = unread_count(conn, &conversation.id)?;
    conn.execute(
        "INSERT OR REPLACE INTO conversations (
            id, participant_ids, last_message_id, unread_count, last_activity
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            conversation.id,
            encode_string_list(&conversation.participant_ids),
            conversation.last_message_id,
            exact_unread,
            conversation.last_activity,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_conversation(conn: &Connection, id: &str) -> RepoResult<Option<Conversation>> {
    let mut stmt = conn.prepare(&format!("{CONVERSATION_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_conversation_row(row)?));
    }
    Ok(None)
}

pub(crate) fn query_conversations(
    conn: &Connection,
    policy: DecodePolicy,
) -> RepoResult<Vec<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "{CONVERSATION_SELECT_SQL} ORDER BY last_activity DESC, id ASC;"
    ))?;
    let rows = stmt.query([])?;
    collect_parsed(rows, policy, RecordKind::Conversation, parse_conversation_row)
}

pub(crate) fn query_unread_conversations(
    conn: &Connection,
    policy: DecodePolicy,
) -> RepoResult<Vec<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "{CONVERSATION_SELECT_SQL} WHERE unread_count > 0 ORDER BY last_activity DESC, id ASC;"
    ))?;
    let rows = stmt.query([])?;
    collect_parsed(rows, policy, RecordKind::Conversation, parse_conversation_row)
}

/// Conversation header maintenance run after a message lands.
pub(crate) fn touch_conversation(
    conn: &Connection,
    conversation_id: &str,
    last_message_id: &str,
    last_activity: i64,
) -> RepoResult<()> {
    let exact_unread = unread_count(conn, conversation_id)?;
    let changed = conn.execute(
        "UPDATE conversations
         SET
            last_message_id = ?2,
            last_activity = MAX(last_activity, ?3),
            unread_count = ?4
         WHERE id = ?1;",
        params![conversation_id, last_message_id, last_activity, exact_unread],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(RecordKind::Conversation, conversation_id));
    }
    Ok(())
}

pub(crate) fn parse_message_row(row: &Row<'_>) -> RepoResult<Message> {
    let read: i64 = row.get("read")?;
    let type_text: String = row.get("type")?;
    Ok(Message {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        sender_id: row.get("sender_id")?,
        receiver_id: row.get("receiver_id")?,
        content: row.get("content")?,
        timestamp: row.get("timestamp")?,
        read: int_to_bool(read, "messages", "read")?,
        kind: parse_message_type(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid message type `{type_text}` in messages.type"))
        })?,
        media_url: row.get("media_url")?,
        reply_to: row.get("reply_to")?,
    })
}

pub(crate) fn parse_conversation_row(row: &Row<'_>) -> RepoResult<Conversation> {
    let participants: Option<String> = row.get("participant_ids")?;
    Ok(Conversation {
        id: row.get("id")?,
        participant_ids: decode_string_list(
            "conversations.participant_ids",
            participants.as_deref(),
        ),
        last_message_id: row.get("last_message_id")?,
        unread_count: row.get("unread_count")?,
        last_activity: row.get("last_activity")?,
    })
}

pub(crate) fn message_type_to_db(kind: MessageType) -> &'static str {
    match kind {
        MessageType::Text => "text",
        MessageType::Image => "image",
        MessageType::Video => "video",
        MessageType::Audio => "audio",
        MessageType::File => "file",
    }
}

pub(crate) fn parse_message_type(value: &str) -> Option<MessageType> {
    match value {
        "text" => Some(MessageType::Text),
        "image" => Some(MessageType::Image),
        "video" => Some(MessageType::Video),
        "audio" => Some(MessageType::Audio),
        "file" => Some(MessageType::File),
        _ => None,
    }
}
