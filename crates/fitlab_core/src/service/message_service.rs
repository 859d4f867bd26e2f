//! Messaging workflow: delivery, read state, and conversation teardown.
//!
//! # Responsibility
//! - Land messages into pre-existing conversations and keep the header
//!   (last message, activity time, unread counter) exact.
//! - Bulk read-marking and the explicit message-plus-header cascade.
//!
//! # Invariants
//! - A conversation is never created implicitly; sending into an absent
//!   one is `NotFound`.
//! - `unread_count` is recounted from the rows after every change, never
//!   incremented or decremented blindly.

use crate::db::CacheDb;
use crate::model::records::Message;
use crate::model::RecordKind;
use crate::repo::message_repo::{
    find_conversation, insert_message, mark_all_read, touch_conversation, unread_count,
};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::info;
use rusqlite::params;

/// Orchestrates message writes and conversation header upkeep.
pub struct MessageService<'db> {
    db: &'db CacheDb,
}

impl<'db> MessageService<'db> {
    /// Constructs the service from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| {
            ensure_connection_ready(conn, "messages", &["id", "conversation_id", "read"])?;
            ensure_connection_ready(conn, "conversations", &["id", "unread_count", "last_activity"])
        })?;
        Ok(Self { db })
    }

    /// Delivers a message into its conversation.
    ///
    /// The conversation must already exist; its header is updated in the
    /// same transaction as the message row.
    pub fn send_message(&self, message: &Message) -> RepoResult<()> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                if find_conversation(&tx, &message.conversation_id)?.is_none() {
                    return Err(RepoError::not_found(
                        RecordKind::Conversation,
                        message.conversation_id.as_str(),
                    ));
                }
                insert_message(&tx, message)?;
                touch_conversation(&tx, &message.conversation_id, &message.id, message.timestamp)?;
                tx.commit()?;
                Ok(())
            },
        )
    }

    /// Marks every message in the conversation read and zeroes the
    /// counter from an exact recount. Returns the number of messages
    /// flipped.
    pub fn mark_conversation_read(&self, conversation_id: &str) -> RepoResult<usize> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                if find_conversation(&tx, conversation_id)?.is_none() {
                    return Err(RepoError::not_found(RecordKind::Conversation, conversation_id));
                }
                let flipped = mark_all_read(&tx, conversation_id)?;
                let exact = unread_count(&tx, conversation_id)?;
                tx.execute(
                    "UPDATE conversations SET unread_count = ?2 WHERE id = ?1;",
                    params![conversation_id, exact],
                )?;
                tx.commit()?;
                Ok(flipped)
            },
        )
    }

    /// Removes a conversation and its messages in one transaction.
    ///
    /// Idempotent: removing an absent conversation is a no-op returning
    /// `false`. Returns whether the header row existed.
    pub fn remove_conversation(&self, conversation_id: &str) -> RepoResult<bool> {
        self.db.mutate(
            &[RecordKind::Message, RecordKind::Conversation],
            |conn| {
                let tx = conn.transaction()?;
                let messages_removed = tx.execute(
                    "DELETE FROM messages WHERE conversation_id = ?1;",
                    [conversation_id],
                )?;
                let header_removed =
                    tx.execute("DELETE FROM conversations WHERE id = ?1;", [conversation_id])?;
                tx.commit()?;
                if header_removed > 0 {
                    info!(
                        "event=conversation_removed module=service status=ok conversation_id={conversation_id} messages_removed={messages_removed}"
                    );
                }
                Ok(header_removed > 0)
            },
        )
    }
}
