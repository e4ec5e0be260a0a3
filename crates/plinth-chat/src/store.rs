//! Chat history persistence
//!
//! Saved chats live as JSONL files, one per chat: a tagged metadata line
//! followed by one line per message. The store is a passive collaborator: it
//! is driven by a subscriber of [`crate::events::SessionEvent`], never by the
//! reducer itself.

use crate::error::{Error, Result};
use crate::types::Message;
use crate::util;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Preview length in chat listings.
const PREVIEW_MAX_LEN: usize = 60;

/// A persisted chat: its identity plus the finalized message list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedChat {
    pub id: String,
    pub title: String,
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SavedChat {
    /// Create a new saved chat around a conversation snapshot.
    pub fn new(
        title: impl Into<String>,
        conversation_id: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            conversation_id: conversation_id.into(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the message snapshot and bump the updated timestamp.
    pub fn update_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// Chat file entry types for the JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatEntry {
    /// Chat metadata; always the first line
    Metadata {
        id: String,
        title: String,
        conversation_id: String,
        created_at: i64,
        updated_at: i64,
    },
    /// One message of the chat
    Message { message: Message, timestamp: i64 },
}

/// Summary of a saved chat, for history listings.
#[derive(Debug, Clone)]
pub struct ChatInfo {
    pub id: String,
    pub title: String,
    pub conversation_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub message_count: usize,
    /// Truncated text of the last message
    pub preview: String,
}

impl ChatInfo {
    /// Format the updated timestamp for display ("5 minutes ago").
    pub fn updated_display(&self) -> String {
        util::format_relative(self.updated_at)
    }
}

/// File-backed store for chat history.
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    /// The default chats directory under the platform data dir.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plinth")
            .join("chats")
    }

    /// Open the store at the default location.
    pub fn new() -> Self {
        Self::at(Self::default_dir())
    }

    /// Open the store at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn chat_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", id))
    }

    /// Write a chat, replacing any previous version of it.
    pub fn save(&self, chat: &SavedChat) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let file = File::create(self.chat_path(&chat.id))?;
        let mut writer = BufWriter::new(file);

        let metadata = ChatEntry::Metadata {
            id: chat.id.clone(),
            title: chat.title.clone(),
            conversation_id: chat.conversation_id.clone(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        };
        writeln!(writer, "{}", serde_json::to_string(&metadata)?)?;

        for message in &chat.messages {
            let entry = ChatEntry::Message {
                message: message.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            };
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load one chat by id.
    pub fn load(&self, id: &str) -> Result<SavedChat> {
        let path = self.chat_path(id);
        if !path.exists() {
            return Err(Error::ChatNotFound(id.to_string()));
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut chat: Option<SavedChat> = None;
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatEntry>(&line)? {
                ChatEntry::Metadata {
                    id,
                    title,
                    conversation_id,
                    created_at,
                    updated_at,
                } => {
                    chat = Some(SavedChat {
                        id,
                        title,
                        conversation_id,
                        messages: vec![],
                        created_at,
                        updated_at,
                    });
                }
                ChatEntry::Message { message, .. } => {
                    if let Some(ref mut chat) = chat {
                        chat.messages.push(message);
                    }
                }
            }
        }

        chat.ok_or_else(|| Error::ChatNotFound(id.to_string()))
    }

    /// List all saved chats, most recently updated first.
    pub fn list(&self) -> Result<Vec<ChatInfo>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut chats = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            match self.read_chat_info(&path) {
                Some(info) => chats.push(info),
                None => tracing::warn!("Skipping unreadable chat file: {}", path.display()),
            }
        }

        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    fn read_chat_info(&self, path: &PathBuf) -> Option<ChatInfo> {
        let file = File::open(path).ok()?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let first = lines.next()?.ok()?;
        let ChatEntry::Metadata {
            id,
            title,
            conversation_id,
            created_at,
            updated_at,
        } = serde_json::from_str(&first).ok()?
        else {
            return None;
        };

        let mut message_count = 0;
        let mut preview = "No messages".to_string();
        for line in lines.map_while(std::result::Result::ok) {
            if let Ok(ChatEntry::Message { message, .. }) = serde_json::from_str(&line) {
                message_count += 1;
                preview = util::truncate(&message.content, PREVIEW_MAX_LEN);
            }
        }

        Some(ChatInfo {
            id,
            title,
            conversation_id,
            created_at,
            updated_at,
            message_count,
            preview,
        })
    }

    /// Delete a chat by id.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.chat_path(id);
        if !path.exists() {
            return Err(Error::ChatNotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Rename a chat, bumping its updated timestamp.
    pub fn rename(&self, id: &str, title: impl Into<String>) -> Result<()> {
        let mut chat = self.load(id)?;
        chat.title = title.into();
        chat.updated_at = chrono::Utc::now().timestamp_millis();
        self.save(&chat)
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}
