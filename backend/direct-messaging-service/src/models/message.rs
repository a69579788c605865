use crate::error::AppError;
use crate::models::Principal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf"];
const DOCUMENT_MIME_MARKERS: &[&str] = &["pdf", "document", "text"];

/// Body of a message: plain text or file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        content: String,
    },
    File {
        name: String,
        url: String,
        size: i64,
        mime_type: Option<String>,
    },
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        url: impl Into<String>,
        size: i64,
        mime_type: Option<String>,
    ) -> Self {
        Self::File {
            name: name.into(),
            url: url.into(),
            size,
            mime_type,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Text { content } => {
                if content.trim().is_empty() {
                    return Err(AppError::Validation("message content is blank".into()));
                }
            }
            Self::File {
                name, url, size, ..
            } => {
                if name.trim().is_empty() {
                    return Err(AppError::Validation("file name is required".into()));
                }
                if url.trim().is_empty() {
                    return Err(AppError::Validation("file url is required".into()));
                }
                if *size < 0 {
                    return Err(AppError::Validation("file size cannot be negative".into()));
                }
            }
        }
        Ok(())
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Legacy "content" read: the text, or the file name for file messages
    pub fn content(&self) -> &str {
        match self {
            Self::Text { content } => content,
            Self::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub payload: MessagePayload,
    pub reply_to: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        conversation_id: Uuid,
        sender_id: Uuid,
        payload: MessagePayload,
        reply_to: Option<Uuid>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            payload,
            reply_to,
            sent_at,
            delivered: false,
            delivered_at: None,
            read: false,
            read_at: None,
            edited: false,
            edited_at: None,
            deleted: false,
            deleted_at: None,
        }
    }

    pub fn content(&self) -> &str {
        self.payload.content()
    }

    pub fn is_file(&self) -> bool {
        self.payload.is_file()
    }

    /// Returns true if this call performed the transition
    pub fn apply_delivered(&mut self, at: DateTime<Utc>) -> bool {
        if self.delivered {
            return false;
        }
        self.delivered = true;
        self.delivered_at = Some(at);
        true
    }

    /// Marks read; an undelivered message becomes delivered with the same instant.
    /// `read_at` never precedes an earlier-committed `delivered_at`.
    pub fn apply_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read {
            return false;
        }
        self.apply_delivered(at);
        self.read = true;
        self.read_at = Some(self.delivered_at.map_or(at, |delivered| delivered.max(at)));
        true
    }

    /// Replaces text content; `edited_at` is stamped on the first edit only
    pub fn apply_edit(&mut self, content: &str, at: DateTime<Utc>) {
        self.payload = MessagePayload::text(content);
        if !self.edited {
            self.edited = true;
            self.edited_at = Some(at);
        }
    }

    pub fn apply_delete(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted {
            return false;
        }
        self.deleted = true;
        self.deleted_at = Some(at);
        true
    }

    /// Not deleted and `now` no later than `sent_at + window`
    pub fn edit_window_open(&self, now: DateTime<Utc>, window: Duration) -> bool {
        !self.deleted && now <= self.sent_at + window
    }

    pub fn can_be_edited_by(&self, user_id: Uuid, now: DateTime<Utc>, window: Duration) -> bool {
        self.sender_id == user_id && self.edit_window_open(now, window)
    }

    pub fn can_be_deleted_by(&self, principal: &Principal) -> bool {
        self.sender_id == principal.user_id || principal.is_administrative()
    }

    pub fn is_image(&self) -> bool {
        match &self.payload {
            MessagePayload::File {
                name, mime_type, ..
            } => {
                let mime = mime_type.as_deref().unwrap_or_default().to_ascii_lowercase();
                mime.starts_with("image/")
                    || has_extension(name, IMAGE_EXTENSIONS)
                    || has_extension(&mime, IMAGE_EXTENSIONS)
            }
            MessagePayload::Text { .. } => false,
        }
    }

    pub fn is_document(&self) -> bool {
        match &self.payload {
            MessagePayload::File {
                name, mime_type, ..
            } => {
                let mime = mime_type.as_deref().unwrap_or_default().to_ascii_lowercase();
                DOCUMENT_MIME_MARKERS.iter().any(|marker| mime.contains(marker))
                    || has_extension(name, DOCUMENT_EXTENSIONS)
            }
            MessagePayload::Text { .. } => false,
        }
    }

    /// Human-readable file size on 1024-based thresholds; empty for text messages
    pub fn formatted_size(&self) -> String {
        match &self.payload {
            MessagePayload::File { size, .. } => format_size(*size),
            MessagePayload::Text { .. } => String::new(),
        }
    }
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|candidate| *candidate == ext)
        }
        None => false,
    }
}

pub fn format_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.1} GB", value / GB)
    }
}
