//! Session data: transcript entries, staged attachments, and the active site.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::locale::Locale;

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Role name understood by the generation service
    pub fn as_role(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "model",
        }
    }
}

/// One transcript entry. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachment_names: Vec<String>,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>, attachment_names: Vec<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            attachment_names,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            attachment_names: Vec::new(),
        }
    }
}

/// A file selected for the next submission, already encoded as a data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDraft {
    pub path: PathBuf,
    pub display_name: String,
    pub mime_type: String,
    pub data_url: String,
}

impl AttachmentDraft {
    /// Base64 payload of the data URL (everything after the first comma)
    pub fn payload(&self) -> &str {
        self.data_url
            .split_once(',')
            .map(|(_, data)| data)
            .unwrap_or("")
    }
}

/// The generated website: body markup, stylesheet, and script.
///
/// Decoding is strict: exactly these three fields, all strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteBundle {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl SiteBundle {
    /// Greeting shown before anything has been generated
    pub fn placeholder(locale: &Locale) -> Self {
        let lang = locale.lang();
        Self {
            html: format!(
                "<div class=\"welcome\" dir=\"{dir}\">\n  <h1>{title}</h1>\n  <p>{body}</p>\n</div>",
                dir = lang.dir(),
                title = locale.t("welcome_title"),
                body = locale.t("welcome_body"),
            ),
            css: concat!(
                "body { margin: 0; font-family: sans-serif; }\n",
                ".welcome { display: flex; flex-direction: column; align-items: center; ",
                "justify-content: center; height: 100vh; background: #1e293b; color: #94a3b8; }\n",
                ".welcome h1 { font-size: 2.25rem; margin-bottom: 1rem; }"
            )
            .to_string(),
            js: String::new(),
        }
    }
}

/// Which surface the user is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    Preview,
}
