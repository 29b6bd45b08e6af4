//! Chat with a hosted language model until it builds you a static website.
//!
//! The model's replies go through [`interpret::interpret_reply`]. A reply that
//! carries an `{html, css, js}` bundle becomes the active site and spends one
//! unit of the daily [`quota::QuotaGate`].

pub mod attachments;
pub mod config;
pub mod export;
pub mod generate;
pub mod interpret;
pub mod locale;
pub mod logging;
pub mod paths;
pub mod quota;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use generate::{GeminiClient, GenerationRequest, GenerationService};
pub use interpret::{Reply, interpret_reply};
pub use locale::{Lang, Locale};
pub use quota::{QuotaGate, QuotaRecord};
pub use session::{ExportRejected, Outcome, PendingExchange, Session, SubmitRejected};
pub use types::{AttachmentDraft, ConversationEntry, SiteBundle, Speaker, View};
