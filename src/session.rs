//! Session controller: owns the transcript, staged attachments, and active site.
//!
//! One exchange runs in two halves. [`Session::begin`] validates the submission
//! and snapshots what the model needs. [`Session::complete`] interprets the reply
//! and applies its side effects. The caller runs the model call between them,
//! so a worker thread can run it while the transcript stays on screen.

use anyhow::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::attachments::{merge_staged, read_batch};
use crate::export::write_archive;
use crate::generate::{GenerationRequest, GenerationService};
use crate::interpret::{Reply, interpret_reply};
use crate::locale::Locale;
use crate::quota::QuotaGate;
use crate::types::{AttachmentDraft, ConversationEntry, SiteBundle, View};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("nothing to send")]
    Empty,
    #[error("a generation is already in progress")]
    Busy,
    #[error("daily creation limit reached")]
    QuotaExhausted,
}

#[derive(Debug, Error)]
pub enum ExportRejected {
    #[error("nothing has been generated yet")]
    NothingGenerated,
    #[error("a generation is in progress")]
    Busy,
    #[error("export failed: {0:#}")]
    Failed(anyhow::Error),
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Conversation,
    Malformed,
    SiteInstalled,
    TransportFailed,
}

/// An in-flight exchange; hand it back to [`Session::complete`]
#[derive(Debug)]
pub struct PendingExchange {
    request: GenerationRequest,
}

impl PendingExchange {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

pub struct Session {
    locale: Locale,
    contact_email: String,
    transcript: Vec<ConversationEntry>,
    staged: Vec<AttachmentDraft>,
    bundle: SiteBundle,
    view: View,
    busy: bool,
    started: bool,
}

impl Session {
    pub fn new(locale: Locale, contact_email: impl Into<String>) -> Self {
        let bundle = SiteBundle::placeholder(&locale);
        Self {
            locale,
            contact_email: contact_email.into(),
            transcript: Vec::new(),
            staged: Vec::new(),
            bundle,
            view: View::Chat,
            busy: false,
            started: false,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn transcript(&self) -> &[ConversationEntry] {
        &self.transcript
    }

    pub fn staged(&self) -> &[AttachmentDraft] {
        &self.staged
    }

    pub fn bundle(&self) -> &SiteBundle {
        &self.bundle
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// True once the first submission has gone out
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Text shown while a generation is in flight
    pub fn working_message(&self) -> String {
        self.locale.t("working")
    }

    /// Read `paths` and stage the whole batch at once. Returns the staged count.
    pub fn stage_files(&mut self, paths: &[PathBuf]) -> usize {
        let batch = read_batch(paths);
        let staged = std::mem::take(&mut self.staged);
        self.staged = merge_staged(staged, batch);
        self.staged.len()
    }

    /// Drop staged attachments named `name`. Returns whether any were removed.
    pub fn remove_attachment(&mut self, name: &str) -> bool {
        let before = self.staged.len();
        self.staged.retain(|a| a.display_name != name);
        self.staged.len() != before
    }

    pub fn begin(
        &mut self,
        prompt: &str,
        quota: &mut QuotaGate,
    ) -> Result<PendingExchange, SubmitRejected> {
        if self.busy {
            return Err(SubmitRejected::Busy);
        }
        if prompt.trim().is_empty() && self.staged.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        if quota.is_exhausted() {
            return Err(SubmitRejected::QuotaExhausted);
        }

        self.started = true;
        self.busy = true;

        let history = self.transcript.clone();
        let attachments = std::mem::take(&mut self.staged);
        let names = attachments
            .iter()
            .map(|a| a.display_name.clone())
            .collect();
        self.transcript.push(ConversationEntry::user(prompt, names));

        Ok(PendingExchange {
            request: GenerationRequest {
                history,
                prompt: prompt.to_string(),
                attachments,
            },
        })
    }

    pub fn complete(
        &mut self,
        exchange: PendingExchange,
        reply: Result<String>,
        quota: &mut QuotaGate,
    ) -> Outcome {
        self.busy = false;
        debug!(prompt_chars = exchange.request.prompt.chars().count(), "exchange finished");
        match reply {
            Ok(raw) => self.apply_reply(&raw, quota),
            Err(err) => {
                error!(error = %format!("{err:#}"), "generation request failed");
                self.push_assistant(self.locale.t("transport_error"));
                Outcome::TransportFailed
            }
        }
    }

    /// Run one full exchange on the current thread
    pub fn submit(
        &mut self,
        prompt: &str,
        service: &dyn GenerationService,
        quota: &mut QuotaGate,
    ) -> Result<Outcome, SubmitRejected> {
        let exchange = self.begin(prompt, quota)?;
        let reply = service.generate(exchange.request());
        Ok(self.complete(exchange, reply, quota))
    }

    fn apply_reply(&mut self, raw: &str, quota: &mut QuotaGate) -> Outcome {
        match interpret_reply(raw) {
            Reply::Conversation(text) => {
                self.push_assistant(text);
                Outcome::Conversation
            }
            Reply::Malformed { reason } => {
                warn!(reason = %reason, "model returned an invalid site bundle");
                self.push_assistant(self.locale.t("invalid_bundle"));
                Outcome::Malformed
            }
            Reply::Bundle { bundle, preface } => {
                self.bundle = bundle;
                quota.record_generation();
                let message = self.confirmation_message(&preface);
                self.push_assistant(message);
                self.view = View::Preview;
                info!("installed generated site");
                Outcome::SiteInstalled
            }
        }
    }

    /// Preface (or the default acknowledgement), then disclaimer, then contact footer
    fn confirmation_message(&self, preface: &str) -> String {
        let lead = if preface.is_empty() {
            self.locale.t("site_ready")
        } else {
            preface.to_string()
        };
        format!(
            "{lead}\n\n{}\n\n{}",
            self.locale.t("ai_disclaimer"),
            self.locale
                .t_with("contact_footer", &[("email", self.contact_email.as_str())])
        )
    }

    /// Export the active site. Failures are logged and added to the transcript.
    pub fn export(&mut self, dest: &Path) -> Result<PathBuf, ExportRejected> {
        if self.busy {
            return Err(ExportRejected::Busy);
        }
        if !self.started {
            return Err(ExportRejected::NothingGenerated);
        }
        match write_archive(&self.bundle, self.locale.lang(), dest) {
            Ok(path) => {
                info!(path = %path.display(), "exported site archive");
                Ok(path)
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "failed to export site archive");
                self.push_assistant(self.locale.t("export_failed"));
                Err(ExportRejected::Failed(err))
            }
        }
    }

    fn push_assistant(&mut self, text: String) {
        self.transcript.push(ConversationEntry::assistant(text));
    }
}
