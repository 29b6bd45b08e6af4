//! Classification of raw model replies.
//!
//! A reply either carries a site bundle in a fenced ```json block or is plain
//! conversation. Only the first fenced block counts.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::SiteBundle;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("json fence pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No fenced JSON block; show the text verbatim
    Conversation(String),
    /// A fenced block that is not a valid bundle
    Malformed { reason: String },
    /// A valid bundle plus the prose around it, fence removed and trimmed
    Bundle { bundle: SiteBundle, preface: String },
}

pub fn interpret_reply(raw: &str) -> Reply {
    let Some(captures) = JSON_FENCE.captures(raw) else {
        return Reply::Conversation(raw.to_string());
    };
    let body = captures.get(1).map_or("", |m| m.as_str());
    match decode_bundle(body) {
        Ok(bundle) => Reply::Bundle {
            bundle,
            preface: strip_fence(raw),
        },
        Err(err) => Reply::Malformed {
            reason: format!("{err:#}"),
        },
    }
}

fn decode_bundle(body: &str) -> Result<SiteBundle> {
    let value: Value = serde_json::from_str(body).context("fenced block is not valid JSON")?;
    if !value.is_object() {
        bail!("fenced block is not a JSON object");
    }
    serde_json::from_value(value).context("fenced block is not an {html, css, js} string bundle")
}

/// Remove the first fenced JSON block and trim what is left
fn strip_fence(raw: &str) -> String {
    JSON_FENCE.replace(raw, "").trim().to_string()
}
