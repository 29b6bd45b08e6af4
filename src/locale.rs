//! Message catalogs for user-facing text.
//!
//! Catalogs are embedded at compile time. Lookups fall back to English when the
//! active catalog lacks a key, and to the key itself when English lacks it too.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

const AR_CATALOG: &str = include_str!("../locales/ar.json");
const EN_CATALOG: &str = include_str!("../locales/en.json");

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ar,
    En,
}

impl Lang {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "ar" | "arabic" => Ok(Self::Ar),
            "en" | "english" => Ok(Self::En),
            _ => bail!("invalid locale: must be ar or en"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lang::Ar => "ar",
            Lang::En => "en",
        }
    }

    /// Text direction for documents rendered in this language.
    pub fn dir(self) -> &'static str {
        match self {
            Lang::Ar => "rtl",
            Lang::En => "ltr",
        }
    }

    fn catalog(self) -> &'static str {
        match self {
            Lang::Ar => AR_CATALOG,
            Lang::En => EN_CATALOG,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Locale {
    lang: Lang,
    messages: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Locale {
    pub fn load(lang: Lang) -> Self {
        let fallback = parse_catalog(Lang::En);
        let messages = if lang == Lang::En {
            fallback.clone()
        } else {
            parse_catalog(lang)
        };
        Self {
            lang,
            messages,
            fallback,
        }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn t(&self, key: &str) -> String {
        self.messages
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Look up `key` and substitute each `{{name}}` placeholder.
    pub fn t_with(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        let mut text = self.t(key);
        for (name, value) in replacements {
            text = text.replace(&format!("{{{{{name}}}}}"), value);
        }
        text
    }
}

fn parse_catalog(lang: Lang) -> HashMap<String, String> {
    match serde_json::from_str(lang.catalog()) {
        Ok(messages) => messages,
        Err(err) => {
            warn!(locale = %lang, error = %err, "failed to parse message catalog");
            HashMap::new()
        }
    }
}
