//! Daily creation quota.
//!
//! The gate is advisory: it runs client-side only and fails open. A storage
//! error never blocks a generation. The gate logs the error and keeps counting
//! in memory for the rest of the session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::paths::state_dir;

pub const DEFAULT_DAILY_LIMIT: u32 = 1;
const RECORD_FILE: &str = "rate-limit.json";

/// Generations used on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// `YYYY-MM-DD`, no time component
    pub date: String,
    pub count: u32,
}

impl QuotaRecord {
    pub fn fresh(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            count: 0,
        }
    }
}

/// Durable home of the single quota record
pub trait QuotaStore {
    fn load(&self) -> Result<Option<QuotaRecord>>;
    fn save(&self, record: &QuotaRecord) -> Result<()>;
}

/// JSON file store, `~/.sitechat/rate-limit.json` by default
#[derive(Debug, Clone)]
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(state_dir()?.join(RECORD_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QuotaStore for FileQuotaStore {
    fn load(&self) -> Result<Option<QuotaRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(record))
    }

    fn save(&self, record: &QuotaRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string(record)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store. Used when no durable location is available, and in tests.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    record: RefCell<Option<QuotaRecord>>,
    broken: bool,
}

impl MemoryQuotaStore {
    pub fn with_record(record: QuotaRecord) -> Self {
        Self {
            record: RefCell::new(Some(record)),
            broken: false,
        }
    }

    /// A store whose every read and write fails
    pub fn broken() -> Self {
        Self {
            record: RefCell::new(None),
            broken: true,
        }
    }

    pub fn snapshot(&self) -> Option<QuotaRecord> {
        self.record.borrow().clone()
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self) -> Result<Option<QuotaRecord>> {
        if self.broken {
            anyhow::bail!("quota store unavailable");
        }
        Ok(self.record.borrow().clone())
    }

    fn save(&self, record: &QuotaRecord) -> Result<()> {
        if self.broken {
            anyhow::bail!("quota store unavailable");
        }
        *self.record.borrow_mut() = Some(record.clone());
        Ok(())
    }
}

impl<S: QuotaStore + ?Sized> QuotaStore for std::rc::Rc<S> {
    fn load(&self) -> Result<Option<QuotaRecord>> {
        (**self).load()
    }

    fn save(&self, record: &QuotaRecord) -> Result<()> {
        (**self).save(record)
    }
}

pub trait Clock {
    fn today(&self) -> Date;
}

/// UTC calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

pub fn date_key(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub struct QuotaGate {
    store: Box<dyn QuotaStore>,
    clock: Box<dyn Clock>,
    limit: u32,
    record: QuotaRecord,
}

impl QuotaGate {
    /// Read the persisted record, replacing it with a zero record for today when
    /// it is missing, stale, or unreadable.
    pub fn open(store: Box<dyn QuotaStore>, clock: Box<dyn Clock>, limit: u32) -> Self {
        let today = date_key(clock.today());
        let record = match store.load() {
            Ok(Some(record)) if record.date == today => record,
            Ok(stale) => {
                if let Some(stale) = stale {
                    debug!(stored = %stale.date, today = %today, "quota record is from another day");
                }
                let fresh = QuotaRecord::fresh(today);
                persist(store.as_ref(), &fresh);
                fresh
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to read quota record; starting from zero");
                let fresh = QuotaRecord::fresh(today);
                persist(store.as_ref(), &fresh);
                fresh
            }
        };
        Self {
            store,
            clock,
            limit,
            record,
        }
    }

    /// Gate backed by the default quota file. Falls back to memory when the
    /// state directory cannot be resolved.
    pub fn open_default(limit: u32) -> Self {
        let store: Box<dyn QuotaStore> = match FileQuotaStore::default_location() {
            Ok(store) => Box::new(store),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "no quota file location; counting in memory");
                Box::new(MemoryQuotaStore::default())
            }
        };
        Self::open(store, Box::new(SystemClock), limit)
    }

    pub fn daily_limit(&self) -> u32 {
        self.limit
    }

    /// Calendar date the current count belongs to
    pub fn date(&mut self) -> &str {
        self.roll_over();
        &self.record.date
    }

    pub fn current_count(&mut self) -> u32 {
        self.roll_over();
        self.record.count
    }

    pub fn is_exhausted(&mut self) -> bool {
        self.current_count() >= self.limit
    }

    pub fn remaining(&mut self) -> u32 {
        self.limit.saturating_sub(self.current_count())
    }

    pub fn record_generation(&mut self) {
        self.roll_over();
        self.record.count = self.record.count.saturating_add(1);
        persist(self.store.as_ref(), &self.record);
        info!(
            date = %self.record.date,
            count = self.record.count,
            limit = self.limit,
            "recorded generation"
        );
    }

    fn roll_over(&mut self) {
        let today = date_key(self.clock.today());
        if self.record.date != today {
            debug!(previous = %self.record.date, today = %today, "quota day rolled over");
            self.record = QuotaRecord::fresh(today);
            persist(self.store.as_ref(), &self.record);
        }
    }
}

fn persist(store: &dyn QuotaStore, record: &QuotaRecord) {
    if let Err(err) = store.save(record) {
        warn!(error = %format!("{err:#}"), "failed to save quota record; keeping count in memory");
    }
}
