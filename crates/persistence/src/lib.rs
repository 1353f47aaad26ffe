#![deny(warnings)]

//! Persistence layer: key-value stores and the pond session snapshot.
//!
//! The whole session is written as one JSON document under [`SNAPSHOT_KEY`].
//! Loading never fails: an absent, unreadable or corrupt snapshot yields
//! `None`, and missing fields take their defaults.

use chrono::NaiveDate;
use pond_core::{validate_background, validate_fish, Coupon, Fish};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Key the session snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "pond_session";
/// Feed count assumed when a snapshot does not record one.
pub const DEFAULT_FEED_COUNT: u32 = 10;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}

/// String key-value store with get/set semantics.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// Volatile store, for tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: each key is a `<key>.json` file under `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        // Replace atomically via a sibling temp file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn default_username() -> String {
    "Guest".to_string()
}

fn default_feed_count() -> u32 {
    DEFAULT_FEED_COUNT
}

fn default_background() -> u8 {
    1
}

/// Accepts ISO dates and the `Wed May 01 2024` form; anything else reads as unset.
fn lenient_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&s, "%a %b %d %Y"))
            .ok()
    }))
}

/// Decodes each element on its own; elements that do not decode are dropped.
fn lenient_records<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "dropping undecodable record from snapshot");
                None
            }
        })
        .collect())
}

/// Everything persisted about a player's session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_feed_count")]
    pub feed_count: u32,
    #[serde(default)]
    pub share_bonus: u32,
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_feed_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub fishes: Vec<Fish>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub coupons: Vec<Coupon>,
    #[serde(default = "default_background")]
    pub current_background: u8,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            user_id: None,
            username: default_username(),
            feed_count: DEFAULT_FEED_COUNT,
            share_bonus: 0,
            last_feed_date: None,
            fishes: Vec::new(),
            coupons: Vec::new(),
            current_background: default_background(),
        }
    }
}

/// Overwrites the stored snapshot.
pub fn save_snapshot(store: &mut dyn KvStore, snap: &Snapshot) -> Result<(), PersistError> {
    let text = serde_json::to_string(snap)?;
    store.set(SNAPSHOT_KEY, &text)?;
    debug!(bytes = text.len(), fishes = snap.fishes.len(), "snapshot saved");
    Ok(())
}

/// Parses a snapshot and drops records that fail validation.
pub fn decode_snapshot(text: &str) -> Result<Snapshot, PersistError> {
    let mut snap: Snapshot = serde_json::from_str(text)?;
    snap.fishes.retain(|f| match validate_fish(f) {
        Ok(()) => true,
        Err(e) => {
            warn!(fish = %f.id, error = %e, "dropping invalid fish from snapshot");
            false
        }
    });
    if let Err(e) = validate_background(snap.current_background) {
        warn!(error = %e, "resetting background");
        snap.current_background = default_background();
    }
    Ok(snap)
}

/// Loads the stored snapshot, treating unreadable or corrupt data as absent.
pub fn load_snapshot(store: &dyn KvStore) -> Option<Snapshot> {
    let text = match store.get(SNAPSHOT_KEY) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "snapshot store unavailable, starting fresh");
            return None;
        }
    };
    match decode_snapshot(&text) {
        Ok(snap) => Some(snap),
        Err(e) => {
            warn!(error = %e, "corrupt snapshot ignored, starting fresh");
            None
        }
    }
}
