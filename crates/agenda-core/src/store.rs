use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::datetime::today_in;
use crate::entry::Entry;
use crate::preferences::Preferences;
use crate::seed::seed_entries;
use crate::state::AppState;

pub const ENTRIES_KEY: &str = "fd_tasks";
pub const PREFERENCES_KEY: &str = "fd_profile";

/// String records addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per record inside `data_dir`.
#[derive(Debug)]
pub struct DirStore {
    pub data_dir: PathBuf,
}

impl DirStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened record store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        validate_key(key)?;
        Ok(self.data_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for DirStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(file = %path.display(), bytes = raw.len(), "read record");
                Ok(Some(raw))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value).with_context(|| format!("failed to save {key}"))
    }
}

/// Records kept in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and decodes `key`. Anything short of a valid record yields `default`.
pub fn load_or_default<S, T>(store: &S, key: &str, default: T) -> T
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    load_record(store, key).unwrap_or_else(|| {
        debug!(key, "using default record");
        default
    })
}

fn load_record<S, T>(store: &S, key: &str) -> Option<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %format!("{err:#}"), "record unreadable; falling back");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "record corrupt; falling back");
            None
        }
    }
}

pub fn save<S, T>(store: &mut S, key: &str, value: &T) -> anyhow::Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let serialized =
        serde_json::to_string(value).with_context(|| format!("failed to encode {key}"))?;
    store.set(key, &serialized)
}

/// Loads both records. A store without entries is seeded around today.
#[tracing::instrument(skip(store, now))]
pub fn load_state<S>(store: &S, now: DateTime<Utc>) -> AppState
where
    S: KeyValueStore + ?Sized,
{
    let mut preferences = load_or_default(store, PREFERENCES_KEY, Preferences::default());
    preferences.sanitize();

    let entries = match load_record::<_, Vec<Entry>>(store, ENTRIES_KEY) {
        Some(entries) => entries,
        None => {
            let tz = preferences.timezone();
            let entries = seed_entries(today_in(&tz, now), now, &tz);
            info!(count = entries.len(), "seeded sample entries");
            entries
        }
    };

    AppState::new(entries, preferences, now)
}

#[tracing::instrument(skip(store, state), fields(entries = state.entries.len()))]
pub fn save_state<S>(store: &mut S, state: &AppState) -> anyhow::Result<()>
where
    S: KeyValueStore + ?Sized,
{
    save(store, ENTRIES_KEY, &state.entries)?;
    save(store, PREFERENCES_KEY, &state.preferences)?;
    Ok(())
}

fn validate_key(key: &str) -> anyhow::Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(anyhow!("invalid record key: {key:?}"))
    }
}

#[tracing::instrument(skip(path, payload))]
fn write_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), bytes = payload.len(), "saving record atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::entry::EntryDraft;
    use crate::state::Action;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 6, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn missing_record_yields_default() {
        let store = MemoryStore::new();
        let prefs = load_or_default(&store, PREFERENCES_KEY, Preferences::default());
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn corrupt_record_yields_default() {
        let mut store = MemoryStore::new();
        store.set(ENTRIES_KEY, "{not json").expect("set");
        let entries: Vec<Entry> = load_or_default(&store, ENTRIES_KEY, vec![]);
        assert!(entries.is_empty());
    }

    #[test]
    fn empty_store_is_seeded() {
        let store = MemoryStore::new();
        let state = load_state(&store, now());
        assert!(!state.entries.is_empty());
        assert_eq!(state.preferences, Preferences::default());
    }

    #[test]
    fn saved_state_loads_back() {
        let mut store = MemoryStore::new();
        let state = AppState::new(vec![], Preferences::default(), now())
            .apply(Action::Create(EntryDraft::titled("Dentist")), now())
            .expect("create");
        save_state(&mut store, &state).expect("save");

        let loaded = load_state(&store, now());
        assert_eq!(loaded.entries, state.entries);
        assert_eq!(loaded.preferences, state.preferences);
    }

    #[test]
    fn saved_empty_list_is_not_reseeded() {
        let mut store = MemoryStore::new();
        save::<_, [Entry]>(&mut store, ENTRIES_KEY, &[]).expect("save");
        assert!(load_state(&store, now()).entries.is_empty());
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = DirStore {
            data_dir: PathBuf::from("/tmp/agenda-test"),
        };
        assert!(store.path_for("fd_tasks").is_ok());
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for("").is_err());
    }
}
