//! Per-domain learned state.
//!
//! Records whether a domain previously needed a browser render so later runs
//! can render up front. Saves are read-merge-write full overwrites keyed by
//! domain; concurrent processes sharing one file can clobber each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PageDocError, Result};

/// How the content for a domain was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Fetch,
    #[serde(alias = "browser")]
    Playwright,
}

/// Learned signal for one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_rendering: Option<bool>,
}

impl DomainState {
    /// Overlay the fields present in `partial`.
    pub fn merge(&mut self, partial: &DomainState) {
        if partial.provider.is_some() {
            self.provider = partial.provider;
        }
        if partial.last_success.is_some() {
            self.last_success = partial.last_success;
        }
        if partial.pack_version.is_some() {
            self.pack_version.clone_from(&partial.pack_version);
        }
        if partial.score.is_some() {
            self.score = partial.score;
        }
        if partial.needs_rendering.is_some() {
            self.needs_rendering = partial.needs_rendering;
        }
    }

    pub fn needs_rendering(&self) -> bool {
        self.needs_rendering.unwrap_or(false)
    }
}

/// Domain-keyed state storage injected into the registry and coordinator.
pub trait StateStore: Send + Sync {
    fn get(&self, domain: &str) -> Option<DomainState>;

    /// Merge `partial` into the stored state and stamp `lastSuccess` with now.
    fn save(&self, domain: &str, partial: &DomainState) -> Result<()>;
}

/// Hostname with a leading `www.` stripped, or `None` for non-URLs.
pub fn state_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

type StateMap = BTreeMap<String, DomainState>;

fn lock_error<T>(_: T) -> PageDocError {
    PageDocError::StateError("state lock poisoned".to_string())
}

fn merge_into(map: &mut StateMap, domain: &str, partial: &DomainState) {
    let entry = map.entry(domain.to_string()).or_default();
    entry.merge(partial);
    entry.last_success = Some(Utc::now());
}

/// In-process state, used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<StateMap>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, domain: &str) -> Option<DomainState> {
        self.state.lock().ok()?.get(domain).cloned()
    }

    fn save(&self, domain: &str, partial: &DomainState) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_error)?;
        merge_into(&mut state, domain, partial);
        Ok(())
    }
}

/// JSON file store, `~/.pagedoc/site-state.json` by default.
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
    state: Mutex<StateMap>,
}

impl JsonStateStore {
    /// Open a store at `path`; a missing or corrupt file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::read_file(&path).unwrap_or_else(|e| {
            tracing::debug!(path = %path.display(), error = %e, "starting with empty domain state");
            StateMap::new()
        });
        Self { path, state: Mutex::new(state) }
    }

    /// Default location under the home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".pagedoc").join("site-state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<StateMap> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_file(&self, state: &StateMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, domain: &str) -> Option<DomainState> {
        self.state.lock().ok()?.get(domain).cloned()
    }

    fn save(&self, domain: &str, partial: &DomainState) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_error)?;

        // Pick up writes from other runs before overwriting the file.
        if let Ok(on_disk) = Self::read_file(&self.path) {
            *state = on_disk;
        }
        merge_into(&mut state, domain, partial);

        self.write_file(&state)
            .map_err(|e| PageDocError::StateError(format!("Failed to save state to {}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_domain() {
        assert_eq!(state_domain("https://www.reddit.com/r/rust").as_deref(), Some("reddit.com"));
        assert_eq!(state_domain("https://news.ycombinator.com/item?id=1").as_deref(), Some("news.ycombinator.com"));
        assert_eq!(state_domain("./local/file.html"), None);
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let store = MemoryStateStore::new();
        store
            .save(
                "example.com",
                &DomainState { needs_rendering: Some(true), score: Some(12), ..Default::default() },
            )
            .unwrap();
        store
            .save("example.com", &DomainState { provider: Some(Provider::Fetch), ..Default::default() })
            .unwrap();

        let state = store.get("example.com").unwrap();
        assert!(state.needs_rendering());
        assert_eq!(state.score, Some(12));
        assert_eq!(state.provider, Some(Provider::Fetch));
        assert!(state.last_success.is_some());
    }

    #[test]
    fn test_json_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("site-state.json");

        let store = JsonStateStore::open(&path);
        assert!(store.get("example.com").is_none());
        store
            .save(
                "example.com",
                &DomainState { needs_rendering: Some(true), provider: Some(Provider::Playwright), ..Default::default() },
            )
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("needsRendering"));
        assert!(raw.contains("\"playwright\""));

        let reopened = JsonStateStore::open(&path);
        assert!(reopened.get("example.com").unwrap().needs_rendering());
    }

    #[test]
    fn test_json_store_merges_other_writers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site-state.json");

        let first = JsonStateStore::open(&path);
        let second = JsonStateStore::open(&path);
        first.save("a.com", &DomainState { score: Some(1), ..Default::default() }).unwrap();
        second.save("b.com", &DomainState { score: Some(2), ..Default::default() }).unwrap();

        let reopened = JsonStateStore::open(&path);
        assert_eq!(reopened.get("a.com").unwrap().score, Some(1));
        assert_eq!(reopened.get("b.com").unwrap().score, Some(2));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site-state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonStateStore::open(&path);
        assert!(store.get("example.com").is_none());
    }

    #[test]
    fn test_provider_browser_alias() {
        let state: DomainState = serde_json::from_str(r#"{"provider": "browser"}"#).unwrap();
        assert_eq!(state.provider, Some(Provider::Playwright));
    }
}
