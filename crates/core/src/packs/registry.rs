use crate::error::Result;
use crate::packs::directives::PatternPack;
use crate::packs::parser::PackParser;
use crate::packs::state::{DomainState, MemoryStateStore, StateStore, state_domain};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIN_BASE_LABEL: usize = 3;

/// Registry of pattern packs plus the domain state store
#[derive(Clone)]
pub struct PackRegistry {
    /// User pack directory, takes precedence
    custom_dir: Option<PathBuf>,
    /// Bundled pack directory
    standard_dir: Option<PathBuf>,
    packs: BTreeMap<String, Arc<PatternPack>>,
    state: Arc<dyn StateStore>,
}

impl std::fmt::Debug for PackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackRegistry")
            .field("custom_dir", &self.custom_dir)
            .field("standard_dir", &self.standard_dir)
            .field("packs", &self.packs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PackRegistry {
    /// Create an empty registry with in-memory state
    pub fn new() -> Self {
        PackRegistryBuilder::new().build()
    }

    /// Load every `*.txt` pack from the standard then the custom directory
    ///
    /// Unreadable packs are skipped with a warning. Returns the number of
    /// packs registered.
    pub fn load_packs(&mut self) -> Result<usize> {
        let dirs: Vec<PathBuf> = [self.standard_dir.clone(), self.custom_dir.clone()].into_iter().flatten().collect();

        for dir in dirs {
            for path in Self::pack_files(&dir)? {
                match PackParser::parse_file(&path) {
                    Ok(pack) => {
                        tracing::debug!(domain = %pack.domain, path = %path.display(), "loaded pattern pack");
                        self.add_pack(pack);
                    }
                    Err(e) => tracing::warn!("Failed to parse pattern pack {}: {}", path.display(), e),
                }
            }
        }

        Ok(self.packs.len())
    }

    /// Sorted `*.txt` files in `dir`; a missing directory yields none
    fn pack_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Register a pack, replacing any pack for the same domain
    pub fn add_pack(&mut self, pack: PatternPack) {
        let domain = pack.domain.strip_prefix("www.").unwrap_or(&pack.domain).to_string();
        self.packs.insert(domain, Arc::new(pack));
    }

    /// Pack for a URL's hostname (leading `www.` ignored)
    ///
    /// Non-URL identifiers such as file paths fall back to a substring match
    /// on the pack domain or its first label. Labels shorter than
    /// `MIN_BASE_LABEL` (`en`, `m`) are too common to match on.
    pub fn get_pack_for_url(&self, url: &str) -> Option<Arc<PatternPack>> {
        if let Some(domain) = state_domain(url) {
            return self.packs.get(&domain).cloned();
        }

        self.packs
            .iter()
            .find(|(domain, _)| {
                url.contains(domain.as_str())
                    || domain.split('.').next().is_some_and(|base| base.len() >= MIN_BASE_LABEL && url.contains(base))
            })
            .map(|(_, pack)| Arc::clone(pack))
    }

    pub fn get_domain_state(&self, url: &str) -> Option<DomainState> {
        state_domain(url).and_then(|domain| self.state.get(&domain))
    }

    pub fn save_domain_state(&self, domain: &str, partial: &DomainState) -> Result<()> {
        self.state.save(domain, partial)
    }

    pub fn state_store(&self) -> Arc<dyn StateStore> {
        Arc::clone(&self.state)
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.packs.keys().map(String::as_str)
    }
}

/// Builder for PackRegistry
pub struct PackRegistryBuilder {
    custom_dir: Option<PathBuf>,
    standard_dir: Option<PathBuf>,
    state: Option<Arc<dyn StateStore>>,
}

impl PackRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, state: None }
    }

    /// Set custom pack directory
    pub fn custom_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set standard (bundled) pack directory
    pub fn standard_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.standard_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the domain state store
    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state = Some(store);
        self
    }

    /// Build the PackRegistry
    pub fn build(self) -> PackRegistry {
        PackRegistry {
            custom_dir: self.custom_dir,
            standard_dir: self.standard_dir,
            packs: BTreeMap::new(),
            state: self.state.unwrap_or_else(|| Arc::new(MemoryStateStore::new())),
        }
    }
}

impl Default for PackRegistryBuilder {
    fn default() -> Self {
        let mut builder = Self::new();

        if let Some(custom_dir) = PackRegistry::default_custom_dir() {
            builder = builder.custom_dir(custom_dir);
        }

        if let Some(standard_dir) = PackRegistry::default_standard_dir() {
            builder = builder.standard_dir(standard_dir);
        }

        builder
    }
}

impl Default for PackRegistry {
    /// Registry over the default pack directories with in-memory state
    fn default() -> Self {
        PackRegistryBuilder::default().build()
    }
}

impl PackRegistry {
    /// Get default custom pack directory (~/.config/pagedoc/patterns)
    pub fn default_custom_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("pagedoc").join("patterns"))
    }

    /// Get default standard pack directory (`patterns/` in the working directory)
    pub fn default_standard_dir() -> Option<PathBuf> {
        let std_dir = PathBuf::from("patterns");
        if std_dir.exists() { Some(std_dir) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packs::state::Provider;
    use tempfile::TempDir;

    fn registry_with(domains: &[&str]) -> PackRegistry {
        let mut registry = PackRegistry::new();
        for domain in domains {
            registry.add_pack(PatternPack::new(*domain));
        }
        registry
    }

    #[test]
    fn test_lookup_strips_www() {
        let registry = registry_with(&["reddit.com"]);

        assert!(registry.get_pack_for_url("https://www.reddit.com/r/rust/").is_some());
        assert!(registry.get_pack_for_url("https://reddit.com/r/rust/").is_some());
        assert!(registry.get_pack_for_url("https://google.com").is_none());
    }

    #[test]
    fn test_lookup_substring_fallback_for_paths() {
        let registry = registry_with(&["reddit.com", "news.ycombinator.com"]);

        let pack = registry.get_pack_for_url("/path/to/reddit/fixture.html").unwrap();
        assert_eq!(pack.domain, "reddit.com");
        assert!(registry.get_pack_for_url("/path/to/other.html").is_none());
    }

    #[test]
    fn test_lookup_ignores_short_base_labels() {
        let registry = registry_with(&["en.wikipedia.org"]);

        assert!(registry.get_pack_for_url("fixtures/generic_thread.html").is_none());
        assert!(registry.get_pack_for_url("mirror/en.wikipedia.org/Rust.html").is_some());
    }

    #[test]
    fn test_load_packs_custom_overrides_standard() {
        let tmp = TempDir::new().unwrap();
        let standard = tmp.path().join("standard");
        let custom = tmp.path().join("custom");
        fs::create_dir_all(&standard).unwrap();
        fs::create_dir_all(&custom).unwrap();

        fs::write(standard.join("example.com.txt"), "domain: example.com\nitem: .standard\n").unwrap();
        fs::write(custom.join("example.com.txt"), "domain: example.com\nitem: .custom\n").unwrap();
        fs::write(standard.join("broken.txt"), "domain: broken.com\nnot a directive\n").unwrap();
        fs::write(standard.join("README.md"), "ignored").unwrap();

        let mut registry = PackRegistryBuilder::new().standard_dir(&standard).custom_dir(&custom).build();
        let count = registry.load_packs().unwrap();

        assert_eq!(count, 1);
        let pack = registry.get_pack_for_url("https://example.com/a").unwrap();
        assert_eq!(pack.selectors.item.as_deref(), Some(".custom"));
    }

    #[test]
    fn test_load_packs_missing_dir() {
        let mut registry = PackRegistryBuilder::new().standard_dir("/nonexistent/patterns").build();
        assert_eq!(registry.load_packs().unwrap(), 0);
    }

    #[test]
    fn test_domain_state_through_registry() {
        let registry = PackRegistry::new();
        assert!(registry.get_domain_state("https://www.example.com/x").is_none());

        registry
            .save_domain_state(
                "example.com",
                &DomainState { needs_rendering: Some(true), provider: Some(Provider::Playwright), ..Default::default() },
            )
            .unwrap();

        let state = registry.get_domain_state("https://www.example.com/x").unwrap();
        assert!(state.needs_rendering());
        assert!(registry.get_domain_state("not a url").is_none());
    }
}
