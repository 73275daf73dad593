#![allow(clippy::module_name_repetitions)]

//! Provider-based module resolution and the process-lifetime module
//! cache. Providers are polymorphic over where bytes come from; the
//! registry only orders them and owns the cache.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::config::ModuleConfig;
use crate::interpreter::value::Value;
use crate::source::SourceText;
use crate::symbol::Symbol;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module '{module}' could not be located")]
    NotFound { module: String },
    #[error("failed reading module '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cyclic module import detected for '{module}'")]
    Cyclic { module: String },
    #[error("module '{module}' failed to load: {message}")]
    Failed { module: String, message: String },
}

/// A loaded compilation unit: canonical cache key plus the bindings its
/// top level produced. Cached modules are immutable to all readers.
#[derive(Debug)]
pub struct Module {
    pub canonical: String,
    pub package: Option<Symbol>,
    pub exports: HashMap<Symbol, Value>,
}

impl Module {
    pub fn export(&self, name: &Symbol) -> Option<Value> {
        self.exports.get(name).cloned()
    }
}

/// Where module source text comes from. Priority orders providers from
/// most to least authoritative; bundled sources outrank the filesystem.
pub trait ModuleProvider {
    fn can_provide(&self, path: &str) -> bool;
    fn get_source(&self, path: &str) -> Result<SourceText, ModuleError>;
    fn list_modules(&self, directory: &str) -> BTreeSet<String>;
    fn priority(&self) -> i32;
}

//
// Bundled provider
//

const RESOURCE_PREFIX: &str = "bundled.modules.";

/// Serves pre-packaged sources embedded in the binary. Resource names
/// like `bundled.modules.core.prelude` become module paths by stripping
/// the fixed prefix and translating the separators.
pub struct BundledProvider {
    modules: HashMap<String, &'static str>,
}

impl BundledProvider {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut provider = Self::new();
        provider.register(
            "bundled.modules.core.prelude",
            include_str!("bundled/core/prelude.vsp"),
        );
        provider.register(
            "bundled.modules.core.math",
            include_str!("bundled/core/math.vsp"),
        );
        provider
    }

    pub fn register(&mut self, resource: &str, source: &'static str) {
        if let Some(path) = Self::module_path_for(resource) {
            self.modules.insert(path, source);
        }
    }

    /// `bundled.modules.core.prelude` → `core/prelude`.
    pub fn module_path_for(resource: &str) -> Option<String> {
        let rest = resource.strip_prefix(RESOURCE_PREFIX)?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.replace('.', "/"))
    }
}

impl Default for BundledProvider {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModuleProvider for BundledProvider {
    fn can_provide(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    fn get_source(&self, path: &str) -> Result<SourceText, ModuleError> {
        match self.modules.get(path) {
            Some(source) => Ok(SourceText::new(format!("<bundled:{path}>"), *source)),
            None => Err(ModuleError::NotFound {
                module: path.to_string(),
            }),
        }
    }

    fn list_modules(&self, directory: &str) -> BTreeSet<String> {
        let prefix = format!("{}/", directory.trim_end_matches('/'));
        self.modules
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn priority(&self) -> i32 {
        100
    }
}

//
// Filesystem provider
//

/// Resolves `<package>/<relative>` against registered package roots,
/// falling back to an ordered search directory list (explicit dirs,
/// then the ones derived from process configuration).
pub struct FileSystemProvider {
    package_roots: Vec<(String, PathBuf)>,
    search_dirs: Vec<PathBuf>,
}

const SCRIPT_EXTENSION: &str = "vsp";

impl FileSystemProvider {
    pub fn new() -> Self {
        Self {
            package_roots: Vec::new(),
            search_dirs: Vec::new(),
        }
    }

    pub fn from_config(config: &ModuleConfig) -> Self {
        let mut provider = Self::new();
        for (package, root) in &config.packages {
            provider.register_package(package, root.clone());
        }
        for dir in config.search_dirs() {
            provider.add_search_dir(dir);
        }
        provider
    }

    pub fn register_package(&mut self, name: &str, root: PathBuf) {
        self.package_roots.push((name.to_string(), root));
    }

    pub fn add_search_dir(&mut self, dir: PathBuf) {
        if !self.search_dirs.contains(&dir) {
            self.search_dirs.push(dir);
        }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some((package, rest)) = path.split_once('/') {
            for (name, root) in &self.package_roots {
                if name == package {
                    candidates.push(root.join(rest));
                }
            }
        }
        for dir in &self.search_dirs {
            candidates.push(dir.join(path));
        }
        for candidate in candidates {
            if candidate.is_file() {
                return Some(candidate);
            }
            if candidate.extension().is_none() {
                let with_ext = candidate.with_extension(SCRIPT_EXTENSION);
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
        }
        None
    }
}

impl Default for FileSystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleProvider for FileSystemProvider {
    fn can_provide(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    fn get_source(&self, path: &str) -> Result<SourceText, ModuleError> {
        let resolved = self.resolve(path).ok_or_else(|| ModuleError::NotFound {
            module: path.to_string(),
        })?;
        let text = fs::read_to_string(&resolved).map_err(|source| ModuleError::Io {
            path: resolved.clone(),
            source,
        })?;
        Ok(SourceText::new(resolved.display().to_string(), text))
    }

    fn list_modules(&self, directory: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for dir in &self.search_dirs {
            let Ok(entries) = fs::read_dir(dir.join(directory)) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_script = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext == SCRIPT_EXTENSION)
                    .unwrap_or(false);
                if is_script {
                    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                        found.insert(format!("{}/{}", directory.trim_end_matches('/'), stem));
                    }
                }
            }
        }
        found
    }

    fn priority(&self) -> i32 {
        10
    }
}

//
// Registry
//

#[derive(Debug, Clone, PartialEq, Eq)]
enum ModuleStatus {
    Initializing,
    Ready,
}

struct ModuleEntry {
    status: ModuleStatus,
    module: Option<Rc<Module>>,
}

/// The outcome of `begin`: either a cache hit or source text the
/// caller must compile, execute, and hand back through `finish`.
#[derive(Debug)]
pub enum ModuleLoad {
    Cached(Rc<Module>),
    Source {
        canonical: String,
        source: SourceText,
    },
}

pub struct ModuleRegistry {
    providers: Vec<Rc<dyn ModuleProvider>>,
    cache: HashMap<String, ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            cache: HashMap::new(),
        }
    }

    pub fn with_defaults(config: &ModuleConfig) -> Self {
        let mut registry = Self::new();
        registry.add_provider(Rc::new(BundledProvider::with_defaults()));
        registry.add_provider(Rc::new(FileSystemProvider::from_config(config)));
        registry
    }

    /// Providers are consulted from highest priority down; the stable
    /// sort keeps registration order within a priority level.
    pub fn add_provider(&mut self, provider: Rc<dyn ModuleProvider>) {
        self.providers.push(provider);
        self.providers
            .sort_by_key(|provider| std::cmp::Reverse(provider.priority()));
    }

    /// Normalize an import string into the cache key.
    pub fn canonical(&self, path: &str) -> String {
        let mut normalized = path.trim().replace('\\', "/");
        if let Some(stripped) = normalized.strip_suffix(".vsp") {
            normalized = stripped.to_string();
        }
        normalized
    }

    pub fn lookup(&self, canonical: &str) -> Option<Rc<Module>> {
        self.cache
            .get(canonical)
            .and_then(|entry| entry.module.clone())
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.contains_key(&self.canonical(path))
    }

    /// Start loading `path`. A failed provider lookup leaves the cache
    /// untouched, so a later import may retry.
    pub fn begin(&mut self, path: &str) -> Result<ModuleLoad, ModuleError> {
        let canonical = self.canonical(path);
        if let Some(entry) = self.cache.get(&canonical) {
            match (&entry.status, &entry.module) {
                (ModuleStatus::Ready, Some(module)) => {
                    debug!("module cache hit for '{canonical}'");
                    return Ok(ModuleLoad::Cached(module.clone()));
                }
                _ => {
                    return Err(ModuleError::Cyclic { module: canonical });
                }
            }
        }
        let provider = self
            .providers
            .iter()
            .find(|provider| provider.can_provide(&canonical))
            .cloned()
            .ok_or(ModuleError::NotFound {
                module: canonical.clone(),
            })?;
        let source = provider.get_source(&canonical)?;
        self.cache.insert(
            canonical.clone(),
            ModuleEntry {
                status: ModuleStatus::Initializing,
                module: None,
            },
        );
        debug!("loading module '{canonical}'");
        Ok(ModuleLoad::Source { canonical, source })
    }

    /// Record a successfully executed module. Later imports of the same
    /// canonical path reuse it without re-running top-level effects.
    pub fn finish(&mut self, module: Module) -> Rc<Module> {
        let canonical = module.canonical.clone();
        let module = Rc::new(module);
        self.cache.insert(
            canonical,
            ModuleEntry {
                status: ModuleStatus::Ready,
                module: Some(module.clone()),
            },
        );
        module
    }

    /// Forget a failed in-progress load so the path stays uncached.
    pub fn abort(&mut self, canonical: &str) {
        if let Some(entry) = self.cache.get(canonical) {
            if entry.status == ModuleStatus::Initializing {
                self.cache.remove(canonical);
            }
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_map_to_module_paths() {
        assert_eq!(
            BundledProvider::module_path_for("bundled.modules.core.prelude"),
            Some("core/prelude".to_string())
        );
        assert_eq!(
            BundledProvider::module_path_for("other.prefix.core"),
            None
        );
    }

    #[test]
    fn bundled_provider_serves_embedded_sources() {
        let provider = BundledProvider::with_defaults();
        assert!(provider.can_provide("core/prelude"));
        assert!(!provider.can_provide("core/missing"));
        let source = provider.get_source("core/prelude").expect("source");
        assert!(source.text().contains("func identity"));
        let listed = provider.list_modules("core");
        assert!(listed.contains("core/prelude"));
        assert!(listed.contains("core/math"));
    }

    #[test]
    fn filesystem_provider_resolves_packages_then_search_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pkg_root = dir.path().join("pkg");
        fs::create_dir_all(&pkg_root).expect("mkdir");
        fs::write(pkg_root.join("inside.vsp"), "var a = 1\n").expect("write");
        let search = dir.path().join("search");
        fs::create_dir_all(&search).expect("mkdir");
        fs::write(search.join("loose.vsp"), "var b = 2\n").expect("write");

        let mut provider = FileSystemProvider::new();
        provider.register_package("mypkg", pkg_root);
        provider.add_search_dir(search);

        assert!(provider.can_provide("mypkg/inside"));
        assert!(provider.can_provide("loose"));
        assert!(!provider.can_provide("mypkg/absent"));
        let source = provider.get_source("mypkg/inside").expect("source");
        assert!(source.text().contains("var a"));
    }

    #[test]
    fn higher_priority_provider_wins() {
        struct Fixed(&'static str, i32);
        impl ModuleProvider for Fixed {
            fn can_provide(&self, path: &str) -> bool {
                path == "shared/mod"
            }
            fn get_source(&self, path: &str) -> Result<SourceText, ModuleError> {
                Ok(SourceText::new(path, self.0))
            }
            fn list_modules(&self, _directory: &str) -> BTreeSet<String> {
                BTreeSet::new()
            }
            fn priority(&self) -> i32 {
                self.1
            }
        }
        let mut registry = ModuleRegistry::new();
        registry.add_provider(Rc::new(Fixed("var low = 1", 1)));
        registry.add_provider(Rc::new(Fixed("var high = 1", 50)));
        let ModuleLoad::Source { source, .. } = registry.begin("shared/mod").expect("load")
        else {
            panic!("expected source");
        };
        assert_eq!(source.text(), "var high = 1");
    }

    #[test]
    fn failed_lookup_does_not_populate_the_cache() {
        let mut registry = ModuleRegistry::new();
        let error = registry.begin("no/such/module").expect_err("must fail");
        assert!(matches!(error, ModuleError::NotFound { .. }));
        assert!(!registry.is_cached("no/such/module"));
    }

    #[test]
    fn in_progress_load_is_reported_as_cyclic() {
        let mut registry = ModuleRegistry::new();
        registry.add_provider(Rc::new(BundledProvider::with_defaults()));
        let ModuleLoad::Source { canonical, .. } =
            registry.begin("core/prelude").expect("load")
        else {
            panic!("expected source");
        };
        let error = registry.begin("core/prelude").expect_err("cycle");
        assert!(matches!(error, ModuleError::Cyclic { .. }));
        registry.abort(&canonical);
        assert!(!registry.is_cached("core/prelude"));
    }
}
