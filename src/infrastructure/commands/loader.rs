//! Command loader - registers commands from manifest files and keeps them
//! in sync with the directory

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::application::errors::RegistryError;
use crate::application::services::CommandRegistry;
use crate::domain::entities::CommandHandler;
use super::manifest::CommandManifest;

/// Named handlers that manifests can point at
#[derive(Default, Clone)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.into().to_lowercase(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&name.trim().to_lowercase()).cloned()
    }

}

struct LoadedManifest {
    name: String,
    modified: Option<SystemTime>,
}

/// What a load or reload pass did
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<(PathBuf, RegistryError)>,
}

impl ReloadReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty() && self.skipped.is_empty()
    }
}

/// Command loader
pub struct CommandLoader {
    command_dir: PathBuf,
    catalog: HandlerCatalog,
    loaded: HashMap<PathBuf, LoadedManifest>,
    /// Manifests that failed to load, by the mtime they failed at
    failed: HashMap<PathBuf, Option<SystemTime>>,
    warned_missing: bool,
}

impl CommandLoader {
    pub fn new(command_dir: impl Into<PathBuf>, catalog: HandlerCatalog) -> Self {
        Self {
            command_dir: command_dir.into(),
            catalog,
            loaded: HashMap::new(),
            failed: HashMap::new(),
            warned_missing: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.command_dir
    }

    /// Bring the registry in line with the directory: new files register,
    /// changed files replace their command, vanished files unregister it.
    /// Invalid or conflicting manifests are skipped with a warning, once
    /// per change of the file.
    pub fn reload(&mut self, registry: &CommandRegistry) -> ReloadReport {
        let mut report = ReloadReport::default();
        let files = self.scan();
        let present: HashSet<&PathBuf> = files.iter().map(|(path, _)| path).collect();

        let gone: Vec<PathBuf> = self
            .loaded
            .keys()
            .filter(|path| !present.contains(path))
            .cloned()
            .collect();
        self.failed.retain(|path, _| present.contains(path));
        for path in gone {
            if let Some(entry) = self.loaded.remove(&path) {
                registry.unregister(&entry.name);
                tracing::info!("Unloaded command '{}' ({} removed)", entry.name, path.display());
                report.removed.push(entry.name);
            }
        }

        for (path, modified) in &files {
            if modified.is_some() {
                let loaded_at = self.loaded.get(path).map(|e| e.modified);
                let failed_at = self.failed.get(path).copied();
                if loaded_at == Some(*modified) || failed_at == Some(*modified) {
                    continue;
                }
            }
            match self.load_file(registry, path, *modified) {
                Ok((name, updated)) => {
                    self.failed.remove(path);
                    if updated {
                        report.updated.push(name);
                    } else {
                        report.added.push(name);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping command manifest {}: {}", path.display(), e);
                    self.failed.insert(path.clone(), *modified);
                    report.skipped.push((path.clone(), e));
                }
            }
        }

        report
    }

    /// Register one manifest. Returns the command name and whether it
    /// replaced a previous version.
    fn load_file(
        &mut self,
        registry: &CommandRegistry,
        path: &Path,
        modified: Option<SystemTime>,
    ) -> Result<(String, bool), RegistryError> {
        let command = CommandManifest::from_file(path)?.into_command(&self.catalog)?;
        let name = command.name.trim().to_lowercase();

        let previous = self.loaded.get(path).map(|e| e.name.clone());
        let updated = match previous {
            Some(old) if old == name => {
                registry.replace(command)?;
                true
            }
            Some(old) => {
                registry.rename(&old, command)?;
                true
            }
            None => {
                registry.register(command)?;
                false
            }
        };

        tracing::info!("Loaded command '{}' from {}", name, path.display());
        self.loaded.insert(
            path.to_path_buf(),
            LoadedManifest { name: name.clone(), modified },
        );
        Ok((name, updated))
    }

    /// Manifest files in the directory with their modification times
    fn scan(&mut self) -> Vec<(PathBuf, Option<SystemTime>)> {
        let mut files = Vec::new();

        if !self.command_dir.exists() {
            if !self.warned_missing {
                tracing::warn!("Command directory does not exist: {}", self.command_dir.display());
                self.warned_missing = true;
            }
            return files;
        }
        self.warned_missing = false;

        let entries = match std::fs::read_dir(&self.command_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read command directory: {}", e);
                return files;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            // Skip hidden files
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
            }

            let is_manifest = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if !is_manifest {
                continue;
            }

            let modified = entry.metadata().and_then(|m| m.modified()).ok();
            files.push((path, modified));
        }

        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BotError;
    use crate::domain::entities::{FnHandler, Invocation};

    fn catalog() -> HandlerCatalog {
        let mut catalog = HandlerCatalog::new();
        catalog.insert("noop", Arc::new(FnHandler(|_inv: Invocation| async { Ok::<(), BotError>(()) })));
        catalog
    }

    fn write(dir: &Path, file: &str, body: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Rewrite `path` with a later mtime so the next reload sees a change
    fn rewrite(path: &Path, body: &str, secs_later: u64) {
        std::fs::write(path, body).unwrap();
        let later = SystemTime::now() + std::time::Duration::from_secs(secs_later);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(later)
            .unwrap();
    }

    #[test]
    fn loads_valid_manifests_and_skips_invalid_ones() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hello.yaml", "name: hello\naliases: [hi]\nexecute: noop\ncooldown: 3\n");
        write(dir.path(), "nameless.yaml", "execute: noop\n");
        write(dir.path(), "nohandler.yml", "name: broken\n");
        write(dir.path(), "unknown.yaml", "name: ghost\nexecute: missing\n");
        write(dir.path(), "notes.txt", "name: ignored\nexecute: noop\n");

        let registry = CommandRegistry::new();
        let mut loader = CommandLoader::new(dir.path(), catalog());
        let report = loader.reload(&registry);

        assert_eq!(report.added, vec!["hello"]);
        assert_eq!(report.skipped.len(), 3);
        assert!(report
            .skipped
            .iter()
            .all(|(_, e)| matches!(e, RegistryError::Validation(_))));
        let hello = registry.resolve("hi").unwrap();
        assert_eq!(hello.cooldown, Some(3));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "name: alpha\naliases: [x]\nexecute: noop\n");
        write(dir.path(), "b.yaml", "name: beta\naliases: [x]\nexecute: noop\n");

        let registry = CommandRegistry::new();
        let mut loader = CommandLoader::new(dir.path(), catalog());
        let report = loader.reload(&registry);

        assert_eq!(report.added, vec!["alpha"]);
        assert!(matches!(report.skipped[0].1, RegistryError::Conflict { .. }));
        assert!(registry.resolve("beta").is_none());
    }

    #[test]
    fn reload_replaces_changed_and_removes_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "hello.yaml", "name: hello\naliases: [hi]\nexecute: noop\n");

        let registry = CommandRegistry::new();
        let mut loader = CommandLoader::new(dir.path(), catalog());
        loader.reload(&registry);

        // unchanged files are left alone
        assert!(loader.reload(&registry).is_empty());

        rewrite(&path, "name: hello\naliases: [hey]\nexecute: noop\n", 5);

        let report = loader.reload(&registry);
        assert_eq!(report.updated, vec!["hello"]);
        assert!(registry.resolve("hi").is_none());
        assert!(registry.resolve("hey").is_some());

        std::fs::remove_file(&path).unwrap();
        let report = loader.reload(&registry);
        assert_eq!(report.removed, vec!["hello"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn rename_onto_a_taken_name_keeps_the_old_command() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.yaml", "name: alpha\naliases: [al]\nexecute: noop\n");
        write(dir.path(), "b.yaml", "name: beta\nexecute: noop\n");

        let registry = CommandRegistry::new();
        let mut loader = CommandLoader::new(dir.path(), catalog());
        loader.reload(&registry);

        rewrite(&a, "name: beta\nexecute: noop\n", 5);
        let report = loader.reload(&registry);
        assert!(report.updated.is_empty());
        assert!(matches!(
            &report.skipped[0],
            (path, RegistryError::Conflict { .. }) if path == &a
        ));
        assert_eq!(registry.resolve("alpha").unwrap().name, "alpha");
        assert_eq!(registry.resolve("al").unwrap().name, "alpha");
        assert_eq!(registry.len(), 2);

        // fixing the manifest completes the rename
        rewrite(&a, "name: gamma\naliases: [al]\nexecute: noop\n", 10);
        let report = loader.reload(&registry);
        assert_eq!(report.updated, vec!["gamma"]);
        assert!(registry.resolve("alpha").is_none());
        assert_eq!(registry.resolve("al").unwrap().name, "gamma");

        // the file still owns its command after the rename
        std::fs::remove_file(&a).unwrap();
        let report = loader.reload(&registry);
        assert_eq!(report.removed, vec!["gamma"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_manifest_is_reported_once_per_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "broken.yaml", "name: broken\n");

        let registry = CommandRegistry::new();
        let mut loader = CommandLoader::new(dir.path(), catalog());
        assert_eq!(loader.reload(&registry).skipped.len(), 1);
        assert!(loader.reload(&registry).is_empty());

        rewrite(&path, "name: broken\nexecute: missing\n", 5);
        assert_eq!(loader.reload(&registry).skipped.len(), 1);
        assert!(loader.reload(&registry).is_empty());

        rewrite(&path, "name: broken\nexecute: noop\n", 10);
        let report = loader.reload(&registry);
        assert_eq!(report.added, vec!["broken"]);
        assert!(registry.resolve("broken").is_some());
    }
}
