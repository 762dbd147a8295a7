//! Command registry - name and alias resolution for registered commands

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::application::errors::RegistryError;
use crate::domain::entities::command::DEFAULT_CATEGORY;
use crate::domain::entities::Command;

#[derive(Default)]
struct Tables {
    /// lowercase name -> command
    commands: HashMap<String, Arc<Command>>,
    /// lowercase alias -> canonical name
    aliases: HashMap<String, String>,
}

impl Tables {
    /// Owner of `token` if it is taken by a command other than `ignore`.
    fn claimed_by<'a>(&'a self, token: &'a str, ignore: Option<&str>) -> Option<&'a str> {
        let owner = if self.commands.contains_key(token) {
            Some(token)
        } else {
            self.aliases.get(token).map(String::as_str)
        };
        owner.filter(|owner| Some(*owner) != ignore)
    }

    fn check_conflicts(&self, command: &Command, ignore: Option<&str>) -> Result<(), RegistryError> {
        for token in command.tokens() {
            if let Some(owner) = self.claimed_by(token, ignore) {
                return Err(RegistryError::Conflict {
                    token: token.to_string(),
                    owner: owner.to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, command: Command) {
        let name = command.name.clone();
        for alias in &command.aliases {
            self.aliases.insert(alias.clone(), name.clone());
        }
        self.commands.insert(name, Arc::new(command));
    }

    fn remove(&mut self, name: &str) -> Option<Arc<Command>> {
        let removed = self.commands.remove(name)?;
        self.aliases.retain(|_, owner| owner != name);
        Some(removed)
    }
}

/// Registry of every command the dispatcher can run.
///
/// All mutations happen under one write lock, so readers see either the
/// old or the new state, never a half-applied registration.
#[derive(Default)]
pub struct CommandRegistry {
    tables: RwLock<Tables>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a new command. Fails without touching the registry if the
    /// definition is invalid or any of its tokens is taken.
    pub fn register(&self, command: Command) -> Result<(), RegistryError> {
        let command = normalize(command)?;
        let mut tables = self.write();
        tables.check_conflicts(&command, None)?;
        tracing::debug!(command = %command.name, aliases = ?command.aliases, "registered command");
        tables.insert(command);
        Ok(())
    }

    /// Swap in a new definition for an existing name (or add it if new).
    /// On conflict the previous definition stays in place.
    pub fn replace(&self, command: Command) -> Result<Option<Arc<Command>>, RegistryError> {
        let name = command.name.clone();
        self.rename(&name, command)
    }

    /// Swap the command registered as `old` for `command`, which may carry a
    /// different name. Tokens held by `old` may move over; anything held by
    /// another command is a conflict, and then `old` stays registered.
    pub fn rename(&self, old: &str, command: Command) -> Result<Option<Arc<Command>>, RegistryError> {
        let command = normalize(command)?;
        let old = old.trim().to_lowercase();
        let mut tables = self.write();
        tables.check_conflicts(&command, Some(&old))?;
        let previous = tables.remove(&old);
        tracing::debug!(
            command = %command.name,
            previous = %old,
            replaced = previous.is_some(),
            "replaced command"
        );
        tables.insert(command);
        Ok(previous)
    }

    /// Remove a command and every alias pointing at it. Unknown names are ignored.
    pub fn unregister(&self, name: &str) -> Option<Arc<Command>> {
        let removed = self.write().remove(&name.trim().to_lowercase());
        if let Some(cmd) = &removed {
            tracing::debug!(command = %cmd.name, "unregistered command");
        }
        removed
    }

    /// Case-insensitive lookup: direct names win over aliases.
    pub fn resolve(&self, name_or_alias: &str) -> Option<Arc<Command>> {
        let token = name_or_alias.trim().to_lowercase();
        let tables = self.read();
        if let Some(cmd) = tables.commands.get(&token) {
            return Some(cmd.clone());
        }
        let canonical = tables.aliases.get(&token)?;
        tables.commands.get(canonical).cloned()
    }

    /// Commands in `category`, one entry per command, sorted by name
    pub fn list_by_category(&self, category: &str) -> Vec<Arc<Command>> {
        let mut commands: Vec<_> = self
            .read()
            .commands
            .values()
            .filter(|c| c.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.read()
            .commands
            .values()
            .map(|c| c.category.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<_> = self.read().commands.values().cloned().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn len(&self) -> usize {
        self.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercase the name and aliases, drop redundant aliases, and reject
/// definitions that can never be invoked.
fn normalize(mut command: Command) -> Result<Command, RegistryError> {
    command.name = command.name.trim().to_lowercase();
    if command.name.is_empty() {
        return Err(RegistryError::Validation("command name is required".into()));
    }
    if command.name.chars().any(char::is_whitespace) {
        return Err(RegistryError::Validation(format!(
            "command name '{}' contains whitespace",
            command.name
        )));
    }
    if command.handler.is_none() {
        return Err(RegistryError::Validation(format!(
            "command '{}' has no handler",
            command.name
        )));
    }

    let mut seen = BTreeSet::new();
    let mut aliases = Vec::with_capacity(command.aliases.len());
    for alias in command.aliases.drain(..) {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() || alias == command.name || alias.chars().any(char::is_whitespace) {
            continue;
        }
        if seen.insert(alias.clone()) {
            aliases.push(alias);
        }
    }
    command.aliases = aliases;

    if command.category.trim().is_empty() {
        command.category = DEFAULT_CATEGORY.to_string();
    }
    Ok(command)
}
