//! Command manifest definition

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::RegistryError;
use crate::domain::entities::Command;
use super::HandlerCatalog;

/// A command described in a YAML file. `execute` names one of the
/// handlers in the [`HandlerCatalog`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandManifest {
    /// Command name (required)
    pub name: Option<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    pub description: Option<String>,

    pub usage: Option<String>,

    /// Seconds between uses per chat
    pub cooldown: Option<u64>,

    pub category: Option<String>,

    pub owner_only: Option<bool>,

    #[serde(default)]
    pub group_only: bool,

    #[serde(default)]
    pub private_only: bool,

    #[serde(default)]
    pub admin_only: bool,

    /// Handler to run (required)
    pub execute: Option<String>,
}

impl CommandManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Validation(format!("Failed to read manifest: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, RegistryError> {
        serde_yaml::from_str(content)
            .map_err(|e| RegistryError::Validation(format!("Failed to parse manifest: {}", e)))
    }

    /// Build the command, resolving `execute` against the catalog
    pub fn into_command(self, catalog: &HandlerCatalog) -> Result<Command, RegistryError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| RegistryError::Validation("missing 'name'".into()))?;
        let execute = self
            .execute
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| RegistryError::Validation(format!("command '{}' is missing 'execute'", name)))?;
        let handler = catalog.get(&execute).ok_or_else(|| {
            RegistryError::Validation(format!("command '{}' names unknown handler '{}'", name, execute))
        })?;

        let mut command = Command::new(name).with_aliases(self.aliases).with_handler_arc(handler);
        command.description = self.description;
        command.usage = self.usage;
        command.cooldown = self.cooldown;
        if let Some(category) = self.category {
            command.category = category;
        }
        command.owner_only = self.owner_only;
        command.group_only = self.group_only;
        command.private_only = self.private_only;
        command.admin_only = self.admin_only;
        Ok(command)
    }
}
