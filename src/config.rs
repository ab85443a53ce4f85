//! Weapon catalog and core settings.
//!
//! Weapons map to a delivery strategy and are authored in RON (or JSON for
//! tooling). Every entry is validated on load; a bad entry fails the whole
//! catalog rather than shipping a weapon with a zero speed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::combat::WeaponRef;
use crate::constants::DEFAULT_SESSION_TTL_MS;
use crate::delivery::DeliveryStrategy;
use crate::logging::TracingConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weapon {weapon:?} is invalid: {reason}")]
    InvalidWeapon { weapon: WeaponRef, reason: String },
    #[error("weapon {0:?} defined twice")]
    DuplicateWeapon(WeaponRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponEntry {
    pub id: WeaponRef,
    pub name: String,
    pub delivery: DeliveryStrategy,
}

/// Weapon id to delivery strategy
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct WeaponCatalog {
    weapons: BTreeMap<WeaponRef, WeaponEntry>,
}

impl WeaponCatalog {
    pub fn from_entries(entries: Vec<WeaponEntry>) -> Result<Self, ConfigError> {
        let mut weapons = BTreeMap::new();
        for entry in entries {
            entry
                .delivery
                .validate()
                .map_err(|reason| ConfigError::InvalidWeapon {
                    weapon: entry.id,
                    reason,
                })?;
            if weapons.contains_key(&entry.id) {
                return Err(ConfigError::DuplicateWeapon(entry.id));
            }
            weapons.insert(entry.id, entry);
        }
        Ok(Self { weapons })
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let entries: Vec<WeaponEntry> = ron::from_str(source)?;
        Self::from_entries(entries)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let entries: Vec<WeaponEntry> = serde_json::from_str(source)?;
        Self::from_entries(entries)
    }

    /// Load by extension: `.json` as JSON, anything else as RON
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source)?,
            _ => Self::from_ron_str(&source)?,
        };
        info!(path = %path.display(), weapons = catalog.len(), "weapon catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, id: WeaponRef) -> Option<&WeaponEntry> {
        self.weapons.get(&id)
    }

    pub fn delivery(&self, id: WeaponRef) -> Option<&DeliveryStrategy> {
        self.weapons.get(&id).map(|w| &w.delivery)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponEntry> {
        self.weapons.values()
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn to_json(&self) -> String {
        let entries: Vec<&WeaponEntry> = self.weapons.values().collect();
        serde_json::to_string_pretty(&entries).unwrap_or_default()
    }
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Authoritative sessions older than this are dropped
    pub session_ttl_ms: i64,
    pub tracing: TracingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
            tracing: TracingConfig::default(),
        }
    }
}
