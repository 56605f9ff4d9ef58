use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use initiative_access_core::AppError;
use serde::{Deserialize, Serialize};

/// Named capabilities scoped to an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    /// Allows listing and opening documents.
    ViewDocs,
    /// Allows creating documents.
    CreateDocs,
    /// Allows listing and opening projects.
    ViewProjects,
    /// Allows creating projects.
    CreateProjects,
    /// Allows listing and opening queues.
    ViewQueues,
    /// Allows creating queues.
    CreateQueues,
}

impl PermissionKey {
    /// Returns a stable registry value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewDocs => "docs.view",
            Self::CreateDocs => "docs.create",
            Self::ViewProjects => "projects.view",
            Self::CreateProjects => "projects.create",
            Self::ViewQueues => "queues.view",
            Self::CreateQueues => "queues.create",
        }
    }

    /// Returns the boolean field name used by role and membership payloads.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ViewDocs => "can_view_docs",
            Self::CreateDocs => "can_create_docs",
            Self::ViewProjects => "can_view_projects",
            Self::CreateProjects => "can_create_projects",
            Self::ViewQueues => "can_view_queues",
            Self::CreateQueues => "can_create_queues",
        }
    }

    /// Returns whether this key grants read access rather than creation.
    #[must_use]
    pub fn is_view(&self) -> bool {
        matches!(self, Self::ViewDocs | Self::ViewProjects | Self::ViewQueues)
    }

    /// Returns all known permission keys.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionKey] = &[
            PermissionKey::ViewDocs,
            PermissionKey::CreateDocs,
            PermissionKey::ViewProjects,
            PermissionKey::CreateProjects,
            PermissionKey::ViewQueues,
            PermissionKey::CreateQueues,
        ];

        ALL
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PermissionKey::all()
            .iter()
            .find(|key| key.as_str() == value || key.field_name() == value)
            .copied()
            .ok_or_else(|| AppError::Validation(format!("unknown permission key '{value}'")))
    }
}

/// Entity families that carry a view/create permission pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Documents.
    Docs,
    /// Projects.
    Projects,
    /// Queues.
    Queues,
}

impl EntityKind {
    /// Returns the permission needed to see entities of this kind.
    #[must_use]
    pub fn view_key(&self) -> PermissionKey {
        match self {
            Self::Docs => PermissionKey::ViewDocs,
            Self::Projects => PermissionKey::ViewProjects,
            Self::Queues => PermissionKey::ViewQueues,
        }
    }

    /// Returns the permission needed to create entities of this kind.
    #[must_use]
    pub fn create_key(&self) -> PermissionKey {
        match self {
            Self::Docs => PermissionKey::CreateDocs,
            Self::Projects => PermissionKey::CreateProjects,
            Self::Queues => PermissionKey::CreateQueues,
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docs => "docs",
            Self::Projects => "projects",
            Self::Queues => "queues",
        }
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "docs" | "documents" => Ok(Self::Docs),
            "projects" => Ok(Self::Projects),
            "queues" => Ok(Self::Queues),
            _ => Err(AppError::Validation(format!(
                "unknown entity kind '{value}'"
            ))),
        }
    }
}

/// Effective permission mapping over every registry key.
///
/// The set is total: a key that was never set reads as `false`. It is derived
/// on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<PermissionKey, bool>);

impl PermissionSet {
    /// Creates a set with every key denied.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_pairs(PermissionKey::all().iter().map(|key| (*key, false)))
    }

    /// Creates a set with every key granted.
    #[must_use]
    pub fn all_granted() -> Self {
        Self::from_pairs(PermissionKey::all().iter().map(|key| (*key, true)))
    }

    /// Creates a set from explicit key/value pairs; missing keys are denied.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PermissionKey, bool)>) -> Self {
        let mut values: BTreeMap<PermissionKey, bool> = PermissionKey::all()
            .iter()
            .map(|key| (*key, false))
            .collect();
        values.extend(pairs);
        Self(values)
    }

    /// Returns whether the key is granted.
    #[must_use]
    pub fn get(&self, key: PermissionKey) -> bool {
        self.0.get(&key).copied().unwrap_or(false)
    }

    /// Sets the value for one key.
    pub fn set(&mut self, key: PermissionKey, value: bool) {
        self.0.insert(key, value);
    }

    /// Returns the per-key logical OR of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_pairs(
            PermissionKey::all()
                .iter()
                .map(|key| (*key, self.get(*key) || other.get(*key))),
        )
    }

    /// Iterates over granted keys in registry order.
    pub fn granted(&self) -> impl Iterator<Item = PermissionKey> + '_ {
        PermissionKey::all()
            .iter()
            .copied()
            .filter(|key| self.get(*key))
    }

    /// Returns keys whose value differs between both sets.
    #[must_use]
    pub fn differences(&self, other: &Self) -> Vec<PermissionKey> {
        PermissionKey::all()
            .iter()
            .copied()
            .filter(|key| self.get(*key) != other.get(*key))
            .collect()
    }
}
