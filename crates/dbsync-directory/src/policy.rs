//! Group policy: which directory groups this deployment manages, and the
//! database role each one grants.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use dbsync_core::{GroupId, RoleName};

use crate::error::PolicyError;

/// Mapping from directory group to granted role.
///
/// Every managed group maps to exactly one role. A group listed twice is
/// rejected rather than resolved to either role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "BTreeMap<GroupId, RoleName>")]
pub struct GroupPolicy {
    roles: BTreeMap<GroupId, RoleName>,
}

impl GroupPolicy {
    /// Create a policy. At least one group must be mapped.
    pub fn new(roles: BTreeMap<GroupId, RoleName>) -> Result<Self, PolicyError> {
        if roles.is_empty() {
            return Err(PolicyError::Empty);
        }
        Ok(Self { roles })
    }

    /// Load a policy from a JSON object such as `{"<group-id>": "<role>"}`.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let PolicyEntries(entries) = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<(GroupId, RoleName)>) -> Result<Self, PolicyError> {
        let mut roles = BTreeMap::new();
        for (group_id, role) in entries {
            if roles.contains_key(&group_id) {
                return Err(PolicyError::DuplicateGroup {
                    group_id: group_id.to_string(),
                });
            }
            roles.insert(group_id, role);
        }
        Self::new(roles)
    }

    /// Role granted by a group, if the group is managed.
    #[must_use]
    pub fn role_for(&self, group_id: &GroupId) -> Option<&RoleName> {
        self.roles.get(group_id)
    }

    /// Whether a group is managed.
    #[must_use]
    pub fn manages(&self, group_id: &GroupId) -> bool {
        self.roles.contains_key(group_id)
    }

    /// Number of managed groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Always false: an empty policy cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterate over managed groups and their roles.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &RoleName)> {
        self.roles.iter()
    }
}

impl<'de> Deserialize<'de> for GroupPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let PolicyEntries(entries) = PolicyEntries::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(de::Error::custom)
    }
}

/// Map entries in document order, duplicates kept.
struct PolicyEntries(Vec<(GroupId, RoleName)>);

impl<'de> Deserialize<'de> for PolicyEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PolicyEntriesVisitor)
    }
}

struct PolicyEntriesVisitor;

impl<'de> Visitor<'de> for PolicyEntriesVisitor {
    type Value = PolicyEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of group ids to role names")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<GroupId, RoleName>()? {
            entries.push(entry);
        }
        Ok(PolicyEntries(entries))
    }
}

impl From<GroupPolicy> for BTreeMap<GroupId, RoleName> {
    fn from(policy: GroupPolicy) -> Self {
        policy.roles
    }
}
