//! Legacy-to-target identifier maps.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use nutrilog_core::{EntityKind, FoodKey, LegacyRecord, TargetIdentity, normalize_email};
use tracing::warn;
use uuid::Uuid;

use crate::transform::{ParsedName, Transformer};

/// `legacyId -> targetId` for one entity type. A legacy id maps to at most
/// one target id; the first mapping wins.
#[derive(Debug, Clone)]
pub struct IdentityMap {
    kind: EntityKind,
    entries: HashMap<String, Uuid>,
}

impl IdentityMap {
    #[must_use]
    pub fn new(kind: EntityKind) -> Self {
        Self { kind, entries: HashMap::new() }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Records a mapping. Returns `false` when the legacy id was already
    /// mapped, in which case the existing target id is kept.
    pub fn insert(&mut self, legacy_id: impl Into<String>, target_id: Uuid) -> bool {
        match self.entries.entry(legacy_id.into()) {
            Entry::Vacant(slot) => {
                slot.insert(target_id);
                true
            },
            Entry::Occupied(slot) => {
                if *slot.get() != target_id {
                    warn!(
                        kind = %self.kind,
                        legacy_id = %slot.key(),
                        kept = %slot.get(),
                        ignored = %target_id,
                        "Conflicting identity mapping ignored"
                    );
                }
                false
            },
        }
    }

    /// Target id for a legacy id; a miss is not an error.
    #[must_use]
    pub fn resolve(&self, legacy_id: &str) -> Option<Uuid> {
        self.entries.get(legacy_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rebuilds the user map by joining legacy users with target identities on
/// case-insensitive email. Unmatched legacy users are left out.
#[must_use]
pub fn reconstruct_user_map(legacy: &[LegacyRecord], identities: &[TargetIdentity]) -> IdentityMap {
    let mut by_email: HashMap<String, Uuid> = HashMap::with_capacity(identities.len());
    for identity in identities {
        if let Some(key) = identity.email_key() {
            by_email.entry(key).or_insert(identity.id);
        }
    }

    let mut map = IdentityMap::new(EntityKind::User);
    for record in legacy {
        let Some(email) = record.non_empty_str("email") else {
            continue;
        };
        if let Some(id) = by_email.get(&normalize_email(email)) {
            map.insert(record.id(), *id);
        }
    }
    map
}

/// Rebuilds the food map by joining legacy foods, after name/brand parsing,
/// with stored foods on exact `(name, brand)`.
///
/// When several stored foods share a key, the first listed one wins for every
/// legacy food with that key.
#[must_use]
pub fn reconstruct_food_map(
    legacy: &[LegacyRecord],
    stored: &[FoodKey],
    transformer: &Transformer,
) -> IdentityMap {
    let mut by_key: HashMap<(&str, Option<&str>), Uuid> = HashMap::with_capacity(stored.len());
    for food in stored {
        by_key.entry((food.name.as_str(), food.brand.as_deref())).or_insert(food.id);
    }

    let mut map = IdentityMap::new(EntityKind::Food);
    for record in legacy {
        let ParsedName { name, brand } = transformer.food_key(record);
        if let Some(id) = by_key.get(&(name.as_str(), brand.as_deref())) {
            map.insert(record.id(), *id);
        }
    }
    map
}
