//! Access Decision Cache
//!
//! Memoizes `(actor, mode, object)` decisions and per-family excluded
//! sets. Entries for an object type are dropped whenever a group touching
//! that type changes; excluded sets are dropped on any change.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uam_common::{AccessMode, ObjectId, ObjectRef, ObjectType};

use crate::actor::ActorKey;
use crate::objects::MembershipFamily;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DecisionKey {
    pub actor: ActorKey,
    pub mode: AccessMode,
    pub preview: bool,
    pub object: ObjectRef,
}

/// Per-resolver memo of access decisions.
#[derive(Debug, Default)]
pub struct AccessCache {
    decisions: DashMap<DecisionKey, bool>,
    excluded: DashMap<(ActorKey, MembershipFamily), Arc<BTreeSet<ObjectId>>>,
    /// Bumped on every invalidation so results computed from stale groups
    /// are not stored after the fact.
    epoch: AtomicU64,
}

impl AccessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn decision(&self, key: &DecisionKey) -> Option<bool> {
        self.decisions.get(key).map(|entry| *entry)
    }

    pub(crate) fn store_decision(&self, key: DecisionKey, access: bool, epoch: u64) {
        if self.epoch() == epoch {
            self.decisions.insert(key, access);
        }
    }

    pub(crate) fn excluded(
        &self,
        actor: &ActorKey,
        family: &MembershipFamily,
    ) -> Option<Arc<BTreeSet<ObjectId>>> {
        self.excluded
            .get(&(actor.clone(), family.clone()))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn store_excluded(
        &self,
        actor: ActorKey,
        family: MembershipFamily,
        ids: Arc<BTreeSet<ObjectId>>,
        epoch: u64,
    ) {
        if self.epoch() == epoch {
            self.excluded.insert((actor, family), ids);
        }
    }

    /// Drop every decision about objects of `object_type`.
    pub fn invalidate_object_type(&self, object_type: &ObjectType) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.decisions
            .retain(|key, _| &key.object.object_type != object_type);
        self.excluded.clear();
    }

    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.decisions.clear();
        self.excluded.clear();
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty() && self.excluded.is_empty()
    }
}
