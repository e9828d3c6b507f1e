//! Membership Handlers
//!
//! One handler per membership family answers whether an object belongs to
//! a group, directly or through the hierarchy, and enumerates every object
//! of the family a group governs. Handlers are looked up through
//! `MembershipHandlers`; an unregistered family yields
//! `EngineError::MissingMembershipHandler`.

pub mod pluggable;
pub mod post;
pub mod role;
pub mod term;
pub mod user;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uam_common::{AssignmentInformation, ObjectId, ObjectRef, ObjectType};

use crate::error::{EngineError, EngineResult};
use crate::groups::AccessGroup;
use crate::objects::{MembershipFamily, ObjectTypeRegistry};
use crate::relations::ObjectRelationMap;
use crate::store::ContentStore;

pub use pluggable::PluggableMembershipHandler;
pub use post::PostMembershipHandler;
pub use role::RoleMembershipHandler;
pub use term::TermMembershipHandler;
pub use user::UserMembershipHandler;

/// Everything a membership lookup reads.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub content: &'a dyn ContentStore,
    pub types: &'a ObjectTypeRegistry,
    pub relations: &'a ObjectRelationMap,
    pub handlers: &'a MembershipHandlers,
    pub now: DateTime<Utc>,
    pub lock_recursive: bool,
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("now", &self.now)
            .field("lock_recursive", &self.lock_recursive)
            .finish_non_exhaustive()
    }
}

impl ResolveContext<'_> {
    /// Every id of a concrete object type, including pluggable ones.
    pub fn all_ids_of_type(&self, object_type: &ObjectType) -> BTreeSet<ObjectId> {
        if let Some(pluggable) = self.types.pluggable(object_type) {
            return pluggable.all_ids();
        }

        self.content
            .all_ids_of_type(object_type)
            .unwrap_or_else(|e| {
                tracing::warn!(%object_type, error = %e, "Failed to list objects");
                BTreeSet::new()
            })
    }

    pub fn user_roles(&self, user_id: &ObjectId) -> BTreeSet<String> {
        self.content.user_roles(user_id).unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "Failed to read user roles");
            BTreeSet::new()
        })
    }
}

/// Membership inherited from a related object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedMembership {
    pub object: ObjectRef,
    pub assignment: AssignmentInformation,
}

/// Key of a flattened membership result: the object itself, or the
/// hierarchy it inherits from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MembershipKey {
    Object(ObjectId),
    Inherited,
}

/// Related objects a membership is inherited from, by family name.
pub type RecursiveMembership = BTreeMap<String, BTreeMap<ObjectId, AssignmentInformation>>;

/// How one object belongs to one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMembership {
    /// Active assignment of the object itself.
    pub assignment: Option<AssignmentInformation>,
    /// Active memberships of related objects, nearest first.
    pub inherited: Vec<InheritedMembership>,
}

impl ObjectMembership {
    pub const fn direct(assignment: Option<AssignmentInformation>) -> Self {
        Self {
            assignment,
            inherited: Vec::new(),
        }
    }

    pub fn is_member(&self) -> bool {
        self.assignment.is_some() || !self.inherited.is_empty()
    }

    /// Direct assignment wins; otherwise the nearest inherited one applies.
    pub fn effective(&self) -> Option<AssignmentInformation> {
        self.assignment
            .or_else(|| self.inherited.first().map(|inherited| inherited.assignment))
    }

    /// Flattened `id -> assignment` view; `MembershipKey::Inherited` holds
    /// the nearest inherited assignment.
    pub fn entries(&self, object_id: &ObjectId) -> BTreeMap<MembershipKey, AssignmentInformation> {
        let mut entries = BTreeMap::new();
        if let Some(assignment) = self.assignment {
            entries.insert(MembershipKey::Object(object_id.clone()), assignment);
        }
        if let Some(inherited) = self.inherited.first() {
            entries.insert(MembershipKey::Inherited, inherited.assignment);
        }
        entries
    }

    /// Inherited memberships grouped by family.
    pub fn recursive(&self, types: &ObjectTypeRegistry) -> RecursiveMembership {
        let mut recursive = RecursiveMembership::new();
        for inherited in &self.inherited {
            let family = types
                .family(&inherited.object.object_type)
                .map_or_else(|| inherited.object.object_type.to_string(), |f| f.name().to_string());
            recursive
                .entry(family)
                .or_default()
                .entry(inherited.object.id.clone())
                .or_insert(inherited.assignment);
        }
        recursive
    }

    /// Records every active membership among `candidates`, skipping objects
    /// already recorded.
    pub(crate) fn inherit_from<'r>(
        &mut self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        candidates: impl IntoIterator<Item = &'r ObjectRef>,
    ) {
        for candidate in candidates {
            if self.inherited.iter().any(|seen| &seen.object == candidate) {
                continue;
            }
            if let Some(assignment) = group.assignment_for(ctx, candidate) {
                self.inherited.push(InheritedMembership {
                    object: candidate.clone(),
                    assignment,
                });
            }
        }
    }
}

/// Resolves membership for one family.
pub trait MembershipHandler: Send + Sync {
    fn family(&self) -> MembershipFamily;

    /// Direct membership plus, with `lock_recursive`, membership inherited
    /// from ancestors and containers.
    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership;

    /// Like `object_membership`, additionally looking down the tree.
    fn full_object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        self.object_membership(ctx, group, lock_recursive, object_type, object_id)
    }

    /// Every object of the family that is a member of `group`.
    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType>;
}

/// Registry of membership handlers by family.
#[derive(Clone, Default)]
pub struct MembershipHandlers {
    handlers: BTreeMap<MembershipFamily, Arc<dyn MembershipHandler>>,
}

impl fmt::Debug for MembershipHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

impl MembershipHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role, user, term and post handlers plus one handler per pluggable
    /// object in the registry.
    pub fn for_registry(types: &ObjectTypeRegistry) -> Self {
        let mut handlers = Self::new();
        handlers.register(Arc::new(RoleMembershipHandler));
        handlers.register(Arc::new(UserMembershipHandler));
        handlers.register(Arc::new(TermMembershipHandler));
        handlers.register(Arc::new(PostMembershipHandler));
        for object in types.pluggables() {
            handlers.register(Arc::new(PluggableMembershipHandler::new(Arc::clone(object))));
        }
        handlers
    }

    pub fn register(&mut self, handler: Arc<dyn MembershipHandler>) {
        self.handlers.insert(handler.family(), handler);
    }

    pub fn get(&self, family: &MembershipFamily) -> Option<&dyn MembershipHandler> {
        self.handlers.get(family).map(|handler| handler.as_ref())
    }

    /// Handler for a concrete object type.
    pub fn for_object_type(
        &self,
        types: &ObjectTypeRegistry,
        object_type: &ObjectType,
    ) -> EngineResult<&dyn MembershipHandler> {
        types
            .family(object_type)
            .and_then(|family| self.get(&family))
            .ok_or_else(|| EngineError::MissingMembershipHandler {
                object_type: object_type.clone(),
            })
    }

    pub fn for_family(&self, family: &MembershipFamily) -> EngineResult<&dyn MembershipHandler> {
        self.get(family)
            .ok_or_else(|| EngineError::MissingMembershipHandler {
                object_type: ObjectType::new(family.name()),
            })
    }
}
