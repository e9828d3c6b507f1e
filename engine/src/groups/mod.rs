//! User Groups
//!
//! The policy unit. Stored `UserGroup`s and identity-derived
//! `DynamicUserGroup`s share one behavior through `AccessGroup`: time
//! bounded assignments, explicit removals overriding default-type grants,
//! and membership resolution dispatched to the family handlers.

pub mod assignments;
pub mod dynamic;
pub mod ip_range;
pub mod user_group;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

use uam_common::{
    AccessLevel, AccessMode, AssignmentInformation, DefaultGroupStatus, GroupId, ObjectId,
    ObjectRef, ObjectType,
};

use crate::error::EngineResult;
use crate::membership::{ObjectMembership, RecursiveMembership, ResolveContext};
use crate::objects::{MembershipFamily, ObjectTypeRegistry};

pub use assignments::GroupAssignments;
pub use dynamic::DynamicUserGroup;
pub use ip_range::IpRange;
pub use user_group::UserGroup;

/// Shared group behavior.
pub trait AccessGroup: fmt::Debug + Send + Sync {
    fn id(&self) -> GroupId;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn read_access(&self) -> AccessLevel;

    fn write_access(&self) -> AccessLevel;

    fn ip_ranges(&self) -> &[IpRange];

    fn assignments(&self) -> &GroupAssignments;

    fn as_dyn(&self) -> &dyn AccessGroup;

    fn as_dynamic(&self) -> Option<&DynamicUserGroup> {
        None
    }

    /// Membership derived from the group's identity rather than stored
    /// assignments.
    fn implicit_assignment(
        &self,
        _ctx: &ResolveContext<'_>,
        _object: &ObjectRef,
    ) -> Option<AssignmentInformation> {
        None
    }

    /// Every object of `object_type` covered by `implicit_assignment`.
    fn implicit_objects(
        &self,
        _ctx: &ResolveContext<'_>,
        _object_type: &ObjectType,
    ) -> BTreeSet<ObjectId> {
        BTreeSet::new()
    }

    fn access_level(&self, mode: AccessMode) -> AccessLevel {
        match mode {
            AccessMode::Read => self.read_access(),
            AccessMode::Write => self.write_access(),
        }
    }

    /// An unrestricted group admits every address; a restricted one only
    /// admits known addresses inside one of its ranges.
    fn is_ip_allowed(&self, ip: Option<IpAddr>) -> bool {
        let ranges = self.ip_ranges();
        if ranges.is_empty() {
            return true;
        }
        ip.is_some_and(|ip| ranges.iter().any(|range| range.contains(ip)))
    }

    /// Default-type grant covering `object_type`, either for the concrete
    /// type or for its general type.
    fn is_default_group_for_object_type(
        &self,
        types: &ObjectTypeRegistry,
        object_type: &ObjectType,
    ) -> DefaultGroupStatus {
        let assignments = self.assignments();
        assignments
            .default_type(object_type)
            .or_else(|| {
                types
                    .general_type(object_type)
                    .and_then(|general| assignments.default_type(&general))
            })
            .map_or_else(DefaultGroupStatus::not_default, DefaultGroupStatus::from_assignment)
    }

    /// Active membership of exactly this object, without hierarchy.
    ///
    /// A direct assignment decides on its own, even when outside its time
    /// window. Without one, identity membership applies, then an explicit
    /// removal, then the default-type grant.
    fn assignment_for(
        &self,
        ctx: &ResolveContext<'_>,
        object: &ObjectRef,
    ) -> Option<AssignmentInformation> {
        let assignments = self.assignments();
        if let Some(info) = assignments.assignment(&object.object_type, &object.id) {
            return info.is_active_at(ctx.now).then_some(*info);
        }

        if let Some(info) = self.implicit_assignment(ctx, object) {
            return Some(info);
        }

        if assignments.is_removed(&object.object_type, &object.id) {
            return None;
        }

        self.is_default_group_for_object_type(ctx.types, &object.object_type)
            .assignment()
            .filter(|info| info.is_active_at(ctx.now))
    }

    /// Whether any assignment row exists for the object, active or not.
    fn has_assignment_record(&self, object_type: &ObjectType, object_id: &ObjectId) -> bool {
        self.assignments().assignment(object_type, object_id).is_some()
    }

    /// Every object of `object_type` with an active membership of its own.
    fn assigned_objects(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
    ) -> BTreeMap<ObjectId, AssignmentInformation> {
        let assignments = self.assignments();
        let mut objects: BTreeMap<ObjectId, AssignmentInformation> = assignments
            .objects_of_type(object_type)
            .filter(|(_, info)| info.is_active_at(ctx.now))
            .map(|(id, info)| (id.clone(), *info))
            .collect();

        let unassigned = |id: &ObjectId| assignments.assignment(object_type, id).is_none();

        for id in self.implicit_objects(ctx, object_type) {
            if unassigned(&id) {
                objects.insert(id, AssignmentInformation::permanent());
            }
        }

        let default = self
            .is_default_group_for_object_type(ctx.types, object_type)
            .assignment()
            .filter(|info| info.is_active_at(ctx.now));

        if let Some(default) = default {
            for id in ctx.all_ids_of_type(object_type) {
                if unassigned(&id) && !assignments.is_removed(object_type, &id) {
                    objects.entry(id).or_insert(default);
                }
            }
        }

        objects
    }

    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> EngineResult<ObjectMembership> {
        let handler = ctx.handlers.for_object_type(ctx.types, object_type)?;
        Ok(handler.object_membership(ctx, self.as_dyn(), ctx.lock_recursive, object_type, object_id))
    }

    fn full_object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> EngineResult<ObjectMembership> {
        let handler = ctx.handlers.for_object_type(ctx.types, object_type)?;
        Ok(handler.full_object_membership(
            ctx,
            self.as_dyn(),
            ctx.lock_recursive,
            object_type,
            object_id,
        ))
    }

    /// Effective assignment when the object is a member, directly or
    /// inherited. Unknown object types are never members.
    fn is_member(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> Option<AssignmentInformation> {
        match self.object_membership(ctx, object_type, object_id) {
            Ok(membership) => membership.effective(),
            Err(e) => {
                tracing::debug!(group = %self.id(), %object_type, error = %e, "Treating object as non-member");
                None
            }
        }
    }

    fn recursive_membership_for_object(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> RecursiveMembership {
        match self.full_object_membership(ctx, object_type, object_id) {
            Ok(membership) => membership.recursive(ctx.types),
            Err(e) => {
                tracing::debug!(group = %self.id(), %object_type, error = %e, "No recursive membership");
                RecursiveMembership::new()
            }
        }
    }

    /// Every member object of a family.
    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        family: &MembershipFamily,
    ) -> BTreeMap<ObjectId, ObjectType> {
        match ctx.handlers.for_family(family) {
            Ok(handler) => handler.full_objects(ctx, self.as_dyn(), ctx.lock_recursive),
            Err(e) => {
                tracing::warn!(group = %self.id(), %family, error = %e, "Cannot enumerate group objects");
                BTreeMap::new()
            }
        }
    }
}
