//! Role membership.

use std::collections::BTreeMap;

use uam_common::{ObjectId, ObjectRef, ObjectType};

use super::{MembershipHandler, ObjectMembership, ResolveContext};
use crate::groups::AccessGroup;
use crate::objects::MembershipFamily;

/// Roles are flat: membership is the role's own assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleMembershipHandler;

impl MembershipHandler for RoleMembershipHandler {
    fn family(&self) -> MembershipFamily {
        MembershipFamily::Role
    }

    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        _lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let object = ObjectRef::new(object_type.clone(), object_id.clone());
        ObjectMembership::direct(group.assignment_for(ctx, &object))
    }

    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        _lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType> {
        group
            .assigned_objects(ctx, &ObjectType::role())
            .into_keys()
            .map(|id| (id, ObjectType::role()))
            .collect()
    }
}
