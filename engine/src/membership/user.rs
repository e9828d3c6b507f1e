//! User membership.
//!
//! A user belongs to a group directly, or through one of its roles when
//! recursive locking is on.

use std::collections::BTreeMap;

use uam_common::{ObjectId, ObjectRef, ObjectType};

use super::{MembershipHandler, ObjectMembership, ResolveContext};
use crate::groups::AccessGroup;
use crate::objects::MembershipFamily;

#[derive(Debug, Clone, Copy, Default)]
pub struct UserMembershipHandler;

impl MembershipHandler for UserMembershipHandler {
    fn family(&self) -> MembershipFamily {
        MembershipFamily::User
    }

    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let object = ObjectRef::new(object_type.clone(), object_id.clone());
        let mut membership = ObjectMembership::direct(group.assignment_for(ctx, &object));

        if lock_recursive {
            let roles: Vec<ObjectRef> = ctx
                .user_roles(object_id)
                .into_iter()
                .map(|role| ObjectRef::new(ObjectType::role(), role))
                .collect();
            membership.inherit_from(ctx, group, &roles);
        }

        membership
    }

    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType> {
        let mut users: BTreeMap<ObjectId, ObjectType> = group
            .assigned_objects(ctx, &ObjectType::user())
            .into_keys()
            .map(|id| (id, ObjectType::user()))
            .collect();

        if lock_recursive {
            let roles = group.assigned_objects(ctx, &ObjectType::role());
            if !roles.is_empty() {
                for user_id in ctx.all_ids_of_type(&ObjectType::user()) {
                    let holds_role = ctx
                        .user_roles(&user_id)
                        .iter()
                        .any(|role| roles.contains_key(&ObjectId::new(role)));
                    if holds_role {
                        users.entry(user_id).or_insert_with(ObjectType::user);
                    }
                }
            }
        }

        users
    }
}
