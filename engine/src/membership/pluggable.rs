//! Membership of host-registered pluggable objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use uam_common::{ObjectId, ObjectRef, ObjectType};

use super::{MembershipHandler, ObjectMembership, ResolveContext};
use crate::groups::AccessGroup;
use crate::objects::{MembershipFamily, PluggableObject};

/// Resolves membership through the parents a pluggable object reports.
#[derive(Debug, Clone)]
pub struct PluggableMembershipHandler {
    object: Arc<dyn PluggableObject>,
}

impl PluggableMembershipHandler {
    pub fn new(object: Arc<dyn PluggableObject>) -> Self {
        Self { object }
    }
}

impl MembershipHandler for PluggableMembershipHandler {
    fn family(&self) -> MembershipFamily {
        MembershipFamily::Pluggable(self.object.object_type())
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
            membership.inherit_from(ctx, group, &self.object.parents(object_id));
        }

        membership
    }

    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType> {
        let object_type = self.object.object_type();
        let mut objects: BTreeMap<ObjectId, ObjectType> = group
            .assigned_objects(ctx, &object_type)
            .into_keys()
            .map(|id| (id, object_type.clone()))
            .collect();

        if lock_recursive {
            for id in self.object.all_ids() {
                if objects.contains_key(&id) {
                    continue;
                }
                let inherited = self
                    .object
                    .parents(&id)
                    .iter()
                    .any(|parent| group.assignment_for(ctx, parent).is_some());
                if inherited {
                    objects.insert(id, object_type.clone());
                }
            }
        }

        objects
    }
}
