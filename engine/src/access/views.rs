//! Group views for presentation and editing.

use std::collections::BTreeMap;
use std::sync::Arc;

use uam_common::{AccessMode, GroupId, ObjectId, ObjectType};

use super::{AccessHandler, GroupMap};
use crate::actor::{ActorContext, ActorKey};
use crate::error::EngineResult;
use crate::groups::{AccessGroup, DynamicUserGroup};
use crate::membership::RecursiveMembership;

impl AccessHandler {
    /// Every known group.
    pub fn full_user_groups(&self) -> EngineResult<GroupMap> {
        Ok(self.known_groups()?.as_ref().clone())
    }

    /// Groups the actor belongs to: stored groups holding the actor or one
    /// of its roles, plus its identity groups (own user or not logged in,
    /// and one per role).
    pub fn actor_groups(&self, actor: &(impl ActorContext + ?Sized)) -> EngineResult<GroupMap> {
        let actor = ActorKey::new(actor, &self.config.manage_capability);
        let ctx = self.resolve_context();

        let mut groups: GroupMap = self
            .known_groups()?
            .iter()
            .filter(|(_, group)| self.actor_in_group(&ctx, group.as_ref(), &actor))
            .map(|(id, group)| (id.clone(), Arc::clone(group)))
            .collect();

        for group in identity_groups(&actor) {
            groups
                .entry(group.id())
                .or_insert_with(|| Arc::new(group) as Arc<dyn AccessGroup>);
        }

        Ok(groups)
    }

    /// Groups the actor may use for `mode`. Holders of the full access role
    /// or the manage capability may use every group.
    pub fn user_groups_for_actor(
        &self,
        actor: &(impl ActorContext + ?Sized),
        mode: AccessMode,
    ) -> EngineResult<GroupMap> {
        let actor = ActorKey::new(actor, &self.config.manage_capability);
        let ctx = self.resolve_context();
        let privileged = self.is_full_access(&actor) || actor.can_manage;

        let mut groups: GroupMap = self
            .known_groups()?
            .iter()
            .filter(|(_, group)| privileged || self.may_use_group(&ctx, group.as_ref(), &actor, mode))
            .map(|(id, group)| (id.clone(), Arc::clone(group)))
            .collect();

        for group in identity_groups(&actor) {
            groups
                .entry(group.id())
                .or_insert_with(|| Arc::new(group) as Arc<dyn AccessGroup>);
        }

        Ok(groups)
    }

    /// Groups the actor may assign objects to.
    pub fn filtered_user_groups(&self, actor: &(impl ActorContext + ?Sized)) -> EngineResult<GroupMap> {
        self.user_groups_for_actor(actor, AccessMode::Write)
    }

    /// Groups governing the object: active members and groups holding an
    /// assignment row for it. Users are also listed in their identity
    /// groups unless `ignore_dynamic` is set, which drops dynamic groups
    /// entirely.
    pub fn user_groups_for_object(
        &self,
        object_type: impl Into<ObjectType>,
        object_id: impl Into<ObjectId>,
        ignore_dynamic: bool,
    ) -> EngineResult<GroupMap> {
        let object_type = object_type.into();
        let object_id = object_id.into();
        let ctx = self.resolve_context();

        let mut groups: GroupMap = self
            .known_groups()?
            .iter()
            .filter(|(id, _)| !(ignore_dynamic && id.is_dynamic()))
            .filter(|(_, group)| {
                group.has_assignment_record(&object_type, &object_id)
                    || group.is_member(&ctx, &object_type, &object_id).is_some()
            })
            .map(|(id, group)| (id.clone(), Arc::clone(group)))
            .collect();

        if !ignore_dynamic && object_type == ObjectType::user() {
            let mut identities = vec![DynamicUserGroup::for_user(object_id.clone())];
            identities.extend(
                ctx.user_roles(&object_id)
                    .into_iter()
                    .map(|role| DynamicUserGroup::for_role(role)),
            );
            for group in identities {
                groups
                    .entry(group.id())
                    .or_insert_with(|| Arc::new(group) as Arc<dyn AccessGroup>);
            }
        }

        Ok(groups)
    }

    /// `user_groups_for_object` restricted to groups the actor may assign,
    /// so editors never see groups they cannot use.
    pub fn filtered_user_groups_for_object(
        &self,
        actor: &(impl ActorContext + ?Sized),
        object_type: impl Into<ObjectType>,
        object_id: impl Into<ObjectId>,
        ignore_dynamic: bool,
    ) -> EngineResult<GroupMap> {
        let assignable = self.filtered_user_groups(actor)?;
        let mut groups = self.user_groups_for_object(object_type, object_id, ignore_dynamic)?;
        groups.retain(|id, _| assignable.contains_key(id));
        Ok(groups)
    }

    /// Related objects each group's membership of the object is inherited
    /// from, for groups where there are any.
    pub fn recursive_membership(
        &self,
        object_type: impl Into<ObjectType>,
        object_id: impl Into<ObjectId>,
    ) -> EngineResult<BTreeMap<GroupId, RecursiveMembership>> {
        let object_type = object_type.into();
        let object_id = object_id.into();
        let ctx = self.resolve_context();

        Ok(self
            .known_groups()?
            .iter()
            .filter_map(|(id, group)| {
                let recursive = group.recursive_membership_for_object(&ctx, &object_type, &object_id);
                (!recursive.is_empty()).then(|| (id.clone(), recursive))
            })
            .collect())
    }
}

/// Dynamic groups an actor belongs to by identity alone.
fn identity_groups(actor: &ActorKey) -> Vec<DynamicUserGroup> {
    let mut groups = vec![match &actor.id {
        Some(id) => DynamicUserGroup::for_user(id.clone()),
        None => DynamicUserGroup::not_logged_in(),
    }];
    groups.extend(actor.roles.iter().map(|role| DynamicUserGroup::for_role(role.as_str())));
    groups
}
