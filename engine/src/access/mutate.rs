//! Group mutations. Persistence happens first; caches are invalidated only
//! once the store accepted the change.

use std::collections::BTreeSet;

use uam_common::{DynamicGroupId, GroupId, ObjectType};

use super::AccessHandler;
use crate::error::{EngineError, EngineResult};
use crate::groups::{AccessGroup, DynamicUserGroup, UserGroup};
use crate::objects::MembershipFamily;
use crate::relations::RelationMapKey;

impl AccessHandler {
    /// Loads a stored group for editing.
    pub fn user_group(&self, id: u64) -> EngineResult<UserGroup> {
        self.groups
            .load(id)?
            .ok_or(EngineError::GroupNotFound(GroupId::Stored(id)))
    }

    /// Validates and persists the group, assigning an id to new groups.
    #[tracing::instrument(skip_all, fields(group = %group.id(), name = group.name()))]
    pub fn save_user_group(&self, group: &mut UserGroup) -> EngineResult<u64> {
        group.validate()?;
        self.warn_unregistered_types(&*group);

        let previous = if group.is_new() {
            None
        } else {
            self.groups.load(group.stored_id())?
        };

        let id = self.groups.persist(group)?;
        group.assign_id(id);

        let current: &dyn AccessGroup = group;
        self.invalidate_group_change(previous.as_ref().map(|g| g as &dyn AccessGroup), Some(current));
        tracing::info!(id, "User group saved");
        Ok(id)
    }

    /// Deletes the group and every assignment it held.
    #[tracing::instrument(skip(self))]
    pub fn delete_user_group(&self, id: u64) -> EngineResult<()> {
        let group = self.user_group(id)?;
        self.groups.delete(id)?;

        self.invalidate_group_change(Some(&group as &dyn AccessGroup), None);
        tracing::info!("User group deleted");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(group = %group.id()))]
    pub fn save_dynamic_user_group(&self, group: &DynamicUserGroup) -> EngineResult<()> {
        self.warn_unregistered_types(group);
        let previous = self.find_dynamic_group(group.dynamic_id())?;
        self.groups.persist_dynamic(group)?;

        let current: &dyn AccessGroup = group;
        self.invalidate_group_change(previous.as_ref().map(|g| g as &dyn AccessGroup), Some(current));
        tracing::info!("Dynamic user group saved");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(group = %id))]
    pub fn delete_dynamic_user_group(&self, id: &DynamicGroupId) -> EngineResult<()> {
        let group = self
            .find_dynamic_group(id)?
            .ok_or_else(|| EngineError::GroupNotFound(GroupId::Dynamic(id.clone())))?;
        self.groups.delete_dynamic(id)?;

        self.invalidate_group_change(Some(&group as &dyn AccessGroup), None);
        tracing::info!("Dynamic user group deleted");
        Ok(())
    }

    /// Signals a structural change in the content graph.
    pub fn invalidate_relations(&self, key: RelationMapKey) {
        self.relations.invalidate(key);
        self.cache.invalidate_all();
    }

    /// Drops every cached group, relation and decision.
    pub fn invalidate_all(&self) {
        self.forget_groups();
        self.relations.invalidate_all();
        self.cache.invalidate_all();
    }

    /// Assignments of unregistered types still govern their objects, but
    /// nothing can ever be a member through them.
    fn warn_unregistered_types(&self, group: &dyn AccessGroup) {
        for object_type in group.assignments().object_types() {
            if !self.types.is_valid_object_type(&object_type) {
                tracing::warn!(%object_type, "Group assigns objects of an unregistered type");
            }
        }
    }

    fn find_dynamic_group(&self, id: &DynamicGroupId) -> EngineResult<Option<DynamicUserGroup>> {
        Ok(self
            .groups
            .load_dynamic_groups()?
            .into_iter()
            .find(|group| group.dynamic_id() == id))
    }

    /// Drops decisions for every object type either version of the group
    /// touches, including types inheriting from them. Changes to user or
    /// role membership, access levels or IP ranges change who may use the
    /// group, so they drop everything.
    fn invalidate_group_change(
        &self,
        previous: Option<&dyn AccessGroup>,
        current: Option<&dyn AccessGroup>,
    ) {
        self.forget_groups();

        let mut object_types = BTreeSet::new();
        for group in previous.iter().chain(current.iter()) {
            object_types.extend(group.assignments().object_types());
        }

        let usage_changed = match (previous, current) {
            (Some(previous), Some(current)) => {
                previous.read_access() != current.read_access()
                    || previous.write_access() != current.write_access()
                    || previous.ip_ranges() != current.ip_ranges()
            }
            _ => true,
        };
        let actor_types_changed = object_types
            .iter()
            .any(|object_type| matches!(object_type.as_str(), ObjectType::USER | ObjectType::ROLE));

        if usage_changed || actor_types_changed {
            self.cache.invalidate_all();
            return;
        }

        let mut families: BTreeSet<MembershipFamily> = object_types
            .iter()
            .filter_map(|object_type| self.types.family(object_type))
            .collect();
        if self.config.lock_recursive {
            if families.contains(&MembershipFamily::Term) {
                families.insert(MembershipFamily::Post);
            }
            families.extend(
                self.types
                    .families()
                    .into_iter()
                    .filter(|family| matches!(family, MembershipFamily::Pluggable(_))),
            );
        }

        for family in &families {
            for object_type in self.types.object_types_of(family) {
                self.cache.invalidate_object_type(&object_type);
            }
        }
        for object_type in &object_types {
            self.cache.invalidate_object_type(object_type);
        }
    }
}
