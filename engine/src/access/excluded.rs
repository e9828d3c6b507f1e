//! Excluded sets: objects the actor may not read, for listing filters.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use uam_common::{AccessMode, ObjectId, ObjectRef, ObjectType};

use super::AccessHandler;
use crate::actor::{ActorContext, ActorKey};
use crate::error::EngineResult;
use crate::objects::MembershipFamily;

impl AccessHandler {
    /// Posts the actor may not read.
    pub fn excluded_posts(&self, actor: &(impl ActorContext + ?Sized)) -> Arc<BTreeSet<ObjectId>> {
        self.excluded_objects(actor, &MembershipFamily::Post)
    }

    /// Terms the actor may not read.
    pub fn excluded_terms(&self, actor: &(impl ActorContext + ?Sized)) -> Arc<BTreeSet<ObjectId>> {
        self.excluded_objects(actor, &MembershipFamily::Term)
    }

    /// Every object of the family for which `check_object_access` denies
    /// the actor. Computed from each group's full object set once per cache
    /// epoch.
    pub fn excluded_objects(
        &self,
        actor: &(impl ActorContext + ?Sized),
        family: &MembershipFamily,
    ) -> Arc<BTreeSet<ObjectId>> {
        let actor = ActorKey::new(actor, &self.config.manage_capability);
        if let Some(excluded) = self.cache.excluded(&actor, family) {
            return excluded;
        }

        let epoch = self.cache.epoch();
        match self.compute_excluded(&actor, family) {
            Ok(excluded) => {
                let excluded = Arc::new(excluded);
                self.cache
                    .store_excluded(actor, family.clone(), Arc::clone(&excluded), epoch);
                excluded
            }
            Err(e) => {
                tracing::error!(%family, error = %e, "Failed to load user groups, excluding every object");
                let ctx = self.resolve_context();
                Arc::new(
                    self.types
                        .object_types_of(family)
                        .iter()
                        .flat_map(|object_type| ctx.all_ids_of_type(object_type))
                        .collect(),
                )
            }
        }
    }

    #[tracing::instrument(skip_all, fields(%family))]
    fn compute_excluded(
        &self,
        actor: &ActorKey,
        family: &MembershipFamily,
    ) -> EngineResult<BTreeSet<ObjectId>> {
        if self.is_full_access(actor) {
            return Ok(BTreeSet::new());
        }

        let object_types = self.types.object_types_of(family);
        let ctx = self.resolve_context();
        let groups = self.known_groups()?;

        let mut governed: BTreeMap<ObjectId, ObjectType> = BTreeMap::new();
        let mut readable: BTreeSet<ObjectId> = BTreeSet::new();

        for group in groups.values() {
            let members = group.full_objects(&ctx, family);

            for object_type in &object_types {
                for (id, _) in group.assignments().objects_of_type(object_type) {
                    governed
                        .entry(id.clone())
                        .or_insert_with(|| object_type.clone());
                }
            }

            if self.may_use_group(&ctx, group.as_ref(), actor, AccessMode::Read) {
                readable.extend(members.keys().cloned());
            }
            governed.extend(members);
        }

        let check_authors = self.config.authors_has_access_to_own && actor.id.is_some();

        Ok(governed
            .into_iter()
            .filter(|(id, _)| !readable.contains(id))
            .filter(|(id, object_type)| {
                !check_authors
                    || !self.is_author(actor, &ObjectRef::new(object_type.clone(), id.clone()))
            })
            .map(|(id, _)| id)
            .collect())
    }
}
