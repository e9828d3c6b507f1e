//! The read/write gate.

use uam_common::{AccessLevel, AccessMode, ObjectId, ObjectRef, ObjectType};

use super::AccessHandler;
use crate::actor::{ActorContext, ActorKey};
use crate::cache::access::DecisionKey;
use crate::error::EngineResult;
use crate::groups::AccessGroup;
use crate::membership::ResolveContext;

impl AccessHandler {
    /// Whether the actor may read the object.
    ///
    /// Objects no group governs are public. A governed object is readable
    /// when at least one group it is an active member of is usable by the
    /// actor. `for_preview` also admits actors with the manage capability.
    pub fn check_object_access(
        &self,
        actor: &(impl ActorContext + ?Sized),
        object_type: impl Into<ObjectType>,
        object_id: impl Into<ObjectId>,
        for_preview: bool,
    ) -> bool {
        let key = DecisionKey {
            actor: ActorKey::new(actor, &self.config.manage_capability),
            mode: AccessMode::Read,
            preview: for_preview,
            object: ObjectRef::new(object_type, object_id),
        };
        self.decide(key)
    }

    /// Whether the actor may modify the object, evaluated against each
    /// group's write access.
    pub fn check_object_write_access(
        &self,
        actor: &(impl ActorContext + ?Sized),
        object_type: impl Into<ObjectType>,
        object_id: impl Into<ObjectId>,
    ) -> bool {
        let key = DecisionKey {
            actor: ActorKey::new(actor, &self.config.manage_capability),
            mode: AccessMode::Write,
            preview: false,
            object: ObjectRef::new(object_type, object_id),
        };
        self.decide(key)
    }

    /// Memoized `evaluate`. A store failure denies access without being
    /// remembered, so the next call retries the store.
    fn decide(&self, key: DecisionKey) -> bool {
        if let Some(access) = self.cache.decision(&key) {
            return access;
        }

        let epoch = self.cache.epoch();
        match self.evaluate(&key) {
            Ok(access) => {
                self.cache.store_decision(key, access, epoch);
                access
            }
            Err(e) => {
                tracing::error!(object = %key.object, error = %e, "Failed to load user groups, denying access");
                false
            }
        }
    }

    #[tracing::instrument(skip_all, fields(object = %key.object, mode = ?key.mode, preview = key.preview))]
    fn evaluate(&self, key: &DecisionKey) -> EngineResult<bool> {
        let actor = &key.actor;
        let object = &key.object;

        if self.is_full_access(actor) {
            return Ok(true);
        }
        if key.preview && actor.can_manage {
            return Ok(true);
        }
        if self.config.authors_has_access_to_own && self.is_author(actor, object) {
            return Ok(true);
        }

        let groups = self.known_groups()?;

        let ctx = self.resolve_context();
        let mut governed = false;

        for group in groups.values() {
            let membership = group.is_member(&ctx, &object.object_type, &object.id);
            if membership.is_none() && !group.has_assignment_record(&object.object_type, &object.id)
            {
                continue;
            }

            governed = true;
            if membership.is_some() && self.may_use_group(&ctx, group.as_ref(), actor, key.mode) {
                tracing::debug!(group = %group.id(), "Access granted by group");
                return Ok(true);
            }
        }

        if governed {
            tracing::debug!("No usable group governs the object");
        }
        Ok(!governed)
    }

    /// Whether the actor may rely on the group for `mode`: the access level
    /// admits them and their address passes the IP restriction.
    pub(crate) fn may_use_group(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        actor: &ActorKey,
        mode: AccessMode,
    ) -> bool {
        if !group.is_ip_allowed(actor.ip) {
            return false;
        }

        match group.access_level(mode) {
            AccessLevel::All => true,
            AccessLevel::Group => self.actor_in_group(ctx, group, actor),
            AccessLevel::None => false,
        }
    }

    pub(crate) fn is_author(&self, actor: &ActorKey, object: &ObjectRef) -> bool {
        let Some(actor_id) = actor.id.as_ref() else {
            return false;
        };
        if !self.types.is_post_type(&object.object_type) {
            return false;
        }

        match self.content.object(&object.object_type, &object.id) {
            Ok(Some(content)) => content.author.as_ref() == Some(actor_id),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(%object, error = %e, "Failed to read object author");
                false
            }
        }
    }
}
