//! Access Resolution
//!
//! `AccessHandler` is the engine's entry point. It owns the collaborators
//! injected by the host, the relation snapshots and the decision memo, and
//! answers the read/write gate, the group views and the excluded sets.

mod check;
mod excluded;
mod mutate;
mod views;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use uam_common::{GroupId, ObjectId, ObjectRef, ObjectType, NOT_LOGGED_IN_USER_ID};

use crate::actor::ActorKey;
use crate::cache::{AccessCache, CacheProvider, InMemoryCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::groups::AccessGroup;
use crate::membership::{MembershipHandler, MembershipHandlers, ResolveContext};
use crate::objects::{ObjectTypeRegistry, PluggableObject};
use crate::relations::ObjectRelationMap;
use crate::store::{ContentStore, GroupStore};

/// Groups keyed by id.
pub type GroupMap = BTreeMap<GroupId, Arc<dyn AccessGroup>>;

/// Resolves group membership and access decisions.
///
/// A handler is meant to live for one request. Decisions and excluded sets
/// are memoized until the next group mutation or `invalidate_all`, not
/// until the clock passes an assignment's bounds, so a handler kept across
/// requests must be invalidated to notice expired or newly active
/// assignments.
pub struct AccessHandler {
    content: Arc<dyn ContentStore>,
    groups: Arc<dyn GroupStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    types: Arc<ObjectTypeRegistry>,
    handlers: MembershipHandlers,
    relations: ObjectRelationMap,
    cache: AccessCache,
    known_groups: RwLock<Option<Arc<GroupMap>>>,
    /// Bumped by `forget_groups` so a load racing it is not published.
    groups_epoch: AtomicU64,
}

impl fmt::Debug for AccessHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessHandler")
            .field("config", &self.config)
            .field("types", &self.types)
            .field("handlers", &self.handlers)
            .field("cached_decisions", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AccessHandler`].
pub struct AccessHandlerBuilder {
    content: Arc<dyn ContentStore>,
    groups: Arc<dyn GroupStore>,
    cache: Option<Arc<dyn CacheProvider>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<EngineConfig>,
    pluggables: Vec<Arc<dyn PluggableObject>>,
    handlers: Vec<Arc<dyn MembershipHandler>>,
}

impl AccessHandlerBuilder {
    /// Cache for relation snapshots. Defaults to a process-local cache.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to `EngineConfig::from_env()`.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn pluggable(mut self, object: Arc<dyn PluggableObject>) -> Self {
        self.pluggables.push(object);
        self
    }

    /// Replaces the built-in handler of the same family.
    #[must_use]
    pub fn membership_handler(mut self, handler: Arc<dyn MembershipHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> AccessHandler {
        let config = self.config.unwrap_or_else(EngineConfig::from_env);
        let cache: Arc<dyn CacheProvider> = match self.cache {
            Some(cache) => cache,
            None => Arc::new(InMemoryCache::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let mut types = ObjectTypeRegistry::from_store(self.content.as_ref());
        for object in self.pluggables {
            types.register_pluggable(object);
        }
        let types = Arc::new(types);

        let mut handlers = MembershipHandlers::for_registry(&types);
        for handler in self.handlers {
            handlers.register(handler);
        }

        let relations = ObjectRelationMap::new(
            Arc::clone(&self.content),
            Arc::clone(&types),
            cache,
            config.clone(),
        );

        tracing::debug!(families = ?handlers, "Access handler ready");

        AccessHandler {
            content: self.content,
            groups: self.groups,
            clock,
            config,
            types,
            handlers,
            relations,
            cache: AccessCache::new(),
            known_groups: RwLock::new(None),
            groups_epoch: AtomicU64::new(0),
        }
    }
}

impl AccessHandler {
    pub fn builder(
        content: Arc<dyn ContentStore>,
        groups: Arc<dyn GroupStore>,
    ) -> AccessHandlerBuilder {
        AccessHandlerBuilder {
            content,
            groups,
            cache: None,
            clock: None,
            config: None,
            pluggables: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn types(&self) -> &ObjectTypeRegistry {
        &self.types
    }

    pub const fn relations(&self) -> &ObjectRelationMap {
        &self.relations
    }

    pub const fn handlers(&self) -> &MembershipHandlers {
        &self.handlers
    }

    /// Lookup context for group membership queries, evaluated at the
    /// clock's current time.
    pub fn resolve_context(&self) -> ResolveContext<'_> {
        ResolveContext {
            content: self.content.as_ref(),
            types: &self.types,
            relations: &self.relations,
            handlers: &self.handlers,
            now: self.clock.now(),
            lock_recursive: self.config.lock_recursive,
        }
    }

    /// Every stored and dynamic group record, loaded once until the next
    /// group mutation.
    pub(crate) fn known_groups(&self) -> EngineResult<Arc<GroupMap>> {
        if let Some(groups) = self.known_groups.read().as_ref() {
            return Ok(Arc::clone(groups));
        }

        let epoch = self.groups_epoch.load(Ordering::Acquire);
        let mut groups = GroupMap::new();
        for group in self.groups.load_all()? {
            groups.insert(group.id(), Arc::new(group));
        }
        for group in self.groups.load_dynamic_groups()? {
            groups.insert(group.id(), Arc::new(group));
        }
        tracing::debug!(count = groups.len(), "Loaded user groups");

        let groups = Arc::new(groups);
        let mut memo = self.known_groups.write();
        if self.groups_epoch.load(Ordering::Acquire) == epoch {
            *memo = Some(Arc::clone(&groups));
        }
        Ok(groups)
    }

    pub(crate) fn forget_groups(&self) {
        let mut memo = self.known_groups.write();
        self.groups_epoch.fetch_add(1, Ordering::AcqRel);
        *memo = None;
    }

    fn is_full_access(&self, actor: &ActorKey) -> bool {
        actor.roles.contains(&self.config.full_access_role)
    }

    /// Whether the actor belongs to the group, ignoring access levels.
    pub(crate) fn actor_in_group(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        actor: &ActorKey,
    ) -> bool {
        if let Some(dynamic) = group.as_dynamic() {
            return dynamic.matches_actor(actor.id.as_ref(), &actor.roles);
        }

        let Some(user_id) = actor.id.as_ref() else {
            let anonymous = ObjectId::new(NOT_LOGGED_IN_USER_ID);
            return group
                .assignments()
                .assignment(&ObjectType::user(), &anonymous)
                .is_some_and(|info| info.is_active_at(ctx.now));
        };

        let user = ObjectRef::new(ObjectType::user(), user_id.clone());
        if group.assignment_for(ctx, &user).is_some() {
            return true;
        }

        actor.roles.iter().any(|role| {
            let role = ObjectRef::new(ObjectType::role(), role.as_str());
            group.assignment_for(ctx, &role).is_some()
        })
    }
}
