//! Actor identity supplied by the host.
//!
//! The engine never authenticates; it trusts whatever the host reports
//! for the current request.

use std::collections::BTreeSet;
use std::net::IpAddr;

use uam_common::ObjectId;

/// Identity of the actor a request runs for.
pub trait ActorContext {
    /// `None` for anonymous visitors.
    fn current_actor_id(&self) -> Option<ObjectId>;

    fn current_actor_roles(&self) -> BTreeSet<String>;

    fn current_actor_ip(&self) -> Option<IpAddr>;

    fn has_capability(&self, _capability: &str) -> bool {
        false
    }
}

/// Plain actor value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<ObjectId>,
    pub roles: BTreeSet<String>,
    pub ip: Option<IpAddr>,
    pub capabilities: BTreeSet<String>,
}

impl Actor {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(id: impl Into<ObjectId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    #[must_use]
    pub const fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }
}

impl ActorContext for Actor {
    fn current_actor_id(&self) -> Option<ObjectId> {
        self.id.clone()
    }

    fn current_actor_roles(&self) -> BTreeSet<String> {
        self.roles.clone()
    }

    fn current_actor_ip(&self) -> Option<IpAddr> {
        self.ip
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Memoization key describing everything about an actor that can change an
/// access decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ActorKey {
    pub id: Option<ObjectId>,
    pub roles: BTreeSet<String>,
    pub ip: Option<IpAddr>,
    pub can_manage: bool,
}

impl ActorKey {
    pub fn new(ctx: &(impl ActorContext + ?Sized), manage_capability: &str) -> Self {
        Self {
            id: ctx.current_actor_id(),
            roles: ctx.current_actor_roles(),
            ip: ctx.current_actor_ip(),
            can_manage: ctx.has_capability(manage_capability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_actor_builder() {
        let actor = Actor::user(5_u64)
            .with_role("editor")
            .with_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
            .with_capability("manage_user_groups");

        assert_eq!(actor.current_actor_id(), Some(ObjectId::from(5_u64)));
        assert!(actor.current_actor_roles().contains("editor"));
        assert!(actor.has_capability("manage_user_groups"));
        assert!(!actor.has_capability("edit_posts"));
        assert!(!actor.is_anonymous());
    }

    #[test]
    fn test_anonymous_actor() {
        let actor = Actor::anonymous();
        assert!(actor.is_anonymous());
        assert!(actor.current_actor_roles().is_empty());
        assert_eq!(actor.current_actor_ip(), None);
    }
}
