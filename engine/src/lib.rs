//! UAM Engine
//!
//! Group-based access control for content objects. Hosts supply the
//! content graph, the actor and the group records; the engine resolves
//! group membership (direct, time-bounded, inherited through term and
//! post hierarchies) and answers whether an actor may read or write an
//! object.

pub mod access;
pub mod actor;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod groups;
pub mod membership;
pub mod objects;
pub mod relations;
pub mod store;

pub use access::{AccessHandler, AccessHandlerBuilder, GroupMap};
pub use actor::{Actor, ActorContext};
pub use cache::{CacheProvider, InMemoryCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{CacheError, EngineError, EngineResult, StoreError};
pub use groups::{AccessGroup, DynamicUserGroup, GroupAssignments, IpRange, UserGroup};
pub use membership::{
    MembershipHandler, MembershipHandlers, ObjectMembership, RecursiveMembership, ResolveContext,
};
pub use objects::{MembershipFamily, ObjectTypeRegistry, PluggableObject};
pub use relations::{ObjectRelationMap, RelationMapKey};
pub use store::{
    ContentObject, ContentStore, GroupStore, InMemoryGroupStore, MemoryContentStore,
};

pub use uam_common::types::*;
