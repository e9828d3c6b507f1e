//! Collaborator interfaces owned by the host.
//!
//! The engine only reads the content graph and the group records through
//! these traits; persistence schemas belong to the host.

pub mod memory;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uam_common::{DynamicGroupId, ObjectId, ObjectRef, ObjectType};

use crate::error::StoreError;
use crate::groups::{DynamicUserGroup, UserGroup};

pub use memory::{InMemoryGroupStore, MemoryContentStore};

/// A content object as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentObject {
    pub object_type: ObjectType,
    pub id: ObjectId,
    /// Author of posts; `None` for objects without one.
    pub author: Option<ObjectId>,
}

/// Read-only view of the host's content graph.
pub trait ContentStore: Send + Sync {
    fn object(
        &self,
        object_type: &ObjectType,
        id: &ObjectId,
    ) -> Result<Option<ContentObject>, StoreError>;

    /// Direct children: child terms/posts, and for terms the posts attached
    /// to them.
    fn children(&self, object_type: &ObjectType, id: &ObjectId)
        -> Result<Vec<ObjectRef>, StoreError>;

    fn parent(&self, object_type: &ObjectType, id: &ObjectId)
        -> Result<Option<ObjectRef>, StoreError>;

    fn all_ids_of_type(&self, object_type: &ObjectType) -> Result<BTreeSet<ObjectId>, StoreError>;

    /// Roles held by a user.
    fn user_roles(&self, user_id: &ObjectId) -> Result<BTreeSet<String>, StoreError>;

    /// Registered post types (`post`, `page`, ...).
    fn post_types(&self) -> Vec<ObjectType>;

    /// Registered taxonomies (`category`, `post_tag`, ...).
    fn taxonomies(&self) -> Vec<ObjectType>;
}

/// Record store for user group definitions and their assignments.
pub trait GroupStore: Send + Sync {
    fn load(&self, id: u64) -> Result<Option<UserGroup>, StoreError>;

    fn load_all(&self) -> Result<Vec<UserGroup>, StoreError>;

    fn load_dynamic_groups(&self) -> Result<Vec<DynamicUserGroup>, StoreError>;

    /// Persists the group and its assignments, returning its id. New groups
    /// (id 0) receive a fresh id that is never reused.
    fn persist(&self, group: &UserGroup) -> Result<u64, StoreError>;

    fn persist_dynamic(&self, group: &DynamicUserGroup) -> Result<(), StoreError>;

    /// Removes the group together with every assignment row.
    fn delete(&self, id: u64) -> Result<(), StoreError>;

    fn delete_dynamic(&self, id: &DynamicGroupId) -> Result<(), StoreError>;
}
