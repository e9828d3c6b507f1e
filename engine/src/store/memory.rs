//! In-memory collaborators.
//!
//! Suitable for embedding hosts without their own persistence and for
//! tests. Both stores are safe to share across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use uam_common::{DynamicGroupId, ObjectId, ObjectRef, ObjectType};

use super::{ContentObject, ContentStore, GroupStore};
use crate::error::StoreError;
use crate::groups::{DynamicUserGroup, UserGroup};

#[derive(Debug, Default)]
struct ContentGraph {
    post_types: BTreeSet<ObjectType>,
    taxonomies: BTreeSet<ObjectType>,
    objects: BTreeMap<ObjectRef, ContentObject>,
    parents: BTreeMap<ObjectRef, ObjectRef>,
    /// term -> posts attached to it
    attachments: BTreeMap<ObjectRef, BTreeSet<ObjectRef>>,
    user_roles: BTreeMap<ObjectId, BTreeSet<String>>,
}

/// Content graph held in memory.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    graph: RwLock<ContentGraph>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the `post`/`page` post types and `category`/`post_tag`
    /// taxonomies registered.
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store.register_post_type("post");
        store.register_post_type("page");
        store.register_taxonomy("category");
        store.register_taxonomy("post_tag");
        store
    }

    pub fn register_post_type(&self, post_type: impl Into<ObjectType>) {
        self.graph.write().post_types.insert(post_type.into());
    }

    pub fn register_taxonomy(&self, taxonomy: impl Into<ObjectType>) {
        self.graph.write().taxonomies.insert(taxonomy.into());
    }

    pub fn add_object(
        &self,
        object_type: impl Into<ObjectType>,
        id: impl Into<ObjectId>,
        author: Option<ObjectId>,
    ) -> ObjectRef {
        let object = ContentObject {
            object_type: object_type.into(),
            id: id.into(),
            author,
        };
        let key = ObjectRef::new(object.object_type.clone(), object.id.clone());
        self.graph.write().objects.insert(key.clone(), object);
        key
    }

    pub fn add_term(
        &self,
        taxonomy: impl Into<ObjectType>,
        id: impl Into<ObjectId>,
        parent: Option<ObjectId>,
    ) -> ObjectRef {
        let term = self.add_object(taxonomy, id, None);
        if let Some(parent) = parent {
            self.set_parent(&term, Some(ObjectRef::new(term.object_type.clone(), parent)));
        }
        term
    }

    pub fn add_post(
        &self,
        post_type: impl Into<ObjectType>,
        id: impl Into<ObjectId>,
        author: Option<ObjectId>,
        parent: Option<ObjectId>,
    ) -> ObjectRef {
        let post = self.add_object(post_type, id, author);
        if let Some(parent) = parent {
            self.set_parent(&post, Some(ObjectRef::new(post.object_type.clone(), parent)));
        }
        post
    }

    pub fn set_parent(&self, child: &ObjectRef, parent: Option<ObjectRef>) {
        let mut graph = self.graph.write();
        match parent {
            Some(parent) => {
                graph.parents.insert(child.clone(), parent);
            }
            None => {
                graph.parents.remove(child);
            }
        }
    }

    /// Attaches a post to a term.
    pub fn attach(&self, post: &ObjectRef, term: &ObjectRef) {
        self.graph
            .write()
            .attachments
            .entry(term.clone())
            .or_default()
            .insert(post.clone());
    }

    pub fn detach(&self, post: &ObjectRef, term: &ObjectRef) {
        if let Some(posts) = self.graph.write().attachments.get_mut(term) {
            posts.remove(post);
        }
    }

    pub fn add_user(&self, id: impl Into<ObjectId>, roles: &[&str]) {
        self.graph.write().user_roles.insert(
            id.into(),
            roles.iter().map(|r| (*r).to_string()).collect(),
        );
    }

    pub fn remove_object(&self, object: &ObjectRef) {
        let mut graph = self.graph.write();
        graph.objects.remove(object);
        graph.parents.remove(object);
        graph.parents.retain(|_, parent| parent != object);
        graph.attachments.remove(object);
        for posts in graph.attachments.values_mut() {
            posts.remove(object);
        }
    }
}

impl ContentStore for MemoryContentStore {
    fn object(
        &self,
        object_type: &ObjectType,
        id: &ObjectId,
    ) -> Result<Option<ContentObject>, StoreError> {
        let key = ObjectRef::new(object_type.clone(), id.clone());
        Ok(self.graph.read().objects.get(&key).cloned())
    }

    fn children(
        &self,
        object_type: &ObjectType,
        id: &ObjectId,
    ) -> Result<Vec<ObjectRef>, StoreError> {
        let key = ObjectRef::new(object_type.clone(), id.clone());
        let graph = self.graph.read();

        let mut children: Vec<ObjectRef> = graph
            .parents
            .iter()
            .filter(|(_, parent)| **parent == key)
            .map(|(child, _)| child.clone())
            .collect();

        if let Some(posts) = graph.attachments.get(&key) {
            children.extend(posts.iter().cloned());
        }

        Ok(children)
    }

    fn parent(
        &self,
        object_type: &ObjectType,
        id: &ObjectId,
    ) -> Result<Option<ObjectRef>, StoreError> {
        let key = ObjectRef::new(object_type.clone(), id.clone());
        Ok(self.graph.read().parents.get(&key).cloned())
    }

    fn all_ids_of_type(&self, object_type: &ObjectType) -> Result<BTreeSet<ObjectId>, StoreError> {
        let graph = self.graph.read();

        if object_type.as_str() == ObjectType::USER {
            return Ok(graph.user_roles.keys().cloned().collect());
        }

        Ok(graph
            .objects
            .keys()
            .filter(|object| &object.object_type == object_type)
            .map(|object| object.id.clone())
            .collect())
    }

    fn user_roles(&self, user_id: &ObjectId) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .graph
            .read()
            .user_roles
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn post_types(&self) -> Vec<ObjectType> {
        self.graph.read().post_types.iter().cloned().collect()
    }

    fn taxonomies(&self) -> Vec<ObjectType> {
        self.graph.read().taxonomies.iter().cloned().collect()
    }
}

/// Group records held in memory.
#[derive(Debug)]
pub struct InMemoryGroupStore {
    groups: RwLock<BTreeMap<u64, UserGroup>>,
    dynamic: RwLock<BTreeMap<DynamicGroupId, DynamicUserGroup>>,
    next_id: AtomicU64,
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            dynamic: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl GroupStore for InMemoryGroupStore {
    fn load(&self, id: u64) -> Result<Option<UserGroup>, StoreError> {
        Ok(self.groups.read().get(&id).cloned())
    }

    fn load_all(&self) -> Result<Vec<UserGroup>, StoreError> {
        Ok(self.groups.read().values().cloned().collect())
    }

    fn load_dynamic_groups(&self) -> Result<Vec<DynamicUserGroup>, StoreError> {
        Ok(self.dynamic.read().values().cloned().collect())
    }

    fn persist(&self, group: &UserGroup) -> Result<u64, StoreError> {
        let mut groups = self.groups.write();

        let id = if group.is_new() {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        } else if groups.contains_key(&group.stored_id()) {
            group.stored_id()
        } else {
            return Err(StoreError(format!(
                "user group {} does not exist",
                group.stored_id()
            )));
        };

        let mut record = group.clone();
        record.assign_id(id);
        groups.insert(id, record);
        Ok(id)
    }

    fn persist_dynamic(&self, group: &DynamicUserGroup) -> Result<(), StoreError> {
        self.dynamic
            .write()
            .insert(group.dynamic_id().clone(), group.clone());
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.groups.write().remove(&id);
        Ok(())
    }

    fn delete_dynamic(&self, id: &DynamicGroupId) -> Result<(), StoreError> {
        self.dynamic.write().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_include_attached_posts() {
        let store = MemoryContentStore::with_defaults();
        let news = store.add_term("category", 5_u64, None);
        let sports = store.add_term("category", 6_u64, Some(ObjectId::from(5_u64)));
        let post = store.add_post("post", 42_u64, None, None);
        store.attach(&post, &news);

        let children = store
            .children(&news.object_type, &news.id)
            .unwrap();
        assert!(children.contains(&sports));
        assert!(children.contains(&post));
        assert_eq!(
            store.parent(&sports.object_type, &sports.id).unwrap(),
            Some(news)
        );
    }

    #[test]
    fn test_remove_object_drops_relations() {
        let store = MemoryContentStore::with_defaults();
        let news = store.add_term("category", 5_u64, None);
        let sports = store.add_term("category", 6_u64, Some(ObjectId::from(5_u64)));
        store.remove_object(&news);

        assert_eq!(store.parent(&sports.object_type, &sports.id).unwrap(), None);
        assert!(store
            .all_ids_of_type(&ObjectType::from("category"))
            .unwrap()
            .contains(&ObjectId::from(6_u64)));
    }

    #[test]
    fn test_group_store_assigns_fresh_ids() {
        let store = InMemoryGroupStore::new();
        let first = store.persist(&UserGroup::new("First")).unwrap();
        let second = store.persist(&UserGroup::new("Second")).unwrap();
        assert_ne!(first, second);

        store.delete(first).unwrap();
        let third = store.persist(&UserGroup::new("Third")).unwrap();
        assert_ne!(third, first);
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_persist_unknown_group_fails() {
        let store = InMemoryGroupStore::new();
        let mut group = UserGroup::new("Ghost");
        group.assign_id(99);
        assert!(store.persist(&group).is_err());
    }
}
