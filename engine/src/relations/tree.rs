//! Relation snapshots built from the content store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uam_common::{ObjectId, ObjectRef, ObjectType};

use crate::store::ContentStore;

/// Parent/child closure over one hierarchical family.
///
/// Ids are unique within a family, so the maps are keyed by id alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMap {
    parents: HashMap<ObjectId, ObjectRef>,
    /// Nearest ancestor first.
    ancestors: HashMap<ObjectId, Vec<ObjectRef>>,
    descendants: HashMap<ObjectId, BTreeSet<ObjectRef>>,
}

impl TreeMap {
    /// Builds the closure from `child -> parent` edges.
    ///
    /// A cycle in the source data stops the walk at the first repeated
    /// node instead of failing the build.
    pub fn from_edges(edges: BTreeMap<ObjectRef, ObjectRef>) -> Self {
        let parents: HashMap<ObjectId, ObjectRef> = edges
            .iter()
            .map(|(child, parent)| (child.id.clone(), parent.clone()))
            .collect();

        let mut ancestors: HashMap<ObjectId, Vec<ObjectRef>> = HashMap::new();
        let mut descendants: HashMap<ObjectId, BTreeSet<ObjectRef>> = HashMap::new();

        for child in edges.keys() {
            let mut chain = Vec::new();
            let mut visited = HashSet::from([child.id.clone()]);
            let mut current = &child.id;

            while let Some(parent) = parents.get(current) {
                if !visited.insert(parent.id.clone()) {
                    tracing::warn!(object = %child, at = %parent, "Cycle in object hierarchy, stopping walk");
                    break;
                }
                chain.push(parent.clone());
                current = &parent.id;
            }

            for ancestor in &chain {
                descendants
                    .entry(ancestor.id.clone())
                    .or_default()
                    .insert(child.clone());
            }
            ancestors.insert(child.id.clone(), chain);
        }

        Self {
            parents,
            ancestors,
            descendants,
        }
    }

    /// Reads every `child -> parent` edge among `object_types` from the store.
    pub fn build(content: &dyn ContentStore, object_types: &BTreeSet<ObjectType>) -> Self {
        let mut edges = BTreeMap::new();

        for object_type in object_types {
            let ids = match content.all_ids_of_type(object_type) {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(%object_type, error = %e, "Failed to list objects for tree map");
                    continue;
                }
            };

            for id in ids {
                match content.parent(object_type, &id) {
                    Ok(Some(parent)) if object_types.contains(&parent.object_type) => {
                        edges.insert(ObjectRef::new(object_type.clone(), id), parent);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(%object_type, %id, error = %e, "Failed to read parent");
                    }
                }
            }
        }

        Self::from_edges(edges)
    }

    pub fn parent(&self, id: &ObjectId) -> Option<&ObjectRef> {
        self.parents.get(id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &ObjectId) -> &[ObjectRef] {
        self.ancestors.get(id).map_or(&[][..], Vec::as_slice)
    }

    /// Every transitive descendant of `id`.
    pub fn descendants(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectRef> {
        self.descendants.get(id).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Term/post attachments in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMap {
    /// term id -> posts attached to the term
    pub term_posts: HashMap<ObjectId, BTreeSet<ObjectRef>>,
    /// post id -> terms the post is attached to
    pub post_terms: HashMap<ObjectId, BTreeSet<ObjectRef>>,
}

impl ContainerMap {
    pub fn build(
        content: &dyn ContentStore,
        taxonomies: &BTreeSet<ObjectType>,
        post_types: &BTreeSet<ObjectType>,
    ) -> Self {
        let mut map = Self::default();

        for taxonomy in taxonomies {
            let ids = match content.all_ids_of_type(taxonomy) {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(%taxonomy, error = %e, "Failed to list terms for term-post map");
                    continue;
                }
            };

            for id in ids {
                let children = match content.children(taxonomy, &id) {
                    Ok(children) => children,
                    Err(e) => {
                        tracing::warn!(%taxonomy, %id, error = %e, "Failed to read term children");
                        continue;
                    }
                };

                let term = ObjectRef::new(taxonomy.clone(), id.clone());
                for post in children
                    .into_iter()
                    .filter(|child| post_types.contains(&child.object_type))
                {
                    map.post_terms
                        .entry(post.id.clone())
                        .or_default()
                        .insert(term.clone());
                    map.term_posts.entry(id.clone()).or_default().insert(post);
                }
            }
        }

        map
    }

    pub fn posts_of_term(&self, term_id: &ObjectId) -> impl Iterator<Item = &ObjectRef> {
        self.term_posts.get(term_id).into_iter().flatten()
    }

    pub fn terms_of_post(&self, post_id: &ObjectId) -> impl Iterator<Item = &ObjectRef> {
        self.post_terms.get(post_id).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: u64) -> ObjectRef {
        ObjectRef::new("category", id)
    }

    #[test]
    fn test_chain_closure() {
        // 1 -> 2 -> 3 (parent -> child)
        let edges = BTreeMap::from([(term(2), term(1)), (term(3), term(2))]);
        let tree = TreeMap::from_edges(edges);

        let id3 = ObjectId::from(3_u64);
        assert_eq!(tree.ancestors(&id3), &[term(2), term(1)]);
        assert_eq!(tree.parent(&id3), Some(&term(2)));

        let below_one: Vec<_> = tree.descendants(&ObjectId::from(1_u64)).cloned().collect();
        assert_eq!(below_one, vec![term(2), term(3)]);
        assert!(tree.ancestors(&ObjectId::from(1_u64)).is_empty());
    }

    #[test]
    fn test_cycle_stops_walk() {
        // 1 -> 2 -> 1
        let edges = BTreeMap::from([(term(1), term(2)), (term(2), term(1))]);
        let tree = TreeMap::from_edges(edges);

        assert_eq!(tree.ancestors(&ObjectId::from(1_u64)), &[term(2)]);
        assert_eq!(tree.ancestors(&ObjectId::from(2_u64)), &[term(1)]);
    }

    #[test]
    fn test_tree_survives_json() {
        let edges = BTreeMap::from([(term(2), term(1))]);
        let tree = TreeMap::from_edges(edges);
        let json = serde_json::to_value(&tree).unwrap();
        let decoded: TreeMap = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, tree);
    }
}
