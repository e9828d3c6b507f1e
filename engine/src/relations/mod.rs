//! Object Relation Map
//!
//! Lazily built snapshots of the content hierarchy: the term tree, the
//! post tree and the term/post attachments. A snapshot is never patched;
//! invalidating a key discards it and the next read rebuilds it from the
//! content store (or picks up a copy from the cache provider).
//!
//! Per-key generation counters keep a build that raced an invalidation
//! from publishing its stale result.

pub mod tree;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::{get_typed, invalidate_key, set_typed, CacheProvider};
use crate::config::EngineConfig;
use crate::objects::ObjectTypeRegistry;
use crate::store::ContentStore;

pub use tree::{ContainerMap, TreeMap};

/// Well-known relation map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationMapKey {
    TermTree,
    PostTree,
    TermPost,
    PostTerm,
}

impl RelationMapKey {
    pub const ALL: [Self; 4] = [Self::TermTree, Self::PostTree, Self::TermPost, Self::PostTerm];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TermTree => "term-tree-map",
            Self::PostTree => "post-tree-map",
            Self::TermPost => "term-post-map",
            Self::PostTerm => "post-term-map",
        }
    }

    /// Snapshot a key lives in. Both attachment directions come from one
    /// scan, so they share a snapshot.
    const fn snapshot(self) -> Self {
        match self {
            Self::PostTerm => Self::TermPost,
            other => other,
        }
    }
}

impl fmt::Display for RelationMapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Snapshot {
    Tree(Arc<TreeMap>),
    Containers(Arc<ContainerMap>),
}

/// Cached parent/child relations between hierarchical objects.
pub struct ObjectRelationMap {
    content: Arc<dyn ContentStore>,
    types: Arc<ObjectTypeRegistry>,
    cache: Arc<dyn CacheProvider>,
    config: EngineConfig,
    snapshots: DashMap<RelationMapKey, Snapshot>,
    generations: DashMap<RelationMapKey, Arc<AtomicU64>>,
}

impl fmt::Debug for ObjectRelationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRelationMap")
            .field("snapshots", &self.snapshots.len())
            .finish_non_exhaustive()
    }
}

impl ObjectRelationMap {
    pub fn new(
        content: Arc<dyn ContentStore>,
        types: Arc<ObjectTypeRegistry>,
        cache: Arc<dyn CacheProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            content,
            types,
            cache,
            config,
            snapshots: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    fn generation(&self, key: RelationMapKey) -> Arc<AtomicU64> {
        self.generations
            .entry(key.snapshot())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    fn publish(&self, key: RelationMapKey, generation_before: u64, snapshot: Snapshot) {
        let generation = self.generation(key);
        if generation.load(Ordering::Acquire) == generation_before {
            self.snapshots.insert(key.snapshot(), snapshot);
        }
    }

    /// Term hierarchy across every taxonomy.
    pub fn term_tree(&self) -> Arc<TreeMap> {
        self.tree(RelationMapKey::TermTree)
    }

    /// Post hierarchy across every post type.
    pub fn post_tree(&self) -> Arc<TreeMap> {
        self.tree(RelationMapKey::PostTree)
    }

    /// Term/post attachments.
    pub fn containers(&self) -> Arc<ContainerMap> {
        if let Some(entry) = self.snapshots.get(&RelationMapKey::TermPost) {
            if let Snapshot::Containers(map) = entry.value() {
                return Arc::clone(map);
            }
        }

        let generation_before = self.generation(RelationMapKey::TermPost).load(Ordering::Acquire);
        let term_key = self.config.cache_key(RelationMapKey::TermPost.as_str());
        let post_key = self.config.cache_key(RelationMapKey::PostTerm.as_str());

        let cached = get_typed(self.cache.as_ref(), &term_key)
            .zip(get_typed(self.cache.as_ref(), &post_key))
            .map(|(term_posts, post_terms)| ContainerMap {
                term_posts,
                post_terms,
            });

        let map = Arc::new(match cached {
            Some(map) => map,
            None => {
                tracing::debug!("Building term-post relation maps");
                let map = ContainerMap::build(
                    self.content.as_ref(),
                    self.types.taxonomies(),
                    self.types.post_types(),
                );
                set_typed(self.cache.as_ref(), &term_key, &map.term_posts);
                set_typed(self.cache.as_ref(), &post_key, &map.post_terms);
                map
            }
        });

        self.publish(
            RelationMapKey::TermPost,
            generation_before,
            Snapshot::Containers(Arc::clone(&map)),
        );
        map
    }

    fn tree(&self, key: RelationMapKey) -> Arc<TreeMap> {
        if let Some(entry) = self.snapshots.get(&key) {
            if let Snapshot::Tree(tree) = entry.value() {
                return Arc::clone(tree);
            }
        }

        let generation_before = self.generation(key).load(Ordering::Acquire);
        let cache_key = self.config.cache_key(key.as_str());

        let tree = Arc::new(match get_typed::<TreeMap>(self.cache.as_ref(), &cache_key) {
            Some(tree) => tree,
            None => {
                tracing::debug!(%key, "Building relation tree map");
                let object_types = match key {
                    RelationMapKey::TermTree => self.types.taxonomies(),
                    _ => self.types.post_types(),
                };
                let tree = TreeMap::build(self.content.as_ref(), object_types);
                set_typed(self.cache.as_ref(), &cache_key, &tree);
                tree
            }
        });

        self.publish(key, generation_before, Snapshot::Tree(Arc::clone(&tree)));
        tree
    }

    /// Discards a snapshot. Invalidating either attachment direction
    /// discards both.
    pub fn invalidate(&self, key: RelationMapKey) {
        self.generation(key).fetch_add(1, Ordering::AcqRel);
        self.snapshots.remove(&key.snapshot());

        match key.snapshot() {
            RelationMapKey::TermPost => {
                invalidate_key(
                    self.cache.as_ref(),
                    &self.config.cache_key(RelationMapKey::TermPost.as_str()),
                );
                invalidate_key(
                    self.cache.as_ref(),
                    &self.config.cache_key(RelationMapKey::PostTerm.as_str()),
                );
            }
            other => invalidate_key(self.cache.as_ref(), &self.config.cache_key(other.as_str())),
        }

        tracing::debug!(%key, "Relation map invalidated");
    }

    pub fn invalidate_all(&self) {
        for key in RelationMapKey::ALL {
            self.invalidate(key);
        }
    }
}
