//! Object type registry.
//!
//! Maps concrete object types onto the membership family whose handler
//! resolves them: post types to `_post_`, taxonomies to `_term_`, and
//! host-registered pluggable types to their own family.

pub mod pluggable;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use uam_common::ObjectType;

use crate::store::ContentStore;

pub use pluggable::PluggableObject;

/// Object-type grouping that selects a membership handler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MembershipFamily {
    Role,
    User,
    Term,
    Post,
    Pluggable(ObjectType),
}

impl MembershipFamily {
    /// Family key: the general object type, or the pluggable type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Role => ObjectType::ROLE,
            Self::User => ObjectType::USER,
            Self::Term => ObjectType::TERM,
            Self::Post => ObjectType::POST,
            Self::Pluggable(object_type) => object_type.as_str(),
        }
    }
}

impl fmt::Display for MembershipFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Known object types and their families.
#[derive(Clone, Default)]
pub struct ObjectTypeRegistry {
    post_types: BTreeSet<ObjectType>,
    taxonomies: BTreeSet<ObjectType>,
    pluggables: BTreeMap<ObjectType, Arc<dyn PluggableObject>>,
}

impl fmt::Debug for ObjectTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTypeRegistry")
            .field("post_types", &self.post_types)
            .field("taxonomies", &self.taxonomies)
            .field("pluggables", &self.pluggables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ObjectTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the store's post types and taxonomies.
    pub fn from_store(store: &dyn ContentStore) -> Self {
        Self {
            post_types: store.post_types().into_iter().collect(),
            taxonomies: store.taxonomies().into_iter().collect(),
            pluggables: BTreeMap::new(),
        }
    }

    pub fn register_post_type(&mut self, post_type: impl Into<ObjectType>) {
        self.post_types.insert(post_type.into());
    }

    pub fn register_taxonomy(&mut self, taxonomy: impl Into<ObjectType>) {
        self.taxonomies.insert(taxonomy.into());
    }

    /// Registers a pluggable object. A later registration for the same
    /// object type replaces the earlier one.
    pub fn register_pluggable(&mut self, object: Arc<dyn PluggableObject>) {
        let object_type = object.object_type();
        if self.pluggables.insert(object_type.clone(), object).is_some() {
            tracing::warn!(%object_type, "Pluggable object registered twice, replacing");
        }
    }

    pub fn family(&self, object_type: &ObjectType) -> Option<MembershipFamily> {
        match object_type.as_str() {
            ObjectType::ROLE => Some(MembershipFamily::Role),
            ObjectType::USER => Some(MembershipFamily::User),
            ObjectType::TERM => Some(MembershipFamily::Term),
            ObjectType::POST => Some(MembershipFamily::Post),
            _ if self.taxonomies.contains(object_type) => Some(MembershipFamily::Term),
            _ if self.post_types.contains(object_type) => Some(MembershipFamily::Post),
            _ if self.pluggables.contains_key(object_type) => {
                Some(MembershipFamily::Pluggable(object_type.clone()))
            }
            _ => None,
        }
    }

    /// General type of a concrete type (`page` -> `_post_`).
    pub fn general_type(&self, object_type: &ObjectType) -> Option<ObjectType> {
        self.family(object_type)
            .map(|family| ObjectType::new(family.name()))
    }

    /// Whether a membership handler can resolve the type.
    pub fn is_valid_object_type(&self, object_type: &ObjectType) -> bool {
        self.family(object_type).is_some()
    }

    pub fn is_post_type(&self, object_type: &ObjectType) -> bool {
        self.family(object_type) == Some(MembershipFamily::Post)
    }

    pub const fn post_types(&self) -> &BTreeSet<ObjectType> {
        &self.post_types
    }

    pub const fn taxonomies(&self) -> &BTreeSet<ObjectType> {
        &self.taxonomies
    }

    pub fn pluggable(&self, object_type: &ObjectType) -> Option<&Arc<dyn PluggableObject>> {
        self.pluggables.get(object_type)
    }

    pub fn pluggables(&self) -> impl Iterator<Item = &Arc<dyn PluggableObject>> {
        self.pluggables.values()
    }

    /// Every family with a handler: the four built-ins plus pluggables.
    pub fn families(&self) -> Vec<MembershipFamily> {
        let mut families = vec![
            MembershipFamily::Role,
            MembershipFamily::User,
            MembershipFamily::Term,
            MembershipFamily::Post,
        ];
        families.extend(
            self.pluggables
                .keys()
                .cloned()
                .map(MembershipFamily::Pluggable),
        );
        families
    }

    /// Concrete object types belonging to a family.
    pub fn object_types_of(&self, family: &MembershipFamily) -> Vec<ObjectType> {
        match family {
            MembershipFamily::Role => vec![ObjectType::role()],
            MembershipFamily::User => vec![ObjectType::user()],
            MembershipFamily::Term => self.taxonomies.iter().cloned().collect(),
            MembershipFamily::Post => self.post_types.iter().cloned().collect(),
            MembershipFamily::Pluggable(object_type) => vec![object_type.clone()],
        }
    }

    /// Every concrete object type known to the registry.
    pub fn all_object_types(&self) -> BTreeSet<ObjectType> {
        let mut types: BTreeSet<ObjectType> = [ObjectType::role(), ObjectType::user()].into();
        types.extend(self.post_types.iter().cloned());
        types.extend(self.taxonomies.iter().cloned());
        types.extend(self.pluggables.keys().cloned());
        types
    }
}
