//! Object Types
//!
//! Content objects are addressed by an object type (`post`, `category`,
//! `_user_`, ...) and an opaque id. Numeric host ids and role names share
//! the same `ObjectId` representation.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Opaque identifier of a content object, user or role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(SmolStr);

impl ObjectId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        Self(SmolStr::new(value.to_string()))
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of an object type, concrete (`post`, `page`, `category`) or general
/// (`_post_`, `_term_`, `_user_`, `_role_`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectType(SmolStr);

impl ObjectType {
    /// General type covering every role.
    pub const ROLE: &'static str = "_role_";
    /// General type covering every user.
    pub const USER: &'static str = "_user_";
    /// General type covering every taxonomy term.
    pub const TERM: &'static str = "_term_";
    /// General type covering every post type.
    pub const POST: &'static str = "_post_";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name))
    }

    #[must_use]
    pub fn role() -> Self {
        Self::new(Self::ROLE)
    }

    #[must_use]
    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    #[must_use]
    pub fn term() -> Self {
        Self::new(Self::TERM)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Self::POST)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the four general family types.
    #[must_use]
    pub fn is_general(&self) -> bool {
        matches!(
            self.as_str(),
            Self::ROLE | Self::USER | Self::TERM | Self::POST
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A fully qualified object reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: ObjectType,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<ObjectType>, id: impl Into<ObjectId>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.id)
    }
}
