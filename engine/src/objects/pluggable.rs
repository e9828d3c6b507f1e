//! Externally registered object types.

use std::collections::BTreeSet;
use std::fmt;

use uam_common::{ObjectId, ObjectRef, ObjectType};

/// An object type owned by a host extension.
///
/// The engine resolves membership for pluggable objects the same way as
/// for built-in ones; the extension only describes its objects.
pub trait PluggableObject: fmt::Debug + Send + Sync {
    /// Human-readable name of the object family.
    fn name(&self) -> &str;

    fn object_type(&self) -> ObjectType;

    /// Objects whose group membership `id` inherits, nearest first.
    fn parents(&self, id: &ObjectId) -> Vec<ObjectRef>;

    /// Every object of this type.
    fn all_ids(&self) -> BTreeSet<ObjectId>;
}
