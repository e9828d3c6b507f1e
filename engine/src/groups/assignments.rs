//! Object assignments held by a group.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uam_common::{AssignmentInformation, ObjectId, ObjectType};

/// Direct assignments, explicit removals and default-type grants of one
/// group.
///
/// An object is never both assigned and removed: adding clears the
/// removal marker and removing clears the assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignments {
    #[serde(default)]
    objects: BTreeMap<ObjectType, BTreeMap<ObjectId, AssignmentInformation>>,
    #[serde(default)]
    removed: BTreeMap<ObjectType, BTreeSet<ObjectId>>,
    #[serde(default)]
    default_types: BTreeMap<ObjectType, AssignmentInformation>,
}

impl GroupAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(
        &mut self,
        object_type: ObjectType,
        id: ObjectId,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) {
        if let Some(removed) = self.removed.get_mut(&object_type) {
            removed.remove(&id);
            if removed.is_empty() {
                self.removed.remove(&object_type);
            }
        }

        self.objects
            .entry(object_type)
            .or_default()
            .insert(id, AssignmentInformation::between(from_date, to_date));
    }

    /// Removes an assignment and remembers the removal, so a default-type
    /// grant never covers this id, including one added later. Removing an
    /// unknown object is not an error.
    pub fn remove_object(&mut self, object_type: &ObjectType, id: &ObjectId) {
        if let Some(objects) = self.objects.get_mut(object_type) {
            objects.remove(id);
            if objects.is_empty() {
                self.objects.remove(object_type);
            }
        }

        self.removed
            .entry(object_type.clone())
            .or_default()
            .insert(id.clone());
    }

    pub fn assignment(&self, object_type: &ObjectType, id: &ObjectId) -> Option<&AssignmentInformation> {
        self.objects.get(object_type).and_then(|objects| objects.get(id))
    }

    pub fn is_removed(&self, object_type: &ObjectType, id: &ObjectId) -> bool {
        self.removed
            .get(object_type)
            .is_some_and(|removed| removed.contains(id))
    }

    /// Direct assignments of one object type.
    pub fn objects_of_type(
        &self,
        object_type: &ObjectType,
    ) -> impl Iterator<Item = (&ObjectId, &AssignmentInformation)> {
        self.objects.get(object_type).into_iter().flatten()
    }

    pub fn add_default_type(
        &mut self,
        object_type: ObjectType,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) {
        self.default_types
            .insert(object_type, AssignmentInformation::between(from_date, to_date));
    }

    pub fn remove_default_type(&mut self, object_type: &ObjectType) {
        self.default_types.remove(object_type);
    }

    pub fn default_type(&self, object_type: &ObjectType) -> Option<AssignmentInformation> {
        self.default_types.get(object_type).copied()
    }

    pub fn default_types(&self) -> impl Iterator<Item = (&ObjectType, &AssignmentInformation)> {
        self.default_types.iter()
    }

    /// Every object type this group holds any record for.
    pub fn object_types(&self) -> BTreeSet<ObjectType> {
        self.objects
            .keys()
            .chain(self.removed.keys())
            .chain(self.default_types.keys())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.removed.is_empty() && self.default_types.is_empty()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.removed.clear();
        self.default_types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> ObjectType {
        ObjectType::from("post")
    }

    #[test]
    fn test_add_and_remove() {
        let mut assignments = GroupAssignments::new();
        let id = ObjectId::from(1_u64);
        assignments.add_object(post(), id.clone(), None, None);
        assert!(assignments.assignment(&post(), &id).is_some());

        assignments.remove_object(&post(), &id);
        assert!(assignments.assignment(&post(), &id).is_none());
        assert!(assignments.is_removed(&post(), &id));
    }

    #[test]
    fn test_remove_records_marker_under_default_grant() {
        let mut assignments = GroupAssignments::new();
        assignments.add_default_type(post(), None, None);
        let id = ObjectId::from(7_u64);

        assignments.remove_object(&post(), &id);
        assert!(assignments.is_removed(&post(), &id));

        // Last write wins.
        assignments.add_object(post(), id.clone(), None, None);
        assert!(!assignments.is_removed(&post(), &id));
        assert!(assignments.assignment(&post(), &id).is_some());
    }

    #[test]
    fn test_general_default_marks_any_type() {
        let mut assignments = GroupAssignments::new();
        assignments.add_default_type(ObjectType::post(), None, None);
        let id = ObjectId::from(3_u64);
        assignments.remove_object(&ObjectType::from("page"), &id);
        assert!(assignments.is_removed(&ObjectType::from("page"), &id));
    }

    #[test]
    fn test_remove_before_default_grant_keeps_marker() {
        let mut assignments = GroupAssignments::new();
        let id = ObjectId::from(1_u64);
        assignments.remove_object(&post(), &id);
        assert!(assignments.assignment(&post(), &id).is_none());

        assignments.add_default_type(post(), None, None);
        assert!(assignments.is_removed(&post(), &id));
        assert!(!assignments.is_removed(&post(), &ObjectId::from(2_u64)));
    }

    #[test]
    fn test_object_types() {
        let mut assignments = GroupAssignments::new();
        assignments.add_object(post(), ObjectId::from(1_u64), None, None);
        assignments.add_default_type(ObjectType::from("category"), None, None);
        let types = assignments.object_types();
        assert!(types.contains(&post()));
        assert!(types.contains(&ObjectType::from("category")));
    }
}
