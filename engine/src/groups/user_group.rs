//! Stored user groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uam_common::{AccessLevel, GroupId, ObjectId, ObjectType};

use super::{AccessGroup, GroupAssignments, IpRange};
use crate::error::{EngineError, EngineResult};

/// A group persisted by the host's `GroupStore`.
///
/// Id 0 marks a group that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    #[serde(default)]
    id: u64,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    read_access: AccessLevel,
    #[serde(default)]
    write_access: AccessLevel,
    #[serde(default)]
    ip_ranges: Vec<IpRange>,
    #[serde(default)]
    assignments: GroupAssignments,
}

impl UserGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            read_access: AccessLevel::Group,
            write_access: AccessLevel::Group,
            ip_ranges: Vec::new(),
            assignments: GroupAssignments::new(),
        }
    }

    pub const fn is_new(&self) -> bool {
        self.id == 0
    }

    pub const fn stored_id(&self) -> u64 {
        self.id
    }

    pub fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_read_access(&mut self, level: AccessLevel) {
        self.read_access = level;
    }

    pub fn set_write_access(&mut self, level: AccessLevel) {
        self.write_access = level;
    }

    pub fn set_ip_ranges(&mut self, ranges: Vec<IpRange>) {
        self.ip_ranges = ranges;
    }

    /// Replaces the IP restriction from its list form
    /// (`10.0.0.0/8, 192.168.0.1-192.168.0.99`).
    pub fn set_ip_range_list(&mut self, list: &str) -> EngineResult<()> {
        self.ip_ranges = IpRange::parse_list(list).map_err(|e| EngineError::validation(e.to_string()))?;
        Ok(())
    }

    pub fn add_object(
        &mut self,
        object_type: impl Into<ObjectType>,
        id: impl Into<ObjectId>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) {
        self.assignments
            .add_object(object_type.into(), id.into(), from_date, to_date);
    }

    pub fn remove_object(&mut self, object_type: impl Into<ObjectType>, id: impl Into<ObjectId>) {
        self.assignments
            .remove_object(&object_type.into(), &id.into());
    }

    pub fn add_default_type(
        &mut self,
        object_type: impl Into<ObjectType>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) {
        self.assignments
            .add_default_type(object_type.into(), from_date, to_date);
    }

    pub fn remove_default_type(&mut self, object_type: impl Into<ObjectType>) {
        self.assignments.remove_default_type(&object_type.into());
    }

    pub fn assignments_mut(&mut self) -> &mut GroupAssignments {
        &mut self.assignments
    }

    /// Checks the group can be saved.
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::validation("Group name must not be empty"));
        }
        Ok(())
    }
}

impl AccessGroup for UserGroup {
    fn id(&self) -> GroupId {
        GroupId::Stored(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn read_access(&self) -> AccessLevel {
        self.read_access
    }

    fn write_access(&self) -> AccessLevel {
        self.write_access
    }

    fn ip_ranges(&self) -> &[IpRange] {
        &self.ip_ranges
    }

    fn assignments(&self) -> &GroupAssignments {
        &self.assignments
    }

    fn as_dyn(&self) -> &dyn AccessGroup {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_new_group_defaults() {
        let group = UserGroup::new("Editors");
        assert!(group.is_new());
        assert_eq!(group.id(), GroupId::Stored(0));
        assert_eq!(group.read_access(), AccessLevel::Group);
        assert_eq!(group.write_access(), AccessLevel::Group);
        assert!(group.assignments().is_empty());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(UserGroup::new("Editors").validate().is_ok());

        for name in ["", "   ", "\t\n"] {
            let err = UserGroup::new(name).validate().unwrap_err();
            assert!(matches!(err, EngineError::Validation { .. }), "{name:?}");
        }
    }

    #[test]
    fn test_add_then_remove_is_exclusive() {
        let mut group = UserGroup::new("Editors");
        group.add_default_type("post", None, None);
        group.add_object("post", 1_u64, None, None);
        group.remove_object("post", 1_u64);

        let post = ObjectType::from("post");
        let id = ObjectId::from(1_u64);
        assert!(group.assignments().assignment(&post, &id).is_none());
        assert!(group.assignments().is_removed(&post, &id));

        group.add_object("post", 1_u64, None, None);
        assert!(group.assignments().assignment(&post, &id).is_some());
        assert!(!group.assignments().is_removed(&post, &id));
    }

    #[test]
    fn test_ip_restriction() {
        let mut group = UserGroup::new("Office");
        let inside: IpAddr = "10.1.2.3".parse().unwrap();
        let outside: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(group.is_ip_allowed(None));
        assert!(group.is_ip_allowed(Some(outside)));

        group.set_ip_range_list("10.0.0.0/8, 172.16.0.1-172.16.0.9").unwrap();
        assert!(group.is_ip_allowed(Some(inside)));
        assert!(!group.is_ip_allowed(Some(outside)));
        assert!(!group.is_ip_allowed(None));
    }

    #[test]
    fn test_invalid_ip_list_is_validation_error() {
        let mut group = UserGroup::new("Office");
        let err = group.set_ip_range_list("10.0.0.0/99").unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(group.ip_ranges().is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut group = UserGroup::new("Editors");
        group.assign_id(3);
        group.set_read_access(AccessLevel::All);
        group.add_object("category", 5_u64, None, None);

        let json = serde_json::to_string(&group).unwrap();
        let back: UserGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }
}
