//! Dynamic user groups.
//!
//! Pseudo-groups derived from actor identity: one user, every holder of a
//! role, or anonymous visitors. Their members are computed, but they can
//! still hold object assignments and default-type grants.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uam_common::{
    AccessLevel, AssignmentInformation, DynamicGroupId, DynamicGroupType, GroupId, ObjectId,
    ObjectRef, ObjectType,
};

use super::{AccessGroup, GroupAssignments, IpRange};
use crate::membership::ResolveContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicUserGroup {
    #[serde(with = "dynamic_id_serde")]
    id: DynamicGroupId,
    #[serde(default)]
    assignments: GroupAssignments,
}

impl DynamicUserGroup {
    pub fn new(id: DynamicGroupId) -> Self {
        Self {
            id,
            assignments: GroupAssignments::new(),
        }
    }

    pub fn for_user(user_id: impl Into<ObjectId>) -> Self {
        Self::new(DynamicGroupId::user(user_id))
    }

    pub fn for_role(role: impl Into<ObjectId>) -> Self {
        Self::new(DynamicGroupId::role(role))
    }

    pub fn not_logged_in() -> Self {
        Self::new(DynamicGroupId::not_logged_in())
    }

    pub const fn dynamic_id(&self) -> &DynamicGroupId {
        &self.id
    }

    pub const fn group_type(&self) -> DynamicGroupType {
        self.id.group_type
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

    /// Whether the group stands for the given identity.
    pub fn matches_actor(&self, actor_id: Option<&ObjectId>, roles: &BTreeSet<String>) -> bool {
        match self.id.group_type {
            DynamicGroupType::NotLoggedIn => actor_id.is_none(),
            DynamicGroupType::User => actor_id == Some(&self.id.id),
            DynamicGroupType::Role => roles.contains(self.id.id.as_str()),
        }
    }

    fn is_identity_user(&self, ctx: &ResolveContext<'_>, user_id: &ObjectId) -> bool {
        match self.id.group_type {
            DynamicGroupType::NotLoggedIn | DynamicGroupType::User => user_id == &self.id.id,
            DynamicGroupType::Role => ctx.user_roles(user_id).contains(self.id.id.as_str()),
        }
    }
}

impl AccessGroup for DynamicUserGroup {
    fn id(&self) -> GroupId {
        GroupId::Dynamic(self.id.clone())
    }

    fn name(&self) -> &str {
        self.id.id.as_str()
    }

    fn description(&self) -> &str {
        ""
    }

    fn read_access(&self) -> AccessLevel {
        AccessLevel::Group
    }

    fn write_access(&self) -> AccessLevel {
        AccessLevel::Group
    }

    fn ip_ranges(&self) -> &[IpRange] {
        &[]
    }

    fn assignments(&self) -> &GroupAssignments {
        &self.assignments
    }

    fn as_dyn(&self) -> &dyn AccessGroup {
        self
    }

    fn as_dynamic(&self) -> Option<&DynamicUserGroup> {
        Some(self)
    }

    fn implicit_assignment(
        &self,
        ctx: &ResolveContext<'_>,
        object: &ObjectRef,
    ) -> Option<AssignmentInformation> {
        let covered = match object.object_type.as_str() {
            ObjectType::USER => self.is_identity_user(ctx, &object.id),
            ObjectType::ROLE => {
                self.id.group_type == DynamicGroupType::Role && object.id == self.id.id
            }
            _ => false,
        };
        covered.then(AssignmentInformation::permanent)
    }

    fn implicit_objects(
        &self,
        ctx: &ResolveContext<'_>,
        object_type: &ObjectType,
    ) -> BTreeSet<ObjectId> {
        match (self.id.group_type, object_type.as_str()) {
            (DynamicGroupType::Role, ObjectType::ROLE) => BTreeSet::from([self.id.id.clone()]),
            (DynamicGroupType::Role, ObjectType::USER) => ctx
                .all_ids_of_type(object_type)
                .into_iter()
                .filter(|user_id| self.is_identity_user(ctx, user_id))
                .collect(),
            (DynamicGroupType::User | DynamicGroupType::NotLoggedIn, ObjectType::USER) => {
                BTreeSet::from([self.id.id.clone()])
            }
            _ => BTreeSet::new(),
        }
    }
}

/// Dynamic ids persist in their canonical `U|7` / `R|editor` form.
mod dynamic_id_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use uam_common::{DynamicGroupId, GroupId};

    pub fn serialize<S: Serializer>(id: &DynamicGroupId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DynamicGroupId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.parse::<GroupId>().map_err(de::Error::custom)? {
            GroupId::Dynamic(id) => Ok(id),
            GroupId::Stored(_) => Err(de::Error::custom(format!("not a dynamic group id: {raw}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_actor() {
        let roles = BTreeSet::from(["editor".to_string()]);
        let seven = ObjectId::from(7_u64);

        assert!(DynamicUserGroup::for_user(7_u64).matches_actor(Some(&seven), &roles));
        assert!(!DynamicUserGroup::for_user(8_u64).matches_actor(Some(&seven), &roles));
        assert!(DynamicUserGroup::for_role("editor").matches_actor(Some(&seven), &roles));
        assert!(!DynamicUserGroup::for_role("author").matches_actor(Some(&seven), &roles));
        assert!(DynamicUserGroup::not_logged_in().matches_actor(None, &BTreeSet::new()));
        assert!(!DynamicUserGroup::not_logged_in().matches_actor(Some(&seven), &roles));
    }

    #[test]
    fn test_user_zero_group_is_not_logged_in() {
        let group = DynamicUserGroup::for_user(0_u64);
        assert_eq!(group.group_type(), DynamicGroupType::NotLoggedIn);
        assert_eq!(group.id().to_string(), "U|0");
    }

    #[test]
    fn test_fixed_access_levels() {
        let group = DynamicUserGroup::for_role("editor");
        assert_eq!(group.read_access(), AccessLevel::Group);
        assert_eq!(group.write_access(), AccessLevel::Group);
        assert!(group.ip_ranges().is_empty());
        assert!(group.as_dynamic().is_some());
    }

    #[test]
    fn test_serde_uses_canonical_id() {
        let mut group = DynamicUserGroup::for_role("editor");
        group.add_object("post", 3_u64, None, None);

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["id"], "R|editor");

        let back: DynamicUserGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }
}
