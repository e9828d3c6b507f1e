//! Group Types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::object::{ObjectId, ObjectType};
use crate::error::Error;

/// Id used by the not-logged-in dynamic group.
pub const NOT_LOGGED_IN_USER_ID: &str = "0";

/// Kind of a dynamic (identity-derived) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicGroupType {
    /// Exactly one user.
    User,
    /// Every user holding a role.
    Role,
    /// Anonymous visitors.
    NotLoggedIn,
}

impl DynamicGroupType {
    /// Object type whose members this group covers.
    #[must_use]
    pub fn member_object_type(self) -> ObjectType {
        match self {
            Self::User | Self::NotLoggedIn => ObjectType::user(),
            Self::Role => ObjectType::role(),
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::User | Self::NotLoggedIn => "U",
            Self::Role => "R",
        }
    }
}

/// Identity of a dynamic group: `(pseudoType, pseudoId)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicGroupId {
    pub group_type: DynamicGroupType,
    pub id: ObjectId,
}

impl DynamicGroupId {
    pub fn user(user_id: impl Into<ObjectId>) -> Self {
        let id = user_id.into();
        if id.as_str() == NOT_LOGGED_IN_USER_ID {
            return Self::not_logged_in();
        }
        Self {
            group_type: DynamicGroupType::User,
            id,
        }
    }

    pub fn role(role: impl Into<ObjectId>) -> Self {
        Self {
            group_type: DynamicGroupType::Role,
            id: role.into(),
        }
    }

    #[must_use]
    pub fn not_logged_in() -> Self {
        Self {
            group_type: DynamicGroupType::NotLoggedIn,
            id: ObjectId::new(NOT_LOGGED_IN_USER_ID),
        }
    }
}

impl fmt::Display for DynamicGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.group_type.prefix(), self.id)
    }
}

/// Identity of a group, stored or dynamic.
///
/// Canonical string forms are `42` for stored groups, `U|7` for a single
/// user, `R|editor` for a role and `U|0` for not logged in visitors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GroupId {
    Stored(u64),
    Dynamic(DynamicGroupId),
}

impl GroupId {
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{id}"),
            Self::Dynamic(dynamic) => write!(f, "{dynamic}"),
        }
    }
}

impl FromStr for GroupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((prefix, id)) = s.split_once('|') {
            if id.is_empty() {
                return Err(Error::InvalidGroupId(s.to_string()));
            }
            return match prefix {
                "U" => Ok(Self::Dynamic(DynamicGroupId::user(id))),
                "R" => Ok(Self::Dynamic(DynamicGroupId::role(id))),
                _ => Err(Error::InvalidGroupId(s.to_string())),
            };
        }

        s.parse()
            .map(Self::Stored)
            .map_err(|_| Error::InvalidGroupId(s.to_string()))
    }
}

impl TryFrom<String> for GroupId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GroupId> for String {
    fn from(value: GroupId) -> Self {
        value.to_string()
    }
}

impl From<DynamicGroupId> for GroupId {
    fn from(value: DynamicGroupId) -> Self {
        Self::Dynamic(value)
    }
}

/// Who may use a group for a given access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Every actor.
    All,
    /// Only actors belonging to the group.
    #[default]
    Group,
    /// Nobody through this setting; membership still applies.
    None,
}

impl FromStr for AccessLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "group" => Ok(Self::Group),
            "none" => Ok(Self::None),
            other => Err(Error::InvalidAccessLevel(other.to_string())),
        }
    }
}

/// Access mode being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_id_round_trip_forms() {
        assert_eq!("42".parse::<GroupId>().unwrap(), GroupId::Stored(42));
        assert_eq!(
            "R|editor".parse::<GroupId>().unwrap(),
            GroupId::Dynamic(DynamicGroupId::role("editor"))
        );
        assert_eq!(
            GroupId::Dynamic(DynamicGroupId::user(7_u64)).to_string(),
            "U|7"
        );
    }

    #[test]
    fn test_user_zero_is_not_logged_in() {
        let id: GroupId = "U|0".parse().unwrap();
        let GroupId::Dynamic(dynamic) = id else {
            panic!("expected dynamic group");
        };
        assert_eq!(dynamic.group_type, DynamicGroupType::NotLoggedIn);
        assert_eq!(dynamic.to_string(), "U|0");
    }

    #[test]
    fn test_invalid_group_ids() {
        assert!("X|1".parse::<GroupId>().is_err());
        assert!("R|".parse::<GroupId>().is_err());
        assert!("abc".parse::<GroupId>().is_err());
    }

    #[test]
    fn test_access_level_parse() {
        assert_eq!("ALL".parse::<AccessLevel>().unwrap(), AccessLevel::All);
        assert_eq!("group".parse::<AccessLevel>().unwrap(), AccessLevel::Group);
        assert!("everyone".parse::<AccessLevel>().is_err());
    }
}
