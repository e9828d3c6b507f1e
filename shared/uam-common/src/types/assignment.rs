//! Assignment Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validity window of a group assignment.
///
/// Missing bounds are open: no `from_date` means "since forever", no
/// `to_date` means "until revoked".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentInformation {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl AssignmentInformation {
    /// Assignment without time bounds.
    #[must_use]
    pub const fn permanent() -> Self {
        Self {
            from_date: None,
            to_date: None,
        }
    }

    #[must_use]
    pub const fn between(from_date: Option<DateTime<Utc>>, to_date: Option<DateTime<Utc>>) -> Self {
        Self { from_date, to_date }
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.from_date.is_none() && self.to_date.is_none()
    }

    /// Whether `now` falls inside `[from_date, to_date]`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.from_date.is_none_or(|from| from <= now) && self.to_date.is_none_or(|to| now <= to)
    }
}

/// Result of asking a group whether it is a default grantee for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultGroupStatus {
    pub is_default: bool,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl DefaultGroupStatus {
    #[must_use]
    pub const fn not_default() -> Self {
        Self {
            is_default: false,
            from_date: None,
            to_date: None,
        }
    }

    #[must_use]
    pub const fn from_assignment(info: AssignmentInformation) -> Self {
        Self {
            is_default: true,
            from_date: info.from_date,
            to_date: info.to_date,
        }
    }

    /// Bounds of the blanket grant, if this is one.
    #[must_use]
    pub const fn assignment(&self) -> Option<AssignmentInformation> {
        if self.is_default {
            Some(AssignmentInformation::between(self.from_date, self.to_date))
        } else {
            None
        }
    }
}
