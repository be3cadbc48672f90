//! Search filters for horses and owners

use crate::horse::{Horse, Sex};
use crate::owner::Owner;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Horse search filter. Every field is optional; set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseSearch {
    /// Case-insensitive substring of the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Case-insensitive substring of the description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Inclusive upper bound on the date of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub born_before: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,

    /// Case-insensitive substring of the owner's "first last" name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    /// Maximum number of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl HorseSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn born_before(mut self, date: NaiveDate) -> Self {
        self.born_before = Some(date);
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_owner_name(mut self, owner_name: impl Into<String>) -> Self {
        self.owner_name = Some(owner_name.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `horse`, owned by `owner`, passes every set filter
    pub fn matches(&self, horse: &Horse, owner: Option<&Owner>) -> bool {
        if let Some(name) = &self.name {
            if !contains_ignore_case(&horse.name, name) {
                return false;
            }
        }
        if let Some(description) = &self.description {
            match &horse.description {
                Some(d) if contains_ignore_case(d, description) => {}
                _ => return false,
            }
        }
        if let Some(bound) = self.born_before {
            if horse.date_of_birth > bound {
                return false;
            }
        }
        if let Some(sex) = self.sex {
            if horse.sex != sex {
                return false;
            }
        }
        if let Some(owner_name) = &self.owner_name {
            match owner {
                Some(o) if contains_ignore_case(&o.full_name(), owner_name) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Owner search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSearch {
    /// Case-insensitive substring of "first last"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl OwnerSearch {
    pub fn matches(&self, owner: &Owner) -> bool {
        self.name
            .as_ref()
            .map_or(true, |name| contains_ignore_case(&owner.full_name(), name))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
