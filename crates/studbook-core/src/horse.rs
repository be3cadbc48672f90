//! Horse (node) types and operations

use crate::owner::OwnerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a horse, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorseId(pub i64);

impl From<i64> for HorseId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for HorseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sex of a horse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "FEMALE",
            Self::Male => "MALE",
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(Self::Female),
            "male" | "m" => Ok(Self::Male),
            other => Err(format!("Unknown sex: {}", other)),
        }
    }
}

/// A stored horse record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horse {
    /// Immutable identifier
    pub id: HorseId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Calendar date, no time component
    pub date_of_birth: NaiveDate,

    pub sex: Sex,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_id: Option<HorseId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_id: Option<HorseId>,
}

impl Horse {
    /// Materialize a record from validated fields and a store-assigned id
    pub fn from_fields(id: HorseId, fields: HorseFields) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            date_of_birth: fields.date_of_birth,
            sex: fields.sex,
            owner_id: fields.owner_id,
            mother_id: fields.mother_id,
            father_id: fields.father_id,
        }
    }

    /// Replace every mutable field, keeping the id
    pub fn apply(&mut self, fields: HorseFields) {
        *self = Self::from_fields(self.id, fields);
    }

    /// Whether `parent` is referenced as this horse's mother or father
    pub fn is_child_of(&self, parent: HorseId) -> bool {
        self.mother_id == Some(parent) || self.father_id == Some(parent)
    }

    /// Null out any mother/father reference to `parent`. Returns true if
    /// anything changed.
    pub fn orphan_from(&mut self, parent: HorseId) -> bool {
        let mut changed = false;
        if self.mother_id == Some(parent) {
            self.mother_id = None;
            changed = true;
        }
        if self.father_id == Some(parent) {
            self.father_id = None;
            changed = true;
        }
        changed
    }

    /// Mother and father ids that are set
    pub fn parent_ids(&self) -> impl Iterator<Item = HorseId> {
        self.mother_id.into_iter().chain(self.father_id)
    }
}

/// Candidate data for creating or updating a horse, before field validation.
///
/// Every field is optional so that missing values can be reported as field
/// errors instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<HorseId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub mother_id: Option<HorseId>,
    #[serde(default)]
    pub father_id: Option<HorseId>,
}

impl HorseDraft {
    pub fn new(name: impl Into<String>, date_of_birth: NaiveDate, sex: Sex) -> Self {
        Self {
            name: Some(name.into()),
            date_of_birth: Some(date_of_birth),
            sex: Some(sex),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: HorseId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    pub fn with_mother(mut self, mother: HorseId) -> Self {
        self.mother_id = Some(mother);
        self
    }

    pub fn with_father(mut self, father: HorseId) -> Self {
        self.father_id = Some(father);
        self
    }
}

/// Horse fields that passed field validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorseFields {
    pub name: String,
    pub description: Option<String>,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub owner_id: Option<OwnerId>,
    pub mother_id: Option<HorseId>,
    pub father_id: Option<HorseId>,
}

impl HorseFields {
    pub fn new(name: impl Into<String>, date_of_birth: NaiveDate, sex: Sex) -> Self {
        Self {
            name: name.into(),
            description: None,
            date_of_birth,
            sex,
            owner_id: None,
            mother_id: None,
            father_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    pub fn with_mother(mut self, mother: HorseId) -> Self {
        self.mother_id = Some(mother);
        self
    }

    pub fn with_father(mut self, father: HorseId) -> Self {
        self.father_id = Some(father);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_orphan_from_clears_matching_parent_only() {
        let fields = HorseFields::new("Colt", date(2020, 1, 1), Sex::Male)
            .with_mother(HorseId(1))
            .with_father(HorseId(2));
        let mut horse = Horse::from_fields(HorseId(3), fields);

        assert!(horse.is_child_of(HorseId(1)));
        assert!(horse.orphan_from(HorseId(1)));
        assert_eq!(horse.mother_id, None);
        assert_eq!(horse.father_id, Some(HorseId(2)));
        assert!(!horse.orphan_from(HorseId(1)));
    }

    #[test]
    fn test_sex_parsing_and_serde() {
        assert_eq!("female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("MALE".parse::<Sex>().unwrap(), Sex::Male);
        assert!("gelding".parse::<Sex>().is_err());

        let json = serde_json::to_string(&Sex::Female).unwrap();
        assert_eq!(json, "\"FEMALE\"");
    }

    #[test]
    fn test_draft_deserializes_with_missing_fields() {
        let draft: HorseDraft =
            serde_json::from_str(r#"{"description": "no name", "motherId": 4}"#).unwrap();
        assert_eq!(draft.name, None);
        assert_eq!(draft.mother_id, Some(HorseId(4)));
    }
}
