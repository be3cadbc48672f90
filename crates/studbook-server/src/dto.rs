//! Response shapes shared by the REST API and the CLI's JSON output

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use studbook_core::{Error, Horse, HorseDraft, HorseId, Owner, OwnerId, Sex};

/// Owner as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDto {
    pub id: OwnerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl From<Owner> for OwnerDto {
    fn from(owner: Owner) -> Self {
        Self {
            id: owner.id,
            first_name: owner.first_name,
            last_name: owner.last_name,
            email: owner.email,
        }
    }
}

/// Mother or father of a horse, reduced to id and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentDto {
    pub id: HorseId,
    pub name: String,
}

impl From<&Horse> for ParentDto {
    fn from(horse: &Horse) -> Self {
        Self {
            id: horse.id,
            name: horse.name.clone(),
        }
    }
}

/// Row of a horse listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseListDto {
    pub id: HorseId,
    pub name: String,
    pub description: Option<String>,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub owner: Option<OwnerDto>,
}

impl HorseListDto {
    /// `owners` must contain the owner of `horse`, if it has one
    pub fn from_horse(horse: Horse, owners: &HashMap<OwnerId, Owner>) -> Result<Self, Error> {
        let owner = match horse.owner_id {
            Some(id) => Some(owners.get(&id).cloned().map(OwnerDto::from).ok_or_else(|| {
                Error::Fatal(format!(
                    "Given owner map does not contain owner of horse {}",
                    horse.id
                ))
            })?),
            None => None,
        };

        Ok(Self {
            id: horse.id,
            name: horse.name,
            description: horse.description,
            date_of_birth: horse.date_of_birth,
            sex: horse.sex,
            owner,
        })
    }
}

/// Full view of a single horse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseDetailDto {
    pub id: HorseId,
    pub name: String,
    pub description: Option<String>,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub owner: Option<OwnerDto>,
    pub mother: Option<ParentDto>,
    pub father: Option<ParentDto>,
}

/// Draft that stores this horse back unchanged
impl From<&HorseDetailDto> for HorseDraft {
    fn from(horse: &HorseDetailDto) -> Self {
        Self {
            id: Some(horse.id),
            name: Some(horse.name.clone()),
            description: horse.description.clone(),
            date_of_birth: Some(horse.date_of_birth),
            sex: Some(horse.sex),
            owner_id: horse.owner.as_ref().map(|o| o.id),
            mother_id: horse.mother.as_ref().map(|p| p.id),
            father_id: horse.father.as_ref().map(|p| p.id),
        }
    }
}

/// Error payload for 4xx/5xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ErrorDto {
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Validation(_) => Self {
                message: "Validation failed".to_string(),
                errors: err.messages(),
            },
            Error::Conflict(_) => Self {
                message: "Conflict with existing data".to_string(),
                errors: err.messages(),
            },
            // Internal details stay in the log
            Error::Storage(_) | Error::Serialization(_) | Error::Fatal(_) => Self {
                message: "Internal server error".to_string(),
                errors: Vec::new(),
            },
            other => Self {
                message: other.to_string(),
                errors: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studbook_core::{FieldError, HorseFields};

    #[test]
    fn test_list_dto_resolves_owner() {
        let horse = Horse::from_fields(
            HorseId(1),
            HorseFields::new("Wendy", NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(), Sex::Female)
                .with_owner(OwnerId(7)),
        );

        let err = HorseListDto::from_horse(horse.clone(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Fatal(_)));

        let mut owners = HashMap::new();
        owners.insert(
            OwnerId(7),
            Owner {
                id: OwnerId(7),
                first_name: "Anna".into(),
                last_name: "Huber".into(),
                email: None,
            },
        );
        let dto = HorseListDto::from_horse(horse, &owners).unwrap();
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["dateOfBirth"], "2015-03-01");
        assert_eq!(json["sex"], "FEMALE");
        assert_eq!(json["owner"]["firstName"], "Anna");
    }

    #[test]
    fn test_detail_round_trips_into_draft() {
        let detail = HorseDetailDto {
            id: HorseId(4),
            name: "Hugo".into(),
            description: None,
            date_of_birth: NaiveDate::from_ymd_opt(2018, 5, 1).unwrap(),
            sex: Sex::Male,
            owner: None,
            mother: Some(ParentDto {
                id: HorseId(2),
                name: "Wendy".into(),
            }),
            father: None,
        };

        let draft = HorseDraft::from(&detail);
        assert_eq!(draft.id, Some(HorseId(4)));
        assert_eq!(draft.name.as_deref(), Some("Hugo"));
        assert_eq!(draft.mother_id, Some(HorseId(2)));
        assert_eq!(draft.father_id, None);
        assert_eq!(draft.owner_id, None);
    }

    #[test]
    fn test_error_dto_lists_every_problem() {
        let err = Error::Validation(vec![FieldError::MissingName, FieldError::MissingSex]);
        let dto = ErrorDto::from_error(&err);
        assert_eq!(dto.message, "Validation failed");
        assert_eq!(
            dto.errors,
            vec![
                "Name of the horse cannot be null".to_string(),
                "Sex of the horse cannot be null".to_string()
            ]
        );

        let dto = ErrorDto::from_error(&Error::Fatal("owner 3 missing".into()));
        assert_eq!(dto.message, "Internal server error");
        assert!(dto.errors.is_empty());
    }
}
