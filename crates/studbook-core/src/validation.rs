//! Field validation for horse and owner candidates
//!
//! These checks look at a single candidate in isolation. Anything that needs
//! the store (parents, owners, children) lives in [`crate::pedigree`].

use crate::horse::{HorseDraft, HorseFields, HorseId};
use crate::owner::{OwnerDraft, OwnerFields};
use chrono::NaiveDate;

/// Maximum length for a horse description (4095 chars)
pub const MAX_DESCRIPTION_LEN: usize = 4095;

/// Maximum length of the part of an email before the `@` (64 chars)
pub const MAX_EMAIL_LOCAL_LEN: usize = 64;

/// A single field that fails an intrinsic constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    MissingId,
    MissingName,
    BlankName,
    BlankDescription,
    DescriptionTooLong { len: usize, max: usize },
    MissingDateOfBirth,
    DateOfBirthInFuture { date: NaiveDate },
    MissingSex,
    MissingOwnerFirstName,
    MissingOwnerLastName,
    InvalidEmail,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "No ID given"),
            Self::MissingName => write!(f, "Name of the horse cannot be null"),
            Self::BlankName => write!(f, "Name of the horse cannot be blank"),
            Self::BlankDescription => write!(f, "Horse description is given but blank"),
            Self::DescriptionTooLong { max, .. } => {
                write!(f, "Horse description too long: longer than {} characters", max)
            }
            Self::MissingDateOfBirth => write!(f, "Date of birth of the horse cannot be null"),
            Self::DateOfBirthInFuture { .. } => {
                write!(f, "Date of birth of the horse cannot be in the future")
            }
            Self::MissingSex => write!(f, "Sex of the horse cannot be null"),
            Self::MissingOwnerFirstName => write!(f, "First name of the owner cannot be null"),
            Self::MissingOwnerLastName => write!(f, "Last name of the owner cannot be null"),
            Self::InvalidEmail => write!(f, "Email of the owner is invalid"),
        }
    }
}

impl std::error::Error for FieldError {}

/// Validate a horse candidate for creation.
///
/// `today` bounds the date of birth; callers pass the current date.
pub fn validate_horse_for_create(
    draft: &HorseDraft,
    today: NaiveDate,
) -> Result<HorseFields, Vec<FieldError>> {
    let mut errors = Vec::new();
    let fields = check_horse_fields(draft, today, &mut errors);
    match fields {
        Some(fields) if errors.is_empty() => Ok(fields),
        _ => Err(errors),
    }
}

/// Validate a horse candidate for update. The draft must carry the id of
/// the horse being replaced.
pub fn validate_horse_for_update(
    draft: &HorseDraft,
    today: NaiveDate,
) -> Result<(HorseId, HorseFields), Vec<FieldError>> {
    let mut errors = Vec::new();
    if draft.id.is_none() {
        errors.push(FieldError::MissingId);
    }
    let fields = check_horse_fields(draft, today, &mut errors);
    match (draft.id, fields) {
        (Some(id), Some(fields)) if errors.is_empty() => Ok((id, fields)),
        _ => Err(errors),
    }
}

fn check_horse_fields(
    draft: &HorseDraft,
    today: NaiveDate,
    errors: &mut Vec<FieldError>,
) -> Option<HorseFields> {
    match &draft.name {
        None => errors.push(FieldError::MissingName),
        Some(name) if name.trim().is_empty() => errors.push(FieldError::BlankName),
        Some(_) => {}
    }

    if let Some(description) = &draft.description {
        if description.trim().is_empty() {
            errors.push(FieldError::BlankDescription);
        }
        let len = description.chars().count();
        if len > MAX_DESCRIPTION_LEN {
            errors.push(FieldError::DescriptionTooLong {
                len,
                max: MAX_DESCRIPTION_LEN,
            });
        }
    }

    match draft.date_of_birth {
        None => errors.push(FieldError::MissingDateOfBirth),
        Some(date) if date > today => errors.push(FieldError::DateOfBirthInFuture { date }),
        Some(_) => {}
    }

    if draft.sex.is_none() {
        errors.push(FieldError::MissingSex);
    }

    Some(HorseFields {
        name: draft.name.clone()?,
        description: draft.description.clone(),
        date_of_birth: draft.date_of_birth?,
        sex: draft.sex?,
        owner_id: draft.owner_id,
        mother_id: draft.mother_id,
        father_id: draft.father_id,
    })
}

/// Validate an owner candidate
pub fn validate_owner(draft: &OwnerDraft) -> Result<OwnerFields, Vec<FieldError>> {
    let mut errors = Vec::new();

    if draft.first_name.is_none() {
        errors.push(FieldError::MissingOwnerFirstName);
    }
    if draft.last_name.is_none() {
        errors.push(FieldError::MissingOwnerLastName);
    }
    if let Some(email) = &draft.email {
        if !is_valid_email(email) {
            errors.push(FieldError::InvalidEmail);
        }
    }

    match (&draft.first_name, &draft.last_name) {
        (Some(first), Some(last)) if errors.is_empty() => Ok(OwnerFields {
            first_name: first.clone(),
            last_name: last.clone(),
            email: draft.email.clone(),
        }),
        _ => Err(errors),
    }
}

/// Syntactic email check: dot-separated local part of `[A-Za-z0-9_-]`
/// (at most 64 chars), and a domain with at least two labels whose last
/// label is two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > MAX_EMAIL_LOCAL_LEN {
        return false;
    }
    let local_ok = local.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });
    if !local_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let first = labels[0];
    let last = labels[labels.len() - 1];

    labels_ok
        && first.len() >= 2
        && !first.starts_with('-')
        && last.len() >= 2
        && last.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::Sex;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_valid_horse_passes() {
        let born = NaiveDate::from_ymd_opt(2015, 12, 12).unwrap();
        let draft = HorseDraft::new("Wendy", born, Sex::Female).with_description("Grand mother");
        let fields = validate_horse_for_create(&draft, today()).unwrap();
        assert_eq!(fields.name, "Wendy");
        assert_eq!(fields.sex, Sex::Female);
    }

    #[test]
    fn test_horse_errors_accumulate() {
        let draft = HorseDraft {
            name: None,
            description: Some(String::new()),
            date_of_birth: Some(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()),
            sex: Some(Sex::Male),
            ..HorseDraft::default()
        };

        let errors = validate_horse_for_create(&draft, today()).unwrap_err();
        assert_eq!(errors.len(), 3);
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert!(messages.contains(&"Name of the horse cannot be null".to_string()));
        assert!(messages.contains(&"Horse description is given but blank".to_string()));
        assert!(messages
            .contains(&"Date of birth of the horse cannot be in the future".to_string()));
    }

    #[test]
    fn test_description_length_limit() {
        let base = HorseDraft::new("Long", NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(), Sex::Male);
        let at_limit = base.clone().with_description("x".repeat(MAX_DESCRIPTION_LEN));
        assert!(validate_horse_for_create(&at_limit, today()).is_ok());

        let over = base.with_description("x".repeat(MAX_DESCRIPTION_LEN + 1));
        let errors = validate_horse_for_create(&over, today()).unwrap_err();
        assert!(matches!(errors[0], FieldError::DescriptionTooLong { len: 4096, .. }));
    }

    #[test]
    fn test_update_requires_id() {
        let born = NaiveDate::from_ymd_opt(2012, 3, 3).unwrap();
        let draft = HorseDraft::new("Baba", born, Sex::Male);
        let errors = validate_horse_for_update(&draft, today()).unwrap_err();
        assert_eq!(errors, vec![FieldError::MissingId]);

        let (id, _) = validate_horse_for_update(&draft.with_id(HorseId(7)), today()).unwrap();
        assert_eq!(id, HorseId(7));
    }

    #[test]
    fn test_owner_validation() {
        let errors = validate_owner(&OwnerDraft {
            first_name: None,
            last_name: None,
            email: Some("not-an-email".into()),
        })
        .unwrap_err();
        assert_eq!(errors.len(), 3);

        let fields = validate_owner(&OwnerDraft::new("Anna", "Huber")).unwrap();
        assert_eq!(fields.email, None);
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("anna.huber@example.com"));
        assert!(is_valid_email("a_b-c@mail.tuwien.ac.at"));
        assert!(!is_valid_email("anna@localhost"));
        assert!(!is_valid_email("anna..huber@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("anna@-bad.com"));
        assert!(!is_valid_email("anna@example.c0m"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(65))));
    }
}
