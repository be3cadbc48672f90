//! Cross-entity consistency checks for horse writes
//!
//! The validator is stateless: it borrows read-only access to the horse
//! graph and the owner directory, runs every check, and returns the
//! accumulated [`ConflictReport`]. It never writes.

use crate::error::{Error, Result};
use crate::horse::{Horse, HorseFields, HorseId, Sex};
use crate::owner::OwnerId;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Read access to stored horses and their parent/child edges
#[async_trait]
pub trait HorseGraph: Send + Sync {
    /// Point lookup
    async fn horse(&self, id: HorseId) -> Result<Option<Horse>>;

    /// Horses whose mother or father reference equals `id`
    async fn children_of(&self, id: HorseId) -> Result<Vec<Horse>>;
}

/// Owner existence check
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn owner_exists(&self, id: OwnerId) -> Result<bool>;
}

/// Which parent slot a check is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Mother,
    Father,
}

impl ParentRole {
    pub fn expected_sex(self) -> Sex {
        match self {
            Self::Mother => Sex::Female,
            Self::Father => Sex::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mother => "mother",
            Self::Father => "father",
        }
    }
}

/// A single cross-entity consistency violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    SelfParent { role: ParentRole },
    OwnerMissing { owner: OwnerId },
    ParentMissing { role: ParentRole, parent: HorseId },
    ParentSexMismatch { role: ParentRole, found: Sex },
    ParentNotOlder { role: ParentRole, parent_born: NaiveDate, child_born: NaiveDate },
    SexLocked,
    DateOfBirthLocked,
    EmailTaken,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfParent { role } => write!(f, "Horse cannot be its own {}", role.as_str()),
            Self::OwnerMissing { .. } => write!(f, "The given owner does not exist"),
            Self::ParentMissing { role, .. } => {
                write!(f, "The given {} does not exist", role.as_str())
            }
            Self::ParentSexMismatch { role, .. } => {
                let expected = match role.expected_sex() {
                    Sex::Female => "Female",
                    Sex::Male => "Male",
                };
                write!(f, "Gender of the {} is not {}!", role.as_str(), expected)
            }
            Self::ParentNotOlder { role, .. } => {
                write!(f, "The child cannot be older than the {}", role.as_str())
            }
            Self::SexLocked => write!(f, "Horse sex cannot change, as it has children"),
            Self::DateOfBirthLocked => {
                write!(f, "Horse date of birth cannot change, as it has children")
            }
            Self::EmailTaken => write!(f, "Email of the owner must be unique"),
        }
    }
}

/// Ordered, duplicate-free list of conflicts. Empty means "no conflicts".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conflict; repeats are ignored
    pub fn push(&mut self, conflict: Conflict) {
        if !self.conflicts.contains(&conflict) {
            self.conflicts.push(conflict);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn contains(&self, conflict: &Conflict) -> bool {
        self.conflicts.contains(conflict)
    }

    pub fn messages(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when empty, otherwise `Error::Conflict` carrying the report
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Conflict(self))
        }
    }
}

impl std::fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl Serialize for ConflictReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.messages().serialize(serializer)
    }
}

impl FromIterator<Conflict> for ConflictReport {
    fn from_iter<I: IntoIterator<Item = Conflict>>(iter: I) -> Self {
        let mut report = Self::new();
        for conflict in iter {
            report.push(conflict);
        }
        report
    }
}

/// Genealogical and temporal checks for horse create/update requests.
///
/// Expects fields that already passed [`crate::validation`].
pub struct PedigreeValidator<'a, G: ?Sized, O: ?Sized> {
    graph: &'a G,
    owners: &'a O,
}

impl<'a, G, O> PedigreeValidator<'a, G, O>
where
    G: HorseGraph + ?Sized,
    O: OwnerDirectory + ?Sized,
{
    pub fn new(graph: &'a G, owners: &'a O) -> Self {
        Self { graph, owners }
    }

    /// Owner, mother and father checks
    pub async fn validate_for_create(&self, fields: &HorseFields) -> Result<ConflictReport> {
        tracing::trace!("validate_for_create({:?})", fields);
        let mut report = ConflictReport::new();

        self.check_owner(fields.owner_id, &mut report).await?;
        self.check_parent(ParentRole::Mother, fields.mother_id, fields.date_of_birth, &mut report)
            .await?;
        self.check_parent(ParentRole::Father, fields.father_id, fields.date_of_birth, &mut report)
            .await?;

        if !report.is_empty() {
            tracing::warn!("Conflicts in horse to create: {:?}", report.messages());
        }
        Ok(report)
    }

    /// Create checks plus self-reference and immutability-under-descendants
    pub async fn validate_for_update(
        &self,
        id: HorseId,
        fields: &HorseFields,
    ) -> Result<ConflictReport> {
        tracing::trace!("validate_for_update({}, {:?})", id, fields);
        let mut report = ConflictReport::new();

        if fields.mother_id == Some(id) {
            report.push(Conflict::SelfParent { role: ParentRole::Mother });
        }
        if fields.father_id == Some(id) {
            report.push(Conflict::SelfParent { role: ParentRole::Father });
        }

        self.check_owner(fields.owner_id, &mut report).await?;
        self.check_parent(ParentRole::Mother, fields.mother_id, fields.date_of_birth, &mut report)
            .await?;
        self.check_parent(ParentRole::Father, fields.father_id, fields.date_of_birth, &mut report)
            .await?;
        self.check_descendants(id, fields, &mut report).await?;

        if !report.is_empty() {
            tracing::warn!("Conflicts in horse {} to update: {:?}", id, report.messages());
        }
        Ok(report)
    }

    async fn check_owner(&self, owner: Option<OwnerId>, report: &mut ConflictReport) -> Result<()> {
        if let Some(owner) = owner {
            if !self.owners.owner_exists(owner).await? {
                report.push(Conflict::OwnerMissing { owner });
            }
        }
        Ok(())
    }

    async fn check_parent(
        &self,
        role: ParentRole,
        parent: Option<HorseId>,
        child_born: NaiveDate,
        report: &mut ConflictReport,
    ) -> Result<()> {
        let Some(parent_id) = parent else {
            return Ok(());
        };
        tracing::trace!("check_parent({}, {})", role.as_str(), parent_id);

        // A missing parent cannot be sex- or date-checked
        let Some(parent) = self.graph.horse(parent_id).await? else {
            report.push(Conflict::ParentMissing { role, parent: parent_id });
            return Ok(());
        };

        if parent.sex != role.expected_sex() {
            report.push(Conflict::ParentSexMismatch { role, found: parent.sex });
        }
        if parent.date_of_birth >= child_born {
            report.push(Conflict::ParentNotOlder {
                role,
                parent_born: parent.date_of_birth,
                child_born,
            });
        }
        Ok(())
    }

    async fn check_descendants(
        &self,
        id: HorseId,
        fields: &HorseFields,
        report: &mut ConflictReport,
    ) -> Result<()> {
        let children = self.graph.children_of(id).await?;
        if children.is_empty() {
            return Ok(());
        }
        tracing::trace!("Horse {} has {} children", id, children.len());

        let stored = self
            .graph
            .horse(id)
            .await?
            .ok_or(Error::HorseNotFound(id))?;

        if stored.sex != fields.sex {
            report.push(Conflict::SexLocked);
        }
        if stored.date_of_birth != fields.date_of_birth {
            report.push(Conflict::DateOfBirthLocked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeGraph {
        horses: HashMap<HorseId, Horse>,
        owners: HashSet<OwnerId>,
    }

    impl FakeGraph {
        fn add(&mut self, id: i64, fields: HorseFields) {
            self.horses.insert(HorseId(id), Horse::from_fields(HorseId(id), fields));
        }
    }

    #[async_trait]
    impl HorseGraph for FakeGraph {
        async fn horse(&self, id: HorseId) -> Result<Option<Horse>> {
            Ok(self.horses.get(&id).cloned())
        }

        async fn children_of(&self, id: HorseId) -> Result<Vec<Horse>> {
            Ok(self.horses.values().filter(|h| h.is_child_of(id)).cloned().collect())
        }
    }

    #[async_trait]
    impl OwnerDirectory for FakeGraph {
        async fn owner_exists(&self, id: OwnerId) -> Result<bool> {
            Ok(self.owners.contains(&id))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A(female, 1990), B(male, 1990), C(mother A, father B, 1992)
    fn family() -> FakeGraph {
        let mut graph = FakeGraph::default();
        graph.add(1, HorseFields::new("A", date(1990, 1, 1), Sex::Female));
        graph.add(2, HorseFields::new("B", date(1990, 1, 1), Sex::Male));
        graph.add(
            3,
            HorseFields::new("C", date(1992, 1, 1), Sex::Female)
                .with_mother(HorseId(1))
                .with_father(HorseId(2)),
        );
        graph.owners.insert(OwnerId(10));
        graph
    }

    #[tokio::test]
    async fn test_valid_create_has_no_conflicts() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("D", date(1995, 5, 5), Sex::Male)
            .with_owner(OwnerId(10))
            .with_mother(HorseId(1))
            .with_father(HorseId(2));

        let report = validator.validate_for_create(&fields).await.unwrap();
        assert!(report.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_male_mother_is_a_sex_mismatch() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("D", date(1995, 5, 5), Sex::Male).with_mother(HorseId(2));

        let report = validator.validate_for_create(&fields).await.unwrap();
        assert_eq!(
            report.conflicts(),
            &[Conflict::ParentSexMismatch { role: ParentRole::Mother, found: Sex::Male }]
        );
    }

    #[tokio::test]
    async fn test_child_must_be_born_strictly_after_parents() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("Twin", date(1990, 1, 1), Sex::Male)
            .with_mother(HorseId(1))
            .with_father(HorseId(2));

        let report = validator.validate_for_create(&fields).await.unwrap();
        assert_eq!(report.len(), 2);
        assert!(report
            .conflicts()
            .iter()
            .all(|c| matches!(c, Conflict::ParentNotOlder { .. })));
    }

    #[tokio::test]
    async fn test_missing_references_accumulate() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("Ghost", date(2000, 1, 1), Sex::Female)
            .with_owner(OwnerId(99))
            .with_mother(HorseId(404))
            .with_father(HorseId(1));

        let report = validator.validate_for_create(&fields).await.unwrap();
        assert_eq!(
            report.messages(),
            vec![
                "The given owner does not exist".to_string(),
                "The given mother does not exist".to_string(),
                "Gender of the father is not Male!".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_self_parentage_on_update() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("C", date(1992, 1, 1), Sex::Female).with_father(HorseId(3));

        let report = validator.validate_for_update(HorseId(3), &fields).await.unwrap();
        assert!(report.contains(&Conflict::SelfParent { role: ParentRole::Father }));
        assert!(matches!(report.into_result(), Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_sex_locked_when_horse_has_children() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("A", date(1990, 1, 1), Sex::Male);

        let report = validator.validate_for_update(HorseId(1), &fields).await.unwrap();
        assert_eq!(report.conflicts(), &[Conflict::SexLocked]);
        assert!(report
            .messages()
            .contains(&"Horse sex cannot change, as it has children".to_string()));
    }

    #[tokio::test]
    async fn test_sex_and_birth_date_locked() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("A", date(1989, 1, 1), Sex::Male);

        let report = validator.validate_for_update(HorseId(1), &fields).await.unwrap();
        assert_eq!(report.conflicts(), &[Conflict::SexLocked, Conflict::DateOfBirthLocked]);
    }

    #[tokio::test]
    async fn test_childless_horse_may_change_sex() {
        let graph = family();
        let validator = PedigreeValidator::new(&graph, &graph);
        let fields = HorseFields::new("C", date(1993, 1, 1), Sex::Male)
            .with_mother(HorseId(1))
            .with_father(HorseId(2));

        let report = validator.validate_for_update(HorseId(3), &fields).await.unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_report_ignores_duplicates() {
        let report: ConflictReport =
            vec![Conflict::SexLocked, Conflict::SexLocked, Conflict::EmailTaken]
                .into_iter()
                .collect();
        assert_eq!(report.len(), 2);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!([
                "Horse sex cannot change, as it has children",
                "Email of the owner must be unique"
            ])
        );
    }
}
