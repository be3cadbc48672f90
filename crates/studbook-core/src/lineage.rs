//! Lineage (pedigree tree) retrieval and assembly
//!
//! The store hands back a flat, generation-tagged set of ancestors; this
//! module walks the parent edges to produce that set and reassembles it into
//! a nested tree rooted at the queried horse.

use crate::error::{Error, Result};
use crate::horse::{Horse, HorseId, Sex};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Default number of generations for tree requests
pub const DEFAULT_GENERATIONS: u32 = 5;

/// A horse found by the ancestor walk, tagged with its generation.
/// Generation 1 is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorRow {
    pub horse: Horse,
    pub generation: u32,
}

/// Check a caller-supplied generation bound
pub fn check_generations(generations: i64) -> Result<u32> {
    if generations < 1 {
        return Err(Error::InvalidGenerations(generations));
    }
    Ok(u32::try_from(generations).unwrap_or(u32::MAX))
}

/// Bounded breadth-first walk over mother/father edges.
///
/// Each horse appears once, tagged with the smallest generation it was
/// reached at. Returns an empty set if the root does not exist.
pub fn walk_ancestors<E>(
    root: HorseId,
    max_generations: u32,
    mut lookup: impl FnMut(HorseId) -> std::result::Result<Option<Horse>, E>,
) -> std::result::Result<Vec<AncestorRow>, E> {
    let mut rows = Vec::new();
    if max_generations == 0 {
        return Ok(rows);
    }

    let mut seen: HashSet<HorseId> = HashSet::new();
    let mut queue: VecDeque<(HorseId, u32)> = VecDeque::new();
    queue.push_back((root, 1));
    seen.insert(root);

    while let Some((id, generation)) = queue.pop_front() {
        let Some(horse) = lookup(id)? else {
            continue;
        };

        if generation < max_generations {
            for parent in horse.parent_ids() {
                if seen.insert(parent) {
                    queue.push_back((parent, generation + 1));
                }
            }
        }
        rows.push(AncestorRow { horse, generation });
    }

    tracing::debug!(
        "Ancestor walk from {} (max {} generations) found {} horses",
        root,
        max_generations,
        rows.len()
    );
    Ok(rows)
}

/// Keep the smallest generation per horse id. Used by backends whose
/// native walk can report a horse more than once.
pub fn dedup_min_generation(rows: Vec<AncestorRow>) -> Vec<AncestorRow> {
    let mut best: HashMap<HorseId, AncestorRow> = HashMap::new();
    for row in rows {
        match best.get(&row.horse.id) {
            Some(existing) if existing.generation <= row.generation => {}
            _ => {
                best.insert(row.horse.id, row);
            }
        }
    }
    let mut rows: Vec<AncestorRow> = best.into_values().collect();
    rows.sort_by_key(|r| (r.generation, r.horse.id));
    rows
}

/// A horse in a lineage tree. Derived on every request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageNode {
    pub id: HorseId,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub mother: Option<Box<LineageNode>>,
    pub father: Option<Box<LineageNode>>,
}

impl LineageNode {
    fn leaf(horse: &Horse) -> Self {
        Self {
            id: horse.id,
            name: horse.name.clone(),
            date_of_birth: horse.date_of_birth,
            sex: horse.sex,
            mother: None,
            father: None,
        }
    }

    /// Number of generations in this tree (1 for a lone node)
    pub fn depth(&self) -> u32 {
        let mother = self.mother.as_ref().map_or(0, |m| m.depth());
        let father = self.father.as_ref().map_or(0, |f| f.depth());
        1 + mother.max(father)
    }

    /// Number of nodes, counting repeated ancestors once per appearance
    pub fn node_count(&self) -> usize {
        1 + self.mother.as_ref().map_or(0, |m| m.node_count())
            + self.father.as_ref().map_or(0, |f| f.node_count())
    }
}

/// Rebuilds a nested tree from the flat ancestor set
#[derive(Debug, Clone, Copy)]
pub struct LineageAssembler {
    max_generations: u32,
}

impl Default for LineageAssembler {
    fn default() -> Self {
        Self {
            max_generations: u32::MAX,
        }
    }
}

impl LineageAssembler {
    /// Assembler that never places a node deeper than `max_generations`
    pub fn new(max_generations: u32) -> Self {
        Self { max_generations }
    }

    /// Build the tree rooted at `root`.
    ///
    /// Fails with `HorseNotFound` if the root is not in `rows`. Parents that
    /// are absent from `rows` (unset, or beyond the bound) leave their slot
    /// empty.
    pub fn build(&self, root: HorseId, rows: &[AncestorRow]) -> Result<LineageNode> {
        let by_id: HashMap<HorseId, &Horse> = rows.iter().map(|r| (r.horse.id, &r.horse)).collect();
        let horse = by_id.get(&root).copied().ok_or(Error::HorseNotFound(root))?;

        let mut path = HashSet::new();
        self.resolve(horse, 1, &by_id, &mut path)
    }

    fn resolve(
        &self,
        horse: &Horse,
        generation: u32,
        by_id: &HashMap<HorseId, &Horse>,
        path: &mut HashSet<HorseId>,
    ) -> Result<LineageNode> {
        if !path.insert(horse.id) {
            tracing::error!("Horse {} is its own ancestor", horse.id);
            return Err(Error::Fatal(format!("Horse {} is its own ancestor", horse.id)));
        }

        let mut node = LineageNode::leaf(horse);
        if generation < self.max_generations {
            node.mother = self.resolve_parent(horse.mother_id, generation, by_id, path)?;
            node.father = self.resolve_parent(horse.father_id, generation, by_id, path)?;
        }

        path.remove(&horse.id);
        Ok(node)
    }

    fn resolve_parent(
        &self,
        parent: Option<HorseId>,
        generation: u32,
        by_id: &HashMap<HorseId, &Horse>,
        path: &mut HashSet<HorseId>,
    ) -> Result<Option<Box<LineageNode>>> {
        match parent.and_then(|id| by_id.get(&id).copied()) {
            Some(parent) => Ok(Some(Box::new(self.resolve(parent, generation + 1, by_id, path)?))),
            None => Ok(None),
        }
    }
}

/// Build a tree without a depth bound beyond what `rows` contains
pub fn build_tree(root: HorseId, rows: &[AncestorRow]) -> Result<LineageNode> {
    LineageAssembler::default().build(root, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::HorseFields;
    use std::convert::Infallible;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    /// 1 <- (2, 3); 2 <- (4, 5); 3 <- (4, 6); 4 <- (7, -)
    fn herd() -> HashMap<HorseId, Horse> {
        let mut horses = HashMap::new();
        let mut add = |id: i64, year: i32, sex: Sex, mother: Option<i64>, father: Option<i64>| {
            let mut fields = HorseFields::new(format!("H{}", id), date(year), sex);
            fields.mother_id = mother.map(HorseId);
            fields.father_id = father.map(HorseId);
            horses.insert(HorseId(id), Horse::from_fields(HorseId(id), fields));
        };
        add(1, 2020, Sex::Female, Some(2), Some(3));
        add(2, 2010, Sex::Female, Some(4), Some(5));
        add(3, 2010, Sex::Male, Some(4), Some(6));
        add(4, 2000, Sex::Female, Some(7), None);
        add(5, 2000, Sex::Male, None, None);
        add(6, 2000, Sex::Male, None, None);
        add(7, 1990, Sex::Female, None, None);
        horses
    }

    fn walk(horses: &HashMap<HorseId, Horse>, root: i64, generations: u32) -> Vec<AncestorRow> {
        walk_ancestors(HorseId(root), generations, |id| {
            Ok::<_, Infallible>(horses.get(&id).cloned())
        })
        .unwrap()
    }

    #[test]
    fn test_walk_tags_minimum_generation_without_duplicates() {
        let horses = herd();
        let rows = walk(&horses, 1, 3);

        let generations: HashMap<i64, u32> =
            rows.iter().map(|r| (r.horse.id.0, r.generation)).collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(generations[&1], 1);
        assert_eq!(generations[&2], 2);
        assert_eq!(generations[&4], 3);
        assert!(!generations.contains_key(&7));
    }

    #[test]
    fn test_walk_of_missing_root_is_empty() {
        let horses = herd();
        assert!(walk(&horses, 42, 5).is_empty());
        assert!(walk(&horses, 1, 0).is_empty());
    }

    #[test]
    fn test_single_generation_has_empty_parent_slots() {
        let horses = herd();
        let rows = walk(&horses, 1, 1);
        let tree = LineageAssembler::new(1).build(HorseId(1), &rows).unwrap();

        assert_eq!(tree.name, "H1");
        assert!(tree.mother.is_none());
        assert!(tree.father.is_none());
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_shared_ancestor_appears_in_both_branches() {
        let horses = herd();
        let rows = walk(&horses, 1, 3);
        let tree = LineageAssembler::new(3).build(HorseId(1), &rows).unwrap();

        let mother = tree.mother.as_ref().unwrap();
        let father = tree.father.as_ref().unwrap();
        assert_eq!(mother.mother.as_ref().unwrap().id, HorseId(4));
        assert_eq!(father.mother.as_ref().unwrap().id, HorseId(4));
        // 7 is generation 4 and was never fetched
        assert!(mother.mother.as_ref().unwrap().mother.is_none());
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn test_tree_saturates_at_maximum_depth() {
        let horses = herd();
        let deep = LineageAssembler::new(4).build(HorseId(1), &walk(&horses, 1, 4)).unwrap();
        let deeper = LineageAssembler::new(5).build(HorseId(1), &walk(&horses, 1, 5)).unwrap();
        assert_eq!(deep, deeper);
        assert_eq!(deep.depth(), 4);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let horses = herd();
        let rows = walk(&horses, 2, 3);
        let err = build_tree(HorseId(1), &rows).unwrap_err();
        assert!(matches!(err, Error::HorseNotFound(HorseId(1))));
    }

    #[test]
    fn test_cycle_is_fatal() {
        let mut fields = HorseFields::new("Loop", date(2000), Sex::Female);
        fields.mother_id = Some(HorseId(1));
        let rows = vec![AncestorRow {
            horse: Horse::from_fields(HorseId(1), fields),
            generation: 1,
        }];
        assert!(matches!(build_tree(HorseId(1), &rows), Err(Error::Fatal(_))));
    }

    #[test]
    fn test_dedup_keeps_smallest_generation() {
        let horses = herd();
        let mut rows = walk(&horses, 1, 3);
        let duplicate = AncestorRow {
            horse: horses[&HorseId(4)].clone(),
            generation: 5,
        };
        rows.push(duplicate);

        let rows = dedup_min_generation(rows);
        assert_eq!(rows.len(), 6);
        let four = rows.iter().find(|r| r.horse.id == HorseId(4)).unwrap();
        assert_eq!(four.generation, 3);
        assert_eq!(rows[0].horse.id, HorseId(1));
    }

    #[test]
    fn test_generation_bound_check() {
        assert_eq!(check_generations(3).unwrap(), 3);
        assert!(matches!(check_generations(0), Err(Error::InvalidGenerations(0))));
        assert!(check_generations(-2).is_err());
    }
}
