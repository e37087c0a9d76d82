#![crate_name = "heredity"]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

pub mod prelude;

pub mod assignment;
pub mod error;
pub mod inference;
pub mod observable;
pub mod probabilities;

use crate::error::{DataError, Result};
use crate::observable::CsvBuilder;

/// Observed trait status: `Some(true)` expresses, `Some(false)` does not, `None` unknown.
pub type Evidence = Option<bool>;

/// Number of copies of the variant gene an individual carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeneCount {
    Zero,
    One,
    Two,
}

impl GeneCount {
    pub const ALL: [GeneCount; 3] = [GeneCount::Zero, GeneCount::One, GeneCount::Two];

    pub fn copies(self) -> u8 {
        self.index() as u8
    }

    /// Position of this count in `ALL` and in every per-gene table.
    pub fn index(self) -> usize {
        match self {
            GeneCount::Zero => 0,
            GeneCount::One => 1,
            GeneCount::Two => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One row of a family dataset, before parent names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub mother: Option<String>,
    pub father: Option<String>,
    pub has_trait: Evidence,
}

impl Record {
    pub fn founder(name: &str, has_trait: Evidence) -> Self {
        Self {
            name: name.into(),
            mother: None,
            father: None,
            has_trait,
        }
    }

    pub fn child(name: &str, mother: &str, father: &str, has_trait: Evidence) -> Self {
        Self {
            name: name.into(),
            mother: Some(mother.into()),
            father: Some(father.into()),
            has_trait,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    name: String,
    parents: Option<(usize, usize)>,
    has_trait: Evidence,
}

impl Individual {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Family indices of (mother, father), or `None` for a founder.
    pub fn parents(&self) -> Option<(usize, usize)> {
        self.parents
    }

    pub fn evidence(&self) -> Evidence {
        self.has_trait
    }

    pub fn is_founder(&self) -> bool {
        self.parents.is_none()
    }
}

/// An immutable, validated family tree.
///
/// Individuals are held in name order and addressed by a dense index, so
/// every per-individual table elsewhere in the crate is a plain vector or
/// matrix row.
#[derive(Debug, Clone, Default)]
pub struct Family {
    individuals: Vec<Individual>,
    index: BTreeMap<String, usize>,
}

impl Family {
    /// Builds a family from raw records.
    ///
    /// Fails if a parent name is not in the dataset, if exactly one parent
    /// is recorded, if a name repeats, or if the parent links are cyclic.
    pub fn new<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut by_name: BTreeMap<String, Record> = BTreeMap::new();
        for record in records {
            if by_name.contains_key(&record.name) {
                return Err(DataError::DuplicateName(record.name).into());
            }
            by_name.insert(record.name.clone(), record);
        }

        let index: BTreeMap<String, usize> = by_name
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let resolve = |child: &str, parent: &str| -> Result<usize> {
            if child == parent {
                return Err(DataError::SelfParent(child.into()).into());
            }
            index.get(parent).copied().ok_or_else(|| {
                DataError::UnknownParent {
                    child: child.into(),
                    parent: parent.into(),
                }
                .into()
            })
        };

        let mut individuals = Vec::with_capacity(by_name.len());
        for (name, record) in by_name {
            let parents = match (&record.mother, &record.father) {
                (None, None) => None,
                (Some(mother), Some(father)) => {
                    Some((resolve(&name, mother)?, resolve(&name, father)?))
                }
                _ => return Err(DataError::PartialParentage(name).into()),
            };
            individuals.push(Individual {
                name,
                parents,
                has_trait: record.has_trait,
            });
        }

        let family = Self { individuals, index };
        family.check_acyclic()?;
        Ok(family)
    }

    /// Reads `name,mother,father,trait` CSV data and builds a family from it.
    pub fn from_reader<R: Read + 'static>(reader: R) -> Result<Self> {
        let records = CsvBuilder::new()
            .from_reader(Box::new(reader))?
            .collect::<Result<Vec<Record>>>()?;
        Self::new(records)
    }

    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(family: &Family, i: usize, marks: &mut [Mark]) -> Result<()> {
            match marks[i] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(DataError::Cycle(family.individuals[i].name.clone()).into())
                }
                Mark::Unvisited => {}
            }
            marks[i] = Mark::InProgress;
            if let Some((mother, father)) = family.individuals[i].parents {
                visit(family, mother, marks)?;
                visit(family, father, marks)?;
            }
            marks[i] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.individuals.len()];
        for i in 0..self.individuals.len() {
            visit(self, i, &mut marks)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Names of all individuals in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.individuals.iter().map(|x| x.name.as_str())
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individual(&self, name: &str) -> Option<&Individual> {
        self.index_of(name).map(|i| &self.individuals[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Names of (mother, father). `None` for founders and unknown names.
    pub fn parents(&self, name: &str) -> Option<(&str, &str)> {
        let (mother, father) = self.individual(name)?.parents?;
        Some((
            self.individuals[mother].name(),
            self.individuals[father].name(),
        ))
    }

    /// Trait evidence for `name`; the outer `None` means no such individual.
    pub fn evidence(&self, name: &str) -> Option<Evidence> {
        self.individual(name).map(Individual::evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error as HeredityError;
    use std::error::Error;

    fn potters() -> Vec<Record> {
        vec![
            Record::child("Harry", "Lily", "James", None),
            Record::founder("James", Some(true)),
            Record::founder("Lily", Some(false)),
        ]
    }

    fn data_error(result: Result<Family>) -> DataError {
        match result {
            Err(HeredityError::Data(e)) => e,
            other => panic!("expected data error, got {:?}", other),
        }
    }

    #[test]
    fn test_family_resolves_parents_and_evidence() -> Result<(), Box<dyn Error>> {
        let family = Family::new(potters())?;
        assert_eq!(family.len(), 3);
        assert_eq!(family.names().collect::<Vec<_>>(), vec!["Harry", "James", "Lily"]);
        assert_eq!(family.parents("Harry"), Some(("Lily", "James")));
        assert_eq!(family.parents("James"), None);
        assert_eq!(family.evidence("James"), Some(Some(true)));
        assert_eq!(family.evidence("Harry"), Some(None));
        assert_eq!(family.evidence("Voldemort"), None);
        assert!(family.individual("Lily").map_or(false, Individual::is_founder));
        Ok(())
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let records = vec![
            Record::child("Harry", "Lily", "James", None),
            Record::founder("Lily", None),
        ];
        assert_eq!(
            data_error(Family::new(records)),
            DataError::UnknownParent {
                child: "Harry".into(),
                parent: "James".into()
            }
        );
    }

    #[test]
    fn test_partial_parentage_is_rejected() {
        let mut harry = Record::founder("Harry", None);
        harry.mother = Some("Lily".into());
        let records = vec![harry, Record::founder("Lily", None)];
        assert_eq!(
            data_error(Family::new(records)),
            DataError::PartialParentage("Harry".into())
        );
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let records = vec![Record::founder("Lily", None), Record::founder("Lily", Some(true))];
        assert_eq!(
            data_error(Family::new(records)),
            DataError::DuplicateName("Lily".into())
        );
    }

    #[test]
    fn test_cycles_are_rejected() {
        let records = vec![
            Record::child("A", "B", "C", None),
            Record::child("B", "A", "C", None),
            Record::founder("C", None),
        ];
        assert!(matches!(
            data_error(Family::new(records)),
            DataError::Cycle(_)
        ));

        let records = vec![Record::child("A", "A", "B", None), Record::founder("B", None)];
        assert_eq!(
            data_error(Family::new(records)),
            DataError::SelfParent("A".into())
        );
    }

    #[test]
    fn test_family_from_csv() -> Result<(), Box<dyn Error>> {
        let data = "name,mother,father,trait\nHarry,Lily,James,\nJames,,,1\nLily,,,0\n";
        let family = Family::from_reader(data.as_bytes())?;
        assert_eq!(family.parents("Harry"), Some(("Lily", "James")));
        assert_eq!(family.evidence("Lily"), Some(Some(false)));
        Ok(())
    }

    #[test]
    fn test_gene_count_indices() {
        for (i, g) in GeneCount::ALL.iter().enumerate() {
            assert_eq!(g.index(), i);
            assert_eq!(GeneCount::from_index(i), Some(*g));
        }
        assert_eq!(GeneCount::Two.copies(), 2);
        assert_eq!(GeneCount::from_index(3), None);
    }
}
