//! Enumeration of every gene/trait assignment consistent with the evidence.
//!
//! Trait subsets and gene partitions are both produced by in-place
//! mixed-radix counters, so nothing is materialized beyond the current
//! candidate. The trait counter runs outermost and subsets that contradict
//! the evidence are dropped before any gene partition is generated for them.

use crate::{Family, GeneCount};
use std::convert::TryFrom;

/// Gene count and trait status for every individual, aligned with family indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    genes: Vec<GeneCount>,
    traits: Vec<bool>,
}

impl Assignment {
    /// The first gene partition (everyone carries zero copies) for a trait subset.
    pub fn first(traits: Vec<bool>) -> Self {
        Self {
            genes: vec![GeneCount::Zero; traits.len()],
            traits,
        }
    }

    /// # Panics
    ///
    /// If `genes` and `traits` differ in length. Every other method indexes
    /// both vectors with the same family index.
    pub fn new(genes: Vec<GeneCount>, traits: Vec<bool>) -> Self {
        assert_eq!(
            genes.len(),
            traits.len(),
            "assignment needs one gene count and one trait value per individual"
        );
        Self { genes, traits }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene(&self, i: usize) -> GeneCount {
        self.genes[i]
    }

    pub fn has_trait(&self, i: usize) -> bool {
        self.traits[i]
    }

    pub fn set_gene(&mut self, i: usize, gene: GeneCount) {
        self.genes[i] = gene;
    }

    pub fn genes(&self) -> &[GeneCount] {
        &self.genes
    }

    pub fn traits(&self) -> &[bool] {
        &self.traits
    }

    /// Moves to the next gene partition for the same trait subset.
    ///
    /// Returns `false`, leaving every gene count at zero again, once all
    /// 3^n partitions have been visited.
    pub fn advance_genes(&mut self) -> bool {
        self.advance_genes_from(0)
    }

    /// Like `advance_genes`, but only counts positions `start..`.
    ///
    /// Gene counts before `start` stay fixed, which lets separate workers
    /// each own one slice of the gene partitions.
    pub fn advance_genes_from(&mut self, start: usize) -> bool {
        for gene in self.genes.iter_mut().skip(start) {
            match *gene {
                GeneCount::Zero => {
                    *gene = GeneCount::One;
                    return true;
                }
                GeneCount::One => {
                    *gene = GeneCount::Two;
                    return true;
                }
                GeneCount::Two => *gene = GeneCount::Zero,
            }
        }
        false
    }

    /// True if every recorded trait value in `family` matches this assignment.
    pub fn respects(&self, family: &Family) -> bool {
        respects_evidence(family, &self.traits)
    }
}

fn respects_evidence(family: &Family, traits: &[bool]) -> bool {
    family
        .individuals()
        .iter()
        .zip(traits)
        .all(|(individual, has_trait)| individual.evidence().map_or(true, |e| e == *has_trait))
}

/// Lazily yields every trait subset that agrees with the evidence.
#[derive(Debug, Clone)]
pub struct TraitSubsets<'a> {
    family: &'a Family,
    next: Option<Vec<bool>>,
}

impl<'a> TraitSubsets<'a> {
    pub fn new(family: &'a Family) -> Self {
        Self {
            family,
            next: Some(vec![false; family.len()]),
        }
    }
}

impl<'a> Iterator for TraitSubsets<'a> {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Vec<bool>> {
        loop {
            let current = self.next.take()?;

            let mut following = current.clone();
            let mut wrapped = true;
            for bit in following.iter_mut() {
                *bit = !*bit;
                if *bit {
                    wrapped = false;
                    break;
                }
            }
            if !wrapped {
                self.next = Some(following);
            }

            if respects_evidence(self.family, &current) {
                return Some(current);
            }
        }
    }
}

/// Admissible trait subsets of `family`.
pub fn trait_subsets(family: &Family) -> TraitSubsets<'_> {
    TraitSubsets::new(family)
}

/// Lazy, restartable sequence of every evidence-consistent `Assignment`.
///
/// Clone it, or call `Assignments::new` again, to start over.
#[derive(Debug, Clone)]
pub struct Assignments<'a> {
    subsets: TraitSubsets<'a>,
    current: Option<Assignment>,
}

impl<'a> Assignments<'a> {
    pub fn new(family: &'a Family) -> Self {
        let mut subsets = TraitSubsets::new(family);
        let current = subsets.next().map(Assignment::first);
        Self { subsets, current }
    }
}

impl<'a> Iterator for Assignments<'a> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        let current = self.current.as_mut()?;
        let assignment = current.clone();
        if !current.advance_genes() {
            self.current = self.subsets.next().map(Assignment::first);
        }
        Some(assignment)
    }
}

/// Number of evidence-consistent candidates, 3^n times 2^(individuals without evidence).
///
/// `None` if the count does not fit in a `u128`.
pub fn candidate_count(family: &Family) -> Option<u128> {
    let n = u32::try_from(family.len()).ok()?;
    let unknown = family
        .individuals()
        .iter()
        .filter(|x| x.evidence().is_none())
        .count();
    let unknown = u32::try_from(unknown).ok()?;
    3u128.checked_pow(n)?.checked_mul(2u128.checked_pow(unknown)?)
}
