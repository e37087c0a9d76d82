//! Exact posterior marginals by full enumeration.
//!
//! `Engine::infer` walks every evidence-consistent assignment, evaluates its
//! joint probability, folds it into per-individual histograms and finally
//! normalizes each histogram into a distribution.
//!
//! ## Feature gating
//!
//! With the `parallel` feature, work is split by admissible trait subset
//! and by the first individual's gene count across the rayon pool. Each worker fills its own partial histograms and
//! the partials are merged at the end, so no shared accumulator is written
//! concurrently.

use crate::assignment::{candidate_count, trait_subsets, Assignment};
use crate::error::{Error, Result};
use crate::probabilities::Probabilities;
use crate::{Family, GeneCount};
use ndarray::{Array2, Axis};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

/// Probability of one complete assignment under the network's factorization.
///
/// Founders contribute their gene prior, everyone else the child
/// distribution given the parents' counts in the same assignment; every
/// individual also contributes the likelihood of their trait value. Very
/// small products may underflow to zero, which is a valid result.
pub fn joint_probability(
    family: &Family,
    probabilities: &Probabilities,
    assignment: &Assignment,
) -> f64 {
    family
        .individuals()
        .iter()
        .enumerate()
        .map(|(i, individual)| {
            let gene = assignment.gene(i);
            let gene_p = match individual.parents() {
                None => probabilities.gene_prior(gene),
                Some((mother, father)) => probabilities.child_gene_distribution(
                    assignment.gene(mother),
                    assignment.gene(father),
                )[gene.index()],
            };
            gene_p * probabilities.trait_likelihood(gene, assignment.has_trait(i))
        })
        .product()
}

fn trait_index(has_trait: bool) -> usize {
    usize::from(has_trait)
}

/// Unnormalized gene (n x 3) and trait (n x 2) histograms, one row per individual.
///
/// Trait columns are ordered `[false, true]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Marginals {
    genes: Array2<f64>,
    traits: Array2<f64>,
}

impl Marginals {
    pub fn zeros(individuals: usize) -> Self {
        Self {
            genes: Array2::zeros((individuals, GeneCount::ALL.len())),
            traits: Array2::zeros((individuals, 2)),
        }
    }

    /// Adds `p` to each individual's bucket for their assigned gene count and trait.
    pub fn accumulate(&mut self, assignment: &Assignment, p: f64) {
        for i in 0..assignment.len() {
            self.genes[[i, assignment.gene(i).index()]] += p;
            self.traits[[i, trait_index(assignment.has_trait(i))]] += p;
        }
    }

    /// Combines partial histograms filled by separate workers.
    pub fn merge(mut self, other: &Marginals) -> Self {
        self.genes += &other.genes;
        self.traits += &other.traits;
        self
    }

    pub fn gene_mass(&self, i: usize, gene: GeneCount) -> f64 {
        self.genes[[i, gene.index()]]
    }

    pub fn trait_mass(&self, i: usize, has_trait: bool) -> f64 {
        self.traits[[i, trait_index(has_trait)]]
    }

    /// Rescales every histogram to sum to 1.
    ///
    /// Fails on the first individual whose gene or trait histogram holds
    /// no mass at all.
    pub fn normalize(mut self, family: &Family) -> Result<Vec<Posterior>> {
        for (distribution, histogram) in [("gene", &mut self.genes), ("trait", &mut self.traits)] {
            for (i, mut row) in histogram.axis_iter_mut(Axis(0)).enumerate() {
                let sum = row.sum();
                if sum == 0.0 {
                    return Err(Error::Normalization {
                        name: family.individuals()[i].name().to_owned(),
                        distribution,
                    });
                }
                row /= sum;
            }
        }

        Ok(family
            .individuals()
            .iter()
            .enumerate()
            .map(|(i, individual)| Posterior {
                name: individual.name().to_owned(),
                gene: GeneDistribution {
                    zero: self.gene_mass(i, GeneCount::Zero),
                    one: self.gene_mass(i, GeneCount::One),
                    two: self.gene_mass(i, GeneCount::Two),
                },
                has_trait: TraitDistribution {
                    present: self.trait_mass(i, true),
                    absent: self.trait_mass(i, false),
                },
            })
            .collect())
    }
}

/// Posterior over gene count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeneDistribution {
    #[serde(rename = "0")]
    pub zero: f64,
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "2")]
    pub two: f64,
}

impl GeneDistribution {
    pub fn get(&self, gene: GeneCount) -> f64 {
        match gene {
            GeneCount::Zero => self.zero,
            GeneCount::One => self.one,
            GeneCount::Two => self.two,
        }
    }

    pub fn sum(&self) -> f64 {
        self.zero + self.one + self.two
    }
}

/// Posterior over trait expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraitDistribution {
    #[serde(rename = "true")]
    pub present: f64,
    #[serde(rename = "false")]
    pub absent: f64,
}

impl TraitDistribution {
    pub fn get(&self, has_trait: bool) -> f64 {
        if has_trait {
            self.present
        } else {
            self.absent
        }
    }

    pub fn sum(&self) -> f64 {
        self.present + self.absent
    }
}

/// Final distributions for one individual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posterior {
    pub name: String,
    pub gene: GeneDistribution,
    #[serde(rename = "trait")]
    pub has_trait: TraitDistribution,
}

/// Inference result for a whole family, in family order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posteriors {
    individuals: Vec<Posterior>,
    assignments_evaluated: u64,
}

impl Posteriors {
    pub fn get(&self, name: &str) -> Option<&Posterior> {
        self.individuals.iter().find(|x| x.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posterior> {
        self.individuals.iter()
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Number of candidate assignments whose joint probability was computed.
    pub fn assignments_evaluated(&self) -> u64 {
        self.assignments_evaluated
    }
}

impl<'a> IntoIterator for &'a Posteriors {
    type Item = &'a Posterior;
    type IntoIter = std::slice::Iter<'a, Posterior>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Histograms plus counters for one worker's share of the enumeration.
#[derive(Debug, Clone)]
struct Tally {
    marginals: Marginals,
    evaluated: u64,
    underflowed: u64,
}

impl Tally {
    fn new(individuals: usize) -> Self {
        Self {
            marginals: Marginals::zeros(individuals),
            evaluated: 0,
            underflowed: 0,
        }
    }

    fn record(&mut self, assignment: &Assignment, p: f64) {
        self.evaluated += 1;
        if p == 0.0 {
            self.underflowed += 1;
        }
        self.marginals.accumulate(assignment, p);
    }

    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    fn merge(self, other: Tally) -> Self {
        Self {
            marginals: self.marginals.merge(&other.marginals),
            evaluated: self.evaluated + other.evaluated,
            underflowed: self.underflowed + other.underflowed,
        }
    }
}

/// Starting points for parallel workers: one per admissible trait subset
/// and gene count of the first individual, paired with the number of
/// leading gene counts the worker keeps fixed.
#[cfg(feature = "parallel")]
fn partitions(family: &Family) -> Vec<(Assignment, usize)> {
    trait_subsets(family)
        .flat_map(|traits| -> Vec<(Assignment, usize)> {
            if traits.is_empty() {
                return vec![(Assignment::first(traits), 0)];
            }
            GeneCount::ALL
                .iter()
                .map(|gene| {
                    let mut start = Assignment::first(traits.clone());
                    start.set_gene(0, *gene);
                    (start, 1)
                })
                .collect()
        })
        .collect()
}

/// Inference engine over a fixed set of probability tables.
///
/// The tables are never mutated, so one engine can serve any number of
/// families, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    probabilities: Probabilities,
}

impl Engine {
    /// Validates `probabilities` and builds an engine around them.
    pub fn new(probabilities: Probabilities) -> Result<Self> {
        probabilities.validate()?;
        Ok(Self { probabilities })
    }

    pub fn probabilities(&self) -> &Probabilities {
        &self.probabilities
    }

    pub fn joint_probability(&self, family: &Family, assignment: &Assignment) -> f64 {
        joint_probability(family, &self.probabilities, assignment)
    }

    /// Computes every individual's posterior gene and trait distributions.
    pub fn infer(&self, family: &Family) -> Result<Posteriors> {
        #[cfg(feature = "parallel")]
        let tally = self.enumerate_parallel(family);
        #[cfg(not(feature = "parallel"))]
        let tally = self.enumerate(family);
        self.finish(family, tally)
    }

    /// Same as `infer`, always on the calling thread.
    pub fn infer_sequential(&self, family: &Family) -> Result<Posteriors> {
        let tally = self.enumerate(family);
        self.finish(family, tally)
    }

    fn enumerate(&self, family: &Family) -> Tally {
        tracing::info!(
            individuals = family.len(),
            candidates = ?candidate_count(family),
            "enumerating assignments"
        );
        trait_subsets(family).fold(Tally::new(family.len()), |tally, traits| {
            self.tally_subset(family, traits, tally)
        })
    }

    #[cfg(feature = "parallel")]
    fn enumerate_parallel(&self, family: &Family) -> Tally {
        let partitions = partitions(family);
        tracing::info!(
            individuals = family.len(),
            candidates = ?candidate_count(family),
            partitions = partitions.len(),
            threads = rayon::current_num_threads(),
            "enumerating assignments in parallel"
        );
        let n = family.len();
        partitions
            .into_par_iter()
            .fold(
                || Tally::new(n),
                |tally, (start, fixed)| self.tally_partition(family, start, fixed, tally),
            )
            .reduce(|| Tally::new(n), Tally::merge)
    }

    /// Evaluates all 3^n gene partitions for one trait subset.
    fn tally_subset(&self, family: &Family, traits: Vec<bool>, tally: Tally) -> Tally {
        self.tally_partition(family, Assignment::first(traits), 0, tally)
    }

    /// Evaluates `start` and every gene partition reached by counting
    /// positions `fixed..`, leaving the first `fixed` gene counts alone.
    fn tally_partition(
        &self,
        family: &Family,
        mut assignment: Assignment,
        fixed: usize,
        mut tally: Tally,
    ) -> Tally {
        loop {
            let p = joint_probability(family, &self.probabilities, &assignment);
            tally.record(&assignment, p);
            if !assignment.advance_genes_from(fixed) {
                return tally;
            }
        }
    }

    fn finish(&self, family: &Family, tally: Tally) -> Result<Posteriors> {
        tracing::debug!(
            evaluated = tally.evaluated,
            zero_probability = tally.underflowed,
            "enumeration finished"
        );
        let individuals = tally.marginals.normalize(family)?;
        Ok(Posteriors {
            individuals,
            assignments_evaluated: tally.evaluated,
        })
    }
}
