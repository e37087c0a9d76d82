//! Conditional probability tables of the inheritance network.
//!
//! A `Probabilities` value is immutable once validated and is shared by
//! reference between inference runs.

use crate::error::{Error, Result};
use crate::GeneCount;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Largest allowed deviation of a distribution's sum from 1.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Probability of expressing the trait, and of not expressing it, for one gene count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitLikelihood {
    #[serde(rename = "true")]
    pub present: f64,
    #[serde(rename = "false")]
    pub absent: f64,
}

impl TraitLikelihood {
    pub fn new(present: f64, absent: f64) -> Self {
        Self { present, absent }
    }

    pub fn get(&self, has_trait: bool) -> f64 {
        if has_trait {
            self.present
        } else {
            self.absent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    /// Unconditional prior over gene count for founders, indexed by copies.
    pub gene: [f64; 3],

    /// Trait likelihood given gene count, indexed by copies.
    #[serde(rename = "trait")]
    pub trait_given_gene: [TraitLikelihood; 3],

    /// Chance that a transmitted copy flips state on the way to the child.
    pub mutation: f64,
}

impl Default for Probabilities {
    fn default() -> Self {
        Self {
            gene: [0.96, 0.03, 0.01],
            trait_given_gene: [
                TraitLikelihood::new(0.01, 0.99),
                TraitLikelihood::new(0.56, 0.44),
                TraitLikelihood::new(0.65, 0.35),
            ],
            mutation: 0.01,
        }
    }
}

fn check_probability(what: &str, p: f64) -> Result<()> {
    if !p.is_finite() || p < 0.0 || p > 1.0 {
        return Err(Error::InvalidProbabilities(format!(
            "{} must lie in [0, 1], got {}",
            what, p
        )));
    }
    Ok(())
}

fn check_sum(what: &str, values: &[f64]) -> Result<()> {
    let sum: f64 = values.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(Error::InvalidProbabilities(format!(
            "{} must sum to 1, got {}",
            what, sum
        )));
    }
    Ok(())
}

impl Probabilities {
    /// Reads a JSON table and validates it.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let probabilities: Self = serde_json::from_reader(reader)?;
        probabilities.validate()?;
        Ok(probabilities)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading probability tables");
        Self::from_json(BufReader::new(File::open(path)?))
    }

    /// Checks every entry is a probability and every distribution sums to 1.
    pub fn validate(&self) -> Result<()> {
        for g in GeneCount::ALL.iter() {
            check_probability(&format!("gene prior for {} copies", g.copies()), self.gene[g.index()])?;
            let row = &self.trait_given_gene[g.index()];
            let what = format!("trait likelihood for {} copies", g.copies());
            check_probability(&what, row.present)?;
            check_probability(&what, row.absent)?;
            check_sum(&what, &[row.present, row.absent])?;
        }
        check_sum("gene prior", &self.gene)?;
        check_probability("mutation rate", self.mutation)
    }

    pub fn gene_prior(&self, gene: GeneCount) -> f64 {
        self.gene[gene.index()]
    }

    pub fn trait_likelihood(&self, gene: GeneCount, has_trait: bool) -> f64 {
        self.trait_given_gene[gene.index()].get(has_trait)
    }

    /// Probability that a parent with `parent` copies passes the variant to a child.
    pub fn transmission_probability(&self, parent: GeneCount) -> f64 {
        let mu = self.mutation;
        match parent {
            GeneCount::Zero => mu,
            // Passes the variant unmutated, or passes the normal copy and it mutates.
            GeneCount::One => 0.5 * (1.0 - mu) + 0.5 * mu,
            GeneCount::Two => 1.0 - mu,
        }
    }

    /// Distribution of the child's gene count given both parents', indexed by copies.
    pub fn child_gene_distribution(&self, mother: GeneCount, father: GeneCount) -> [f64; 3] {
        let m = self.transmission_probability(mother);
        let f = self.transmission_probability(father);
        [
            (1.0 - m) * (1.0 - f),
            m * (1.0 - f) + (1.0 - m) * f,
            m * f,
        ]
    }
}
