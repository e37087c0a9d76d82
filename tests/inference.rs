//! End-to-end inference checks against reference values and posterior invariants.

use heredity::assignment::{candidate_count, Assignments};
use heredity::prelude::*;
use proptest::prelude::*;
use std::error::Error;

const TOLERANCE: f64 = 1e-9;

fn family(csv: &'static str) -> Family {
    Family::from_reader(csv.as_bytes()).unwrap()
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn assert_posterior(posteriors: &Posteriors, name: &str, gene: [f64; 3], has_trait: f64) {
    let p = posteriors.get(name).unwrap();
    for g in GeneCount::ALL.iter() {
        assert_close(p.gene.get(*g), gene[g.index()], 1e-9);
    }
    assert_close(p.has_trait.present, has_trait, 1e-9);
}

#[test]
fn potters_match_reference_output() -> Result<(), Box<dyn Error>> {
    let posteriors = Engine::default().infer(&family(include_str!("../data/family0.csv")))?;
    assert_eq!(posteriors.len(), 3);
    assert_posterior(&posteriors, "Harry", [0.5351186101, 0.4556982701, 0.0091831197], 0.2665112452);
    assert_posterior(&posteriors, "James", [0.2917933131, 0.5106382979, 0.1975683891], 1.0);
    assert_posterior(&posteriors, "Lily", [0.9827318788, 0.0136490539, 0.0036190673], 0.0);
    Ok(())
}

#[test]
fn weasleys_match_reference_output() -> Result<(), Box<dyn Error>> {
    let posteriors = Engine::default().infer(&family(include_str!("../data/family1.csv")))?;
    assert_posterior(&posteriors, "Arthur", [0.8822557906, 0.0894598972, 0.0282843122], 0.0);
    assert_posterior(&posteriors, "Fred", [0.2917920186, 0.6995517237, 0.0086562577], 1.0);
    assert_posterior(&posteriors, "Ginny", [0.7403108724, 0.2552325640, 0.0044565635], 0.1532301109);
    assert_posterior(&posteriors, "Molly", [0.7260015723, 0.1957688645, 0.0782295632], 0.1677397959);
    Ok(())
}

#[test]
fn unrelated_founders_keep_the_prior() -> Result<(), Box<dyn Error>> {
    let family = Family::new(vec![
        Record::founder("Hermione", None),
        Record::founder("Neville", None),
    ])?;
    let posteriors = Engine::default().infer(&family)?;
    for posterior in &posteriors {
        assert_close(posterior.gene.zero, 0.96, 1e-12);
        assert_close(posterior.gene.one, 0.03, 1e-12);
        assert_close(posterior.gene.two, 0.01, 1e-12);
        // 0.96 * 0.01 + 0.03 * 0.56 + 0.01 * 0.65
        assert_close(posterior.has_trait.present, 0.0329, 1e-12);
    }
    Ok(())
}

#[test]
fn child_of_founders_matches_closed_form() -> Result<(), Box<dyn Error>> {
    let family = Family::new(vec![
        Record::child("Kid", "Mom", "Dad", None),
        Record::founder("Mom", None),
        Record::founder("Dad", None),
    ])?;
    let probabilities = Probabilities::default();
    let mut expected = [0.0; 3];
    for m in GeneCount::ALL.iter() {
        for f in GeneCount::ALL.iter() {
            let weight = probabilities.gene_prior(*m) * probabilities.gene_prior(*f);
            let dist = probabilities.child_gene_distribution(*m, *f);
            for g in 0..3 {
                expected[g] += weight * dist[g];
            }
        }
    }
    // A founder passes the variant with 0.96 * 0.01 + 0.03 * 0.5 + 0.01 * 0.99.
    assert_close(expected[2], 0.0345 * 0.0345, 1e-12);

    let posteriors = Engine::default().infer(&family)?;
    let kid = posteriors.get("Kid").unwrap();
    assert_close(kid.gene.zero, expected[0], TOLERANCE);
    assert_close(kid.gene.one, expected[1], TOLERANCE);
    assert_close(kid.gene.two, expected[2], TOLERANCE);
    Ok(())
}

#[test]
fn enumeration_is_exhaustive_for_one_individual() -> Result<(), Box<dyn Error>> {
    let family = Family::new(vec![Record::founder("Luna", None)])?;
    assert_eq!(Assignments::new(&family).count(), 6);
    assert_eq!(Engine::default().infer(&family)?.assignments_evaluated(), 6);
    Ok(())
}

#[test]
fn contradictory_evidence_is_reported() -> Result<(), Box<dyn Error>> {
    let mut probabilities = Probabilities::default();
    for row in probabilities.trait_given_gene.iter_mut() {
        *row = heredity::probabilities::TraitLikelihood::new(0.0, 1.0);
    }
    let engine = Engine::new(probabilities)?;
    let result = engine.infer(&family(include_str!("../data/family0.csv")));
    match result {
        Err(heredity::error::Error::Normalization { name, .. }) => assert_eq!(name, "Harry"),
        other => panic!("expected normalization error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn zero_probability_assignments_add_no_mass() -> Result<(), Box<dyn Error>> {
    let mut probabilities = Probabilities::default();
    probabilities.gene = [1.0, 0.0, 0.0];
    probabilities.mutation = 0.0;
    let engine = Engine::new(probabilities)?;
    let family = Family::new(vec![
        Record::child("Kid", "Mom", "Dad", None),
        Record::founder("Mom", None),
        Record::founder("Dad", None),
    ])?;

    let posteriors = engine.infer(&family)?;
    assert_eq!(posteriors.assignments_evaluated(), 27 * 8);
    for posterior in &posteriors {
        assert_eq!(posterior.gene.zero, 1.0);
        assert_eq!(posterior.gene.one, 0.0);
        assert_eq!(posterior.gene.two, 0.0);
        assert_close(posterior.has_trait.present, 0.01, 1e-12);
        assert_close(posterior.has_trait.absent, 0.99, 1e-12);
    }
    Ok(())
}

#[test]
fn engine_is_shared_across_threads() -> Result<(), Box<dyn Error>> {
    let engine = std::sync::Arc::new(Engine::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                engine
                    .infer(&family(include_str!("../data/family0.csv")))
                    .map(|p| p.get("Harry").map(|h| h.gene.two))
                    .ok()
                    .flatten()
            })
        })
        .collect();
    for handle in handles {
        let two = handle.join().unwrap().unwrap();
        assert_close(two, 0.0091831197, 1e-9);
    }
    Ok(())
}

fn arb_family() -> impl Strategy<Value = Family> {
    prop::collection::vec(
        (any::<Option<bool>>(), any::<Option<(usize, usize)>>()),
        1..5,
    )
    .prop_map(|rows| {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, (has_trait, parents))| {
                let name = format!("p{}", i);
                match parents {
                    Some((m, f)) if i >= 2 && m % i != f % i => Record::child(
                        &name,
                        &format!("p{}", m % i),
                        &format!("p{}", f % i),
                        has_trait,
                    ),
                    _ => Record::founder(&name, has_trait),
                }
            })
            .collect::<Vec<_>>();
        Family::new(records).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn posteriors_are_distributions_respecting_evidence(family in arb_family()) {
        let posteriors = Engine::default().infer(&family).unwrap();
        prop_assert_eq!(posteriors.len(), family.len());
        prop_assert_eq!(Some(posteriors.assignments_evaluated() as u128), candidate_count(&family));
        for individual in family.individuals() {
            let p = posteriors.get(individual.name()).unwrap();
            prop_assert!((p.gene.sum() - 1.0).abs() <= TOLERANCE);
            prop_assert!((p.has_trait.sum() - 1.0).abs() <= TOLERANCE);
            if let Some(observed) = individual.evidence() {
                prop_assert!((p.has_trait.get(observed) - 1.0).abs() <= TOLERANCE);
                prop_assert_eq!(p.has_trait.get(!observed), 0.0);
            }
        }
    }

    #[test]
    fn inference_is_idempotent_and_order_independent(family in arb_family()) {
        let engine = Engine::default();
        let first = engine.infer(&family).unwrap();
        let second = engine.infer(&family).unwrap();
        let sequential = engine.infer_sequential(&family).unwrap();
        for ((a, b), c) in first.iter().zip(second.iter()).zip(sequential.iter()) {
            prop_assert_eq!(&a.name, &b.name);
            for g in GeneCount::ALL.iter() {
                prop_assert!((a.gene.get(*g) - b.gene.get(*g)).abs() <= 1e-12);
                prop_assert!((a.gene.get(*g) - c.gene.get(*g)).abs() <= 1e-12);
            }
            prop_assert!((a.has_trait.present - c.has_trait.present).abs() <= 1e-12);
        }
    }

    #[test]
    fn every_enumerated_assignment_respects_evidence(family in arb_family()) {
        prop_assert!(Assignments::new(&family).all(|a| a.respects(&family)));
    }
}
