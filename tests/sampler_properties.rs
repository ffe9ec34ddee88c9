use lineup_optimizer::{ConfigurationError, Hitter, Outcome, OutcomeProbabilities, OutcomeSampler};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

/// A hitter whose counts are internally consistent: walks and hit-by-pitch
/// come out of plate appearances, hits out of at-bats, extra-base hits out of
/// hits.
fn consistent_hitter() -> impl Strategy<Value = Hitter> {
    (2u32..700, 0.0..0.5f64, 0.0..0.5f64, 0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64, 0.0..=1.0f64).prop_map(
        |(pa, bb_frac, hit_frac, d, t, h, pace)| {
            let free = f64::from(pa) * bb_frac;
            let walks = (free * 0.8) as u32;
            let hbp = (free * 0.2) as u32;
            let at_bats = pa - walks - hbp;
            let hits = (f64::from(at_bats) * hit_frac) as u32;
            let doubles = (f64::from(hits) * d * 0.5) as u32;
            let triples = (f64::from(hits - doubles) * t * 0.5) as u32;
            let home_runs = (f64::from(hits - doubles - triples) * h) as u32;
            Hitter::builder("p")
                .plate_appearances(pa)
                .at_bats(at_bats)
                .hits(hits)
                .doubles(doubles)
                .triples(triples)
                .home_runs(home_runs)
                .walks(walks)
                .hit_by_pitch(hbp)
                .pace(pace)
                .build()
        },
    )
}

proptest! {
    #[test]
    fn probabilities_are_valid_for_consistent_hitters(hitter in consistent_hitter()) {
        let p = OutcomeProbabilities::from_hitter(&hitter).unwrap();
        for x in p.as_array() {
            prop_assert!((0.0..=1.0).contains(&x), "probability {x} out of range");
        }
        prop_assert!(p.total() <= 1.0 + EPS);
        prop_assert!(p.out() >= 0.0);
        prop_assert!((p.out() - (1.0 - p.total())).abs() < EPS);
    }

    #[test]
    fn draws_past_the_total_are_outs(hitter in consistent_hitter(), u in 0.0..1.0f64) {
        let sampler = OutcomeSampler::new(&hitter).unwrap();
        let total = sampler.probabilities().total();
        let outcome = sampler.outcome_for(u);
        if u >= total + EPS {
            prop_assert_eq!(outcome, Outcome::Out);
        }
        if u + EPS < total {
            prop_assert_ne!(outcome, Outcome::Out);
        }
    }

    #[test]
    fn arbitrary_counts_either_validate_or_name_the_hitter(
        pa in 0u32..50,
        ab in 0u32..50,
        hits in 0u32..50,
        doubles in 0u32..20,
        home_runs in 0u32..20,
        walks in 0u32..50,
    ) {
        let hitter = Hitter::builder("Any")
            .plate_appearances(pa)
            .at_bats(ab)
            .hits(hits)
            .doubles(doubles)
            .home_runs(home_runs)
            .walks(walks)
            .pace(0.5)
            .build();

        match OutcomeProbabilities::from_hitter(&hitter) {
            Ok(p) => {
                prop_assert!(p.total() <= 1.0 + EPS);
                prop_assert!(p.as_array().iter().all(|x| *x >= 0.0));
            }
            Err(
                ConfigurationError::ZeroDenominator { hitter, .. }
                | ConfigurationError::NegativeCount { hitter, .. }
                | ConfigurationError::ProbabilityOverflow { hitter, .. },
            ) => prop_assert_eq!(hitter, "Any"),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}
