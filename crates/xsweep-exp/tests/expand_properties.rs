use proptest::prelude::*;
use serde_json::Value;
use xsweep_core::{merge_overrides, Combination};
use xsweep_exp::{expand, format_job};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-10.0f64..10.0).prop_map(Value::from),
        "[a-z ,:]{0,8}".prop_map(Value::String),
    ]
}

fn arb_combination() -> impl Strategy<Value = Combination> {
    prop::collection::vec(("[a-z]{1,4}(\\.[a-z]{1,4})?", arb_scalar()), 1..5)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn one_job_per_combination_without_seeds(
        combos in prop::collection::vec(arb_combination(), 1..6)
    ) {
        let jobs = expand(&combos, None, "seed").unwrap();
        prop_assert_eq!(jobs.len(), combos.len());
        for (job, combo) in jobs.iter().zip(&combos) {
            prop_assert_eq!(&job.params, combo);
            prop_assert_eq!(job.seed.as_ref(), None);
        }
    }

    #[test]
    fn seeds_expand_combination_major(
        combos in prop::collection::vec(arb_combination(), 1..5),
        seeds in prop::collection::vec(any::<u16>().prop_map(Value::from), 1..4),
    ) {
        let jobs = expand(&combos, Some(&seeds[..]), "seed").unwrap();
        prop_assert_eq!(jobs.len(), combos.len() * seeds.len());
        for (idx, job) in jobs.iter().enumerate() {
            prop_assert_eq!(job.combination_index, idx / seeds.len());
            prop_assert_eq!(&job.params["seed"], &seeds[idx % seeds.len()]);
        }
        let again = expand(&combos, Some(&seeds[..]), "seed").unwrap();
        prop_assert_eq!(jobs, again);
    }

    #[test]
    fn formatted_jobs_parse_back(
        combos in prop::collection::vec(arb_combination(), 1..4),
        seeds in prop::collection::vec(any::<u16>().prop_map(Value::from), 0..3),
    ) {
        for job in expand(&combos, Some(&seeds[..]), "seed").unwrap() {
            let parsed = merge_overrides(&format_job(&job)).unwrap();
            prop_assert_eq!(parsed, job.params);
        }
    }
}
