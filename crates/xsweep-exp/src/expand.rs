use serde_json::Value;
use xsweep_core::{Combination, JobSpec, SweepError};

use crate::config::empty_combinations;

/// Expands explicit combinations into job specifications.
///
/// Without seeds (absent or empty) every combination yields exactly one job,
/// in input order. With seeds the output is combination-major, seed-minor and
/// each job carries `seed_key: seed`; a seed key already present in the
/// combination is overwritten in place.
pub fn expand(
    combinations: &[Combination],
    seeds: Option<&[Value]>,
    seed_key: &str,
) -> Result<Vec<JobSpec>, SweepError> {
    if combinations.is_empty() {
        return Err(empty_combinations());
    }
    let seeds = seeds.filter(|seeds| !seeds.is_empty());
    let per_combination = seeds.map_or(1, <[Value]>::len);
    let mut jobs = Vec::with_capacity(combinations.len() * per_combination);
    for (combination_index, combination) in combinations.iter().enumerate() {
        match seeds {
            None => jobs.push(JobSpec {
                combination_index,
                seed: None,
                params: combination.clone(),
            }),
            Some(seeds) => {
                for seed in seeds {
                    let mut params = combination.clone();
                    params.insert(seed_key.to_string(), seed.clone());
                    jobs.push(JobSpec {
                        combination_index,
                        seed: Some(seed.clone()),
                        params,
                    });
                }
            }
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn combo(entries: &[(&str, Value)]) -> Combination {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn injected_seed_wins_over_existing_key() {
        let combos = vec![combo(&[("seed", json!(7)), ("lr", json!(0.1))])];
        let jobs = expand(&combos, Some(&[json!(3)][..]), "seed").expect("expand");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].params["seed"], json!(3));
        let keys: Vec<&str> = jobs[0].params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["seed", "lr"]);
    }

    #[test]
    fn custom_seed_key_is_appended_last() {
        let combos = vec![combo(&[("a", json!(1))])];
        let jobs = expand(&combos, Some(&[json!(5)][..]), "trainer.seed").expect("expand");
        let keys: Vec<&str> = jobs[0].params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "trainer.seed"]);
        assert_eq!(jobs[0].seed, Some(json!(5)));
    }

    #[test]
    fn empty_seed_list_behaves_like_none() {
        let combos = vec![combo(&[("a", json!(1))]), combo(&[("a", json!(2))])];
        let with_empty = expand(&combos, Some(&[][..]), "seed").expect("expand");
        let without = expand(&combos, None, "seed").expect("expand");
        assert_eq!(with_empty, without);
        assert!(with_empty.iter().all(|job| !job.params.contains_key("seed")));
    }

    #[test]
    fn nested_values_pass_through() {
        let combos = vec![combo(&[("layers", json!([64, 32])), ("opt", json!({"name": "adam"}))])];
        let jobs = expand(&combos, None, "seed").expect("expand");
        assert_eq!(jobs[0].params, combos[0]);
    }

    #[test]
    fn rejects_empty_combinations() {
        let err = expand(&[], Some(&[json!(1)][..]), "seed").expect_err("empty");
        assert_eq!(err.info().code, "xsweep.config.empty_combinations");
    }
}
