//! Declarative hyperparameter search space
//!
//! A [`SearchSpace`] is an ordered list of named parameter ranges. Sampling
//! a space produces a [`TrialConfig`], a flat name-to-value map that the
//! model configuration consumes. Ranges are step-aligned: every sampled
//! value is `min + k * step` for some integer `k`.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{CataractError, Result};

/// A sampled hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{:.4}", v),
        }
    }
}

/// An inclusive, step-aligned range of hyperparameter values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamRange {
    /// Integer range [min, max] with a fixed stride
    Int { min: i64, max: i64, step: i64 },
    /// Float range [min, max] with a fixed stride
    Float { min: f64, max: f64, step: f64 },
}

impl ParamRange {
    /// Validate the range bounds and step
    pub fn validate(&self) -> Result<()> {
        match self {
            ParamRange::Int { min, max, step } => {
                if min > max {
                    return Err(CataractError::Config(format!(
                        "Int range min {} exceeds max {}",
                        min, max
                    )));
                }
                if *step <= 0 {
                    return Err(CataractError::Config(
                        "Int range step must be positive".to_string(),
                    ));
                }
            }
            ParamRange::Float { min, max, step } => {
                if min > max {
                    return Err(CataractError::Config(format!(
                        "Float range min {} exceeds max {}",
                        min, max
                    )));
                }
                if *step <= 0.0 {
                    return Err(CataractError::Config(
                        "Float range step must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Number of distinct values in the range
    pub fn cardinality(&self) -> usize {
        match self {
            ParamRange::Int { min, max, step } => ((max - min) / step) as usize + 1,
            ParamRange::Float { min, max, step } => ((max - min) / step).floor() as usize + 1,
        }
    }

    /// Draw one step-aligned value uniformly from the range
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        let steps = self.cardinality() - 1;
        let k = rng.gen_range(0..=steps);
        match self {
            ParamRange::Int { min, step, .. } => ParamValue::Int(min + k as i64 * step),
            ParamRange::Float { min, step, .. } => ParamValue::Float(min + k as f64 * step),
        }
    }
}

/// One sampled hyperparameter assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    values: BTreeMap<String, ParamValue>,
}

impl TrialConfig {
    /// Create an empty trial configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value
    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Get an integer parameter, failing if absent or the wrong kind
    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(ParamValue::Float(_)) => Err(CataractError::Search(format!(
                "Parameter '{}' is a float, expected an integer",
                name
            ))),
            None => Err(CataractError::Search(format!(
                "Parameter '{}' missing from trial",
                name
            ))),
        }
    }

    /// Get a float parameter, failing if absent or the wrong kind
    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(_)) => Err(CataractError::Search(format!(
                "Parameter '{}' is an integer, expected a float",
                name
            ))),
            None => Err(CataractError::Search(format!(
                "Parameter '{}' missing from trial",
                name
            ))),
        }
    }

    /// Number of parameters in the trial
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the trial is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over name/value pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }
}

impl std::fmt::Display for TrialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// An ordered collection of named parameter ranges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    params: Vec<(String, ParamRange)>,
}

impl SearchSpace {
    /// Create an empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter range, validating it first
    pub fn add(&mut self, name: &str, range: ParamRange) -> Result<()> {
        range.validate()?;
        if self.params.iter().any(|(n, _)| n == name) {
            return Err(CataractError::Config(format!(
                "Duplicate search parameter '{}'",
                name
            )));
        }
        self.params.push((name.to_string(), range));
        Ok(())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the space is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Sample one trial, drawing parameters in declaration order
    pub fn sample<R: Rng>(&self, rng: &mut R) -> TrialConfig {
        let mut trial = TrialConfig::new();
        for (name, range) in &self.params {
            trial.insert(name, range.sample(rng));
        }
        trial
    }

    /// Iterate over the declared ranges
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamRange)> {
        self.params.iter().map(|(name, range)| (name, range))
    }
}

/// The search space of the cataract classifier architecture
pub fn classifier_search_space() -> Result<SearchSpace> {
    let mut space = SearchSpace::new();

    space.add("conv1_filters", ParamRange::Int { min: 32, max: 128, step: 16 })?;
    space.add("conv1_dropout", ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 })?;
    space.add("conv2_filters", ParamRange::Int { min: 64, max: 256, step: 16 })?;
    space.add("conv2_dropout", ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 })?;
    space.add("dense1_units", ParamRange::Int { min: 256, max: 1024, step: 32 })?;
    space.add("dense1_dropout", ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 })?;
    space.add("dense2_units", ParamRange::Int { min: 128, max: 512, step: 32 })?;
    space.add("dense2_dropout", ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 })?;
    space.add("dense3_units", ParamRange::Int { min: 64, max: 256, step: 16 })?;
    space.add("dense3_dropout", ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 })?;

    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_int_range_step_alignment() {
        let range = ParamRange::Int { min: 32, max: 128, step: 16 };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            match range.sample(&mut rng) {
                ParamValue::Int(v) => {
                    assert!((32..=128).contains(&v));
                    assert_eq!((v - 32) % 16, 0);
                }
                ParamValue::Float(_) => panic!("int range produced a float"),
            }
        }
    }

    #[test]
    fn test_float_range_bounds() {
        let range = ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            match range.sample(&mut rng) {
                ParamValue::Float(v) => assert!((0.2..=0.5 + 1e-9).contains(&v)),
                ParamValue::Int(_) => panic!("float range produced an int"),
            }
        }
    }

    #[test]
    fn test_cardinality() {
        let range = ParamRange::Int { min: 64, max: 256, step: 16 };
        assert_eq!(range.cardinality(), 13);

        let range = ParamRange::Float { min: 0.2, max: 0.5, step: 0.1 };
        assert_eq!(range.cardinality(), 4);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(ParamRange::Int { min: 10, max: 5, step: 1 }.validate().is_err());
        assert!(ParamRange::Int { min: 0, max: 5, step: 0 }.validate().is_err());
        assert!(ParamRange::Float { min: 0.5, max: 0.2, step: 0.1 }.validate().is_err());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut space = SearchSpace::new();
        space.add("a", ParamRange::Int { min: 0, max: 10, step: 1 }).unwrap();
        assert!(space.add("a", ParamRange::Int { min: 0, max: 10, step: 1 }).is_err());
    }

    #[test]
    fn test_sample_is_deterministic_per_seed() {
        let space = classifier_search_space().unwrap();

        let a = space.sample(&mut ChaCha8Rng::seed_from_u64(42));
        let b = space.sample(&mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_classifier_space_has_all_architecture_params() {
        let space = classifier_search_space().unwrap();
        assert_eq!(space.len(), 10);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let trial = space.sample(&mut rng);
        assert!(trial.get_int("conv1_filters").is_ok());
        assert!(trial.get_float("dense3_dropout").is_ok());
    }

    #[test]
    fn test_trial_type_mismatch() {
        let mut trial = TrialConfig::new();
        trial.insert("units", ParamValue::Int(64));
        assert!(trial.get_float("units").is_err());
        assert!(trial.get_int("missing").is_err());
    }
}
