//! Hyperparameter tuning: declarative search space and random search.

pub mod search;
pub mod space;

pub use search::{RandomSearch, SearchOutcome, TrialRecord};
pub use space::{classifier_search_space, ParamRange, ParamValue, SearchSpace, TrialConfig};
