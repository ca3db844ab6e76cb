//! Dataset handling: image loading, assembly, splitting, label encoding
//! and tensor batching.

pub mod batch;
pub mod encode;
pub mod loader;
pub mod split;

pub use batch::{FundusBatch, FundusBatcher};
pub use encode::{decode, one_hot, one_hot_batch};
pub use loader::{ClassFolder, DatasetStats, FundusDataset, FundusItem};
pub use split::{DatasetSplits, SplitConfig};
