use std::path::{Path, PathBuf};

use crate::data::model::FloatOrder;
use crate::score::LossMode;

/// Where the dump lives when no path is given.
pub const DEFAULT_DATA_PATH: &str = "data/eval.bin";

/// Suffix the producer appends to the dump path for its sidecar.
pub const META_SUFFIX: &str = ".meta.json";

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything one inspection run needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectConfig {
    pub data_path: PathBuf,
    pub meta_path: PathBuf,
    pub byte_order: FloatOrder,
    pub loss_mode: LossMode,
    /// Optional per-sample CSV report.
    pub csv_path: Option<PathBuf>,
    /// Percentile buckets printed under each statistics block (0 = none).
    pub percentiles: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        let data_path = PathBuf::from(DEFAULT_DATA_PATH);
        Self {
            meta_path: meta_path_for(&data_path),
            data_path,
            byte_order: FloatOrder::default(),
            loss_mode: LossMode::default(),
            csv_path: None,
            percentiles: 0,
        }
    }
}

/// `data/eval.bin` → `data/eval.bin.meta.json`.
pub fn meta_path_for(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_owned();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}
