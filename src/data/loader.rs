use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Value as JsonValue;

use super::model::{EvalMetadata, EvalTensor, FloatOrder};
use crate::config::InspectConfig;
use crate::error::{EvalError, EvalResult};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// A loaded evaluation dump: sidecar metadata plus the reshaped tensor.
#[derive(Debug, Clone)]
pub struct EvalDump {
    /// The sidecar exactly as parsed, for the diagnostic dump.
    pub metadata_json: JsonValue,
    pub metadata: EvalMetadata,
    pub tensor: EvalTensor,
}

/// Load the metadata sidecar and the binary dump named by `config`.
pub fn load_eval(config: &InspectConfig) -> EvalResult<EvalDump> {
    let (metadata_json, metadata) = load_metadata(&config.meta_path)?;
    log::info!(
        "{}: ticks_per_predict={} y_size={} ({} other keys)",
        config.meta_path.display(),
        metadata.ticks_per_predict,
        metadata.y_size,
        metadata.extra.len()
    );
    if metadata.y_size == 0 {
        return Err(EvalError::InvalidMetadata("y_size must be at least 1".into()));
    }
    let (Some(rows), Some(stride)) = (metadata.rows_per_sample(), metadata.stride()) else {
        return Err(EvalError::InvalidMetadata(format!(
            "ticks_per_predict={} with y_size={} overflows the sample stride",
            metadata.ticks_per_predict, metadata.y_size
        )));
    };
    log::debug!(
        "{rows} rows x {} classes = {stride} floats per sample",
        metadata.y_size
    );

    let floats = load_floats(&config.data_path, config.byte_order)?;
    log::info!(
        "{}: {} floats ({:?} byte order)",
        config.data_path.display(),
        floats.len(),
        config.byte_order
    );

    let tensor = EvalTensor::from_flat(floats, metadata.ticks_per_predict, metadata.y_size)?;
    Ok(EvalDump {
        metadata_json,
        metadata,
        tensor,
    })
}

// ---------------------------------------------------------------------------
// Metadata sidecar
// ---------------------------------------------------------------------------

/// Parse the JSON sidecar, keeping both the raw document and the typed record.
///
/// ```json
/// { "ticks_per_predict": 4, "y_size": 10 }
/// ```
pub fn load_metadata(path: &Path) -> EvalResult<(JsonValue, EvalMetadata)> {
    let file = File::open(path).map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |source| EvalError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let root: JsonValue = serde_json::from_reader(BufReader::new(file)).map_err(parse_err)?;
    let metadata: EvalMetadata = serde_json::from_value(root.clone()).map_err(parse_err)?;
    Ok((root, metadata))
}

// ---------------------------------------------------------------------------
// Binary dump
// ---------------------------------------------------------------------------

/// Read a headerless file of 32-bit floats.
pub fn load_floats(path: &Path, order: FloatOrder) -> EvalResult<Vec<f32>> {
    let io_err = |source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    if bytes.len() % 4 != 0 {
        return Err(EvalError::TrailingBytes {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }

    let mut floats = vec![0f32; bytes.len() / 4];
    order.read_into(&bytes, &mut floats);

    let non_finite = floats.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        log::warn!(
            "{}: {non_finite} non-finite values in dump",
            path.display()
        );
    }
    Ok(floats)
}
