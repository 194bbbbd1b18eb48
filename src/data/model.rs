use std::collections::BTreeMap;
use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{EvalError, EvalResult};

// ---------------------------------------------------------------------------
// EvalMetadata – the JSON sidecar
// ---------------------------------------------------------------------------

/// Layout parameters written next to the dump by the producing trainer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvalMetadata {
    /// Number of prediction ticks recorded per sample.
    pub ticks_per_predict: usize,
    /// Number of classes (length of every row).
    pub y_size: usize,
    /// Any other keys; not consumed, only echoed in the metadata dump.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl EvalMetadata {
    /// Rows per sample: one true-weights row, then the means and stds blocks.
    /// `None` if it does not fit in `usize`.
    pub fn rows_per_sample(&self) -> Option<usize> {
        rows_per_sample(self.ticks_per_predict)
    }

    /// Floats per sample, `None` on overflow.
    pub fn stride(&self) -> Option<usize> {
        sample_stride(self.ticks_per_predict, self.y_size)
    }
}

/// `1 + 2 * ticks`, checked.
pub fn rows_per_sample(ticks: usize) -> Option<usize> {
    ticks.checked_mul(2).and_then(|t| t.checked_add(1))
}

/// `(1 + 2 * ticks) * classes`, checked.
pub fn sample_stride(ticks: usize, classes: usize) -> Option<usize> {
    rows_per_sample(ticks).and_then(|rows| rows.checked_mul(classes))
}

// ---------------------------------------------------------------------------
// FloatOrder – byte order of the binary dump
// ---------------------------------------------------------------------------

/// Byte order the producer used when writing floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FloatOrder {
    /// Whatever this machine uses (the producer writes raw memory).
    #[default]
    Native,
    Little,
    Big,
}

impl FloatOrder {
    /// Decode `src` into `dst`. `src.len()` must equal `4 * dst.len()`.
    pub fn read_into(self, src: &[u8], dst: &mut [f32]) {
        match self {
            FloatOrder::Native => NativeEndian::read_f32_into(src, dst),
            FloatOrder::Little => LittleEndian::read_f32_into(src, dst),
            FloatOrder::Big => BigEndian::read_f32_into(src, dst),
        }
    }

    /// Encode `src` into `dst`. `dst.len()` must equal `4 * src.len()`.
    pub fn write_from(self, src: &[f32], dst: &mut [u8]) {
        match self {
            FloatOrder::Native => NativeEndian::write_f32_into(src, dst),
            FloatOrder::Little => LittleEndian::write_f32_into(src, dst),
            FloatOrder::Big => BigEndian::write_f32_into(src, dst),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape – Python-style tuple formatting
// ---------------------------------------------------------------------------

/// Array shape, displayed as `(5,)`, `(5, 3)`, `(5, 2, 3)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape(pub Vec<usize>);

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [one] => write!(f, "({one},)"),
            dims => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EvalTensor – the reshaped (samples, 1 + 2*ticks, classes) view
// ---------------------------------------------------------------------------

/// Row-major `(num_samples, 1 + 2*ticks, classes)` view over a flat buffer.
///
/// Per sample, row 0 holds the true weights, rows `1..=ticks` the per-tick
/// prediction means and rows `ticks+1..=2*ticks` the per-tick stds.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalTensor {
    data: Vec<f32>,
    ticks: usize,
    classes: usize,
    samples: usize,
}

impl EvalTensor {
    /// Reshape a flat buffer, checking that it splits into whole samples.
    pub fn from_flat(data: Vec<f32>, ticks: usize, classes: usize) -> EvalResult<Self> {
        if classes == 0 {
            return Err(EvalError::InvalidMetadata("y_size must be at least 1".into()));
        }
        let stride = sample_stride(ticks, classes).ok_or_else(|| {
            EvalError::InvalidMetadata(format!(
                "ticks_per_predict={ticks} with y_size={classes} overflows the sample stride"
            ))
        })?;
        if data.len() % stride != 0 {
            return Err(EvalError::ShapeMismatch {
                len: data.len(),
                stride,
            });
        }
        let samples = data.len() / stride;
        log::debug!(
            "reshaping {} floats: stride {stride}, {samples} samples",
            data.len()
        );
        Ok(EvalTensor {
            data,
            ticks,
            classes,
            samples,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.samples
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn rows_per_sample(&self) -> usize {
        1 + 2 * self.ticks
    }

    fn stride(&self) -> usize {
        self.rows_per_sample() * self.classes
    }

    /// The flat buffer as loaded.
    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> Shape {
        Shape(vec![self.samples, self.rows_per_sample(), self.classes])
    }

    fn rows(&self, sample: usize, start: usize, count: usize) -> &[f32] {
        let base = sample * self.stride() + start * self.classes;
        &self.data[base..base + count * self.classes]
    }

    /// Row 0 of a sample.
    pub fn true_weights(&self, sample: usize) -> &[f32] {
        self.rows(sample, 0, 1)
    }

    /// Rows `1..=ticks` of a sample, contiguous (`ticks * classes` floats).
    pub fn means(&self, sample: usize) -> &[f32] {
        self.rows(sample, 1, self.ticks)
    }

    /// Rows `ticks+1..=2*ticks` of a sample, contiguous.
    pub fn stds(&self, sample: usize) -> &[f32] {
        self.rows(sample, 1 + self.ticks, self.ticks)
    }

    /// Every value of the means block, sample by sample.
    pub fn means_block(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.samples).flat_map(move |s| self.means(s).iter().copied())
    }

    pub fn means_block_shape(&self) -> Shape {
        Shape(vec![self.samples, self.ticks, self.classes])
    }

    /// Every value of the stds block, sample by sample.
    pub fn stds_block(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.samples).flat_map(move |s| self.stds(s).iter().copied())
    }

    pub fn stds_block_shape(&self) -> Shape {
        Shape(vec![self.samples, self.ticks, self.classes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> EvalTensor {
        // 2 samples, ticks=1, classes=2 -> stride 6
        let data = (0..12).map(|v| v as f32).collect();
        EvalTensor::from_flat(data, 1, 2).expect("reshape failed")
    }

    #[test]
    fn reshape_splits_rows_per_sample() {
        let t = tensor();
        assert_eq!(t.num_samples(), 2);
        assert_eq!(t.shape().to_string(), "(2, 3, 2)");
        assert_eq!(t.true_weights(1), &[6.0, 7.0]);
        assert_eq!(t.means(1), &[8.0, 9.0]);
        assert_eq!(t.stds(0), &[4.0, 5.0]);
        assert_eq!(
            t.num_samples() * t.rows_per_sample() * t.classes(),
            t.raw().len()
        );
    }

    #[test]
    fn blocks_iterate_in_sample_order() {
        let t = tensor();
        let means: Vec<f32> = t.means_block().collect();
        assert_eq!(means, vec![2.0, 3.0, 8.0, 9.0]);
        let stds: Vec<f32> = t.stds_block().collect();
        assert_eq!(stds, vec![4.0, 5.0, 10.0, 11.0]);
    }

    #[test]
    fn reshape_rejects_partial_sample() {
        let err = EvalTensor::from_flat(vec![0.0; 7], 1, 2).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { len: 7, stride: 6 }));
    }

    #[test]
    fn reshape_rejects_overflowing_stride() {
        let ticks = 1usize << (usize::BITS - 1);
        let err = EvalTensor::from_flat(vec![0.0], ticks, 1).unwrap_err();
        assert!(matches!(err, EvalError::InvalidMetadata(_)), "{err}");

        let err = EvalTensor::from_flat(vec![0.0], 1, usize::MAX).unwrap_err();
        assert!(matches!(err, EvalError::InvalidMetadata(_)), "{err}");
    }

    #[test]
    fn stride_helpers_check_overflow() {
        assert_eq!(sample_stride(2, 3), Some(15));
        assert_eq!(sample_stride(0, 4), Some(4));
        assert_eq!(rows_per_sample(usize::MAX / 2), Some(usize::MAX));
        assert_eq!(rows_per_sample(usize::MAX / 2 + 1), None);
        assert_eq!(sample_stride(usize::MAX / 2, 2), None);
    }

    #[test]
    fn reshape_rejects_zero_classes() {
        let err = EvalTensor::from_flat(Vec::new(), 1, 0).unwrap_err();
        assert!(matches!(err, EvalError::InvalidMetadata(_)));
    }

    #[test]
    fn zero_ticks_leaves_only_true_weights() {
        let t = EvalTensor::from_flat(vec![1.0, 0.0, 0.0, 1.0], 0, 2).expect("reshape failed");
        assert_eq!(t.num_samples(), 2);
        assert!(t.means(0).is_empty());
        assert_eq!(t.means_block().count(), 0);
    }

    #[test]
    fn shape_formats_like_tuples() {
        assert_eq!(Shape(vec![5]).to_string(), "(5,)");
        assert_eq!(Shape(vec![5, 3]).to_string(), "(5, 3)");
        assert_eq!(Shape(vec![]).to_string(), "()");
    }

    #[test]
    fn float_order_round_trips_big_endian() {
        let src = [1.5f32, -2.0];
        let mut bytes = [0u8; 8];
        FloatOrder::Big.write_from(&src, &mut bytes);
        assert_eq!(&bytes[..4], &1.5f32.to_be_bytes());
        let mut back = [0f32; 2];
        FloatOrder::Big.read_into(&bytes, &mut back);
        assert_eq!(back, src);
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let meta: EvalMetadata =
            serde_json::from_str(r#"{"ticks_per_predict": 2, "y_size": 3, "seed": 7}"#)
                .expect("parse failed");
        assert_eq!(meta.rows_per_sample(), Some(5));
        assert_eq!(meta.stride(), Some(15));
        assert_eq!(meta.extra.get("seed"), Some(&JsonValue::from(7)));
    }
}
