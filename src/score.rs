use crate::data::model::{EvalTensor, Shape};

/// Lower clip bound applied to the log-shifted predictions.
pub const CLIP_LO: f32 = 1e-3;
/// Upper clip bound applied to the log-shifted predictions.
pub const CLIP_HI: f32 = 1.0 - 1e-3;

// ---------------------------------------------------------------------------
// Loss modes
// ---------------------------------------------------------------------------

/// How the per-sample loss is derived from the summed predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LossMode {
    /// `-clip(ln(preds - min(preds)), 1e-3, 1 - 1e-3)[true_class]`.
    ///
    /// Keeps the historical numbers: the log is taken of unnormalised shifted
    /// values, so the result almost always sits on the clip floor.
    #[default]
    Compat,
    /// Negative log-likelihood of the shifted predictions normalised to sum to 1.
    Normalized,
}

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

/// Index of the largest value, lowest index on ties. A NaN wins at its
/// first occurrence. Empty input yields 0.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return i;
        }
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Smallest value; NaN if any value is NaN.
pub fn min_value(values: &[f32]) -> f32 {
    values.iter().fold(f32::INFINITY, |acc, &v| {
        if acc.is_nan() || v.is_nan() {
            f32::NAN
        } else {
            acc.min(v)
        }
    })
}

/// Ground-truth class of every sample: arg-max of its true-weights row.
pub fn true_classes(tensor: &EvalTensor) -> Vec<usize> {
    (0..tensor.num_samples())
        .map(|s| argmax(tensor.true_weights(s)))
        .collect()
}

/// Per-tick means summed across ticks, one `classes`-long vector per sample.
pub fn summed_means(tensor: &EvalTensor, sample: usize) -> Vec<f32> {
    let mut out = vec![0f32; tensor.classes()];
    for tick in tensor.means(sample).chunks_exact(tensor.classes()) {
        for (acc, &v) in out.iter_mut().zip(tick) {
            *acc += v;
        }
    }
    out
}

/// Summed predictions for all samples, with their `(samples, classes)` shape.
pub fn predictions_per_sample(tensor: &EvalTensor) -> (Shape, Vec<Vec<f32>>) {
    let preds = (0..tensor.num_samples())
        .map(|s| summed_means(tensor, s))
        .collect();
    (Shape(vec![tensor.num_samples(), tensor.classes()]), preds)
}

// ---------------------------------------------------------------------------
// Per-sample scoring
// ---------------------------------------------------------------------------

/// Outcome for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResult {
    pub index: usize,
    pub true_class: usize,
    pub pred_class: usize,
    pub loss: f32,
}

impl SampleResult {
    pub fn is_correct(&self) -> bool {
        self.true_class == self.pred_class
    }
}

/// Predicted class and loss for one summed prediction vector.
///
/// `true_class` must index into `preds`.
pub fn score_predictions(preds: &[f32], true_class: usize, mode: LossMode) -> (usize, f32) {
    let pred_class = argmax(preds);
    let min_pred = min_value(preds);
    let loss = match mode {
        LossMode::Compat => {
            let xx = (preds[true_class] - min_pred).ln().clamp(CLIP_LO, CLIP_HI);
            -xx
        }
        LossMode::Normalized => {
            let total: f32 = preds.iter().map(|&p| p - min_pred).sum();
            if total.is_nan() {
                return (pred_class, f32::NAN);
            }
            let p = if total > 0.0 {
                (preds[true_class] - min_pred) / total
            } else {
                1.0 / preds.len() as f32
            };
            -p.clamp(CLIP_LO, CLIP_HI).ln()
        }
    };
    (pred_class, loss)
}

/// Whether the true class holds the smallest summed prediction, so the
/// compat loss takes the log of zero.
pub fn hits_log_of_zero(preds: &[f32], true_class: usize) -> bool {
    preds[true_class] == min_value(preds)
}

/// Score every sample of the tensor, in sample order, also returning how
/// many samples hit the log-of-zero case.
pub fn score_all_counted(tensor: &EvalTensor, mode: LossMode) -> (Vec<SampleResult>, usize) {
    let mut log_of_zero = 0usize;
    let results = true_classes(tensor)
        .into_iter()
        .enumerate()
        .map(|(index, true_class)| {
            let preds = summed_means(tensor, index);
            if hits_log_of_zero(&preds, true_class) {
                log_of_zero += 1;
            }
            let (pred_class, loss) = score_predictions(&preds, true_class, mode);
            SampleResult {
                index,
                true_class,
                pred_class,
                loss,
            }
        })
        .collect();
    (results, log_of_zero)
}

/// Score every sample of the tensor, in sample order.
pub fn score_all(tensor: &EvalTensor, mode: LossMode) -> Vec<SampleResult> {
    let (results, log_of_zero) = score_all_counted(tensor, mode);
    if log_of_zero > 0 && mode == LossMode::Compat {
        log::warn!(
            "{log_of_zero} of {} samples have the minimum prediction at the true class; \
             their loss is the clip floor",
            results.len()
        );
    }
    results
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Accuracy and mean loss over a scored run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_loss: f64,
}

impl ScoreSummary {
    pub fn from_results(results: &[SampleResult]) -> Self {
        let samples = results.len();
        let correct = results.iter().filter(|r| r.is_correct()).count();
        let (accuracy, mean_loss) = if samples == 0 {
            (0.0, 0.0)
        } else {
            let loss_sum: f64 = results.iter().map(|r| f64::from(r.loss)).sum();
            (correct as f64 / samples as f64, loss_sum / samples as f64)
        };
        ScoreSummary {
            samples,
            correct,
            accuracy,
            mean_loss,
        }
    }
}
