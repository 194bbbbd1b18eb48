use std::fmt;

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics over a block of floats.
///
/// Accumulates in `f64` and reports `f32`, with population standard deviation.
/// A NaN anywhere in the input makes mean, std, min and max NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    /// `n + 1` values at sorted positions `i * count / n`, or empty.
    pub percentiles: Vec<f32>,
}

impl Summary {
    /// Summarise `values`, or `None` when there are none.
    pub fn from_values<I>(values: I, num_pcts: usize) -> Option<Summary>
    where
        I: IntoIterator<Item = f32>,
    {
        let values: Vec<f32> = values.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        let count = values.len();

        let mut sum = 0f64;
        let mut min = values[0];
        let mut max = values[0];
        let mut saw_nan = false;
        for &v in &values {
            sum += f64::from(v);
            if v.is_nan() {
                saw_nan = true;
            } else {
                min = min.min(v);
                max = max.max(v);
            }
        }
        let mean = sum / count as f64;
        let var = values
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        if saw_nan {
            min = f32::NAN;
            max = f32::NAN;
        }

        Some(Summary {
            count,
            mean: mean as f32,
            std: var.sqrt() as f32,
            min,
            max,
            percentiles: percentiles(values, num_pcts),
        })
    }
}

fn percentiles(mut values: Vec<f32>, num_pcts: usize) -> Vec<f32> {
    if num_pcts == 0 {
        return Vec::new();
    }
    values.sort_by(f32::total_cmp);
    let n = values.len();
    (0..=num_pcts)
        .map(|i| values[(i * n / num_pcts).min(n - 1)])
        .collect()
}

/// Float text as array scalars print it: `1.0`, `0.25`, `nan`, `-inf`.
pub fn fmt_float(v: f32) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{v:?}")
    }
}

/// `mean std min max`, space separated.
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            fmt_float(self.mean),
            fmt_float(self.std),
            fmt_float(self.min),
            fmt_float(self.max)
        )
    }
}
