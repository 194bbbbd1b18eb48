use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::data::loader::EvalDump;
use crate::data::model::Shape;
use crate::score::{predictions_per_sample, true_classes, SampleResult};
use crate::stats::{fmt_float, Summary};

// ---------------------------------------------------------------------------
// Console report
// ---------------------------------------------------------------------------

/// Write the full console report: metadata, shapes, statistics, per-sample lines.
pub fn write_report<W: Write>(
    out: &mut W,
    dump: &EvalDump,
    results: &[SampleResult],
    num_pcts: usize,
) -> io::Result<()> {
    write_metadata(out, &dump.metadata_json)?;

    let tensor = &dump.tensor;
    writeln!(out, "Orig shape: {}", Shape(vec![tensor.raw().len()]))?;
    writeln!(out, "Reshaped: {}", tensor.shape())?;
    writeln!(out)?;

    let truths = true_classes(tensor);
    writeln!(out, "true classes: {}", Shape(vec![truths.len()]))?;
    writeln!(out)?;

    write_block(
        out,
        "prediction stds across repeats per tick",
        &tensor.stds_block_shape(),
        Summary::from_values(tensor.stds_block(), num_pcts),
    )?;
    write_block(
        out,
        "prediction means across repeats per tick",
        &tensor.means_block_shape(),
        Summary::from_values(tensor.means_block(), num_pcts),
    )?;
    let (shape, preds) = predictions_per_sample(tensor);
    write_block(
        out,
        "prediction means across repeats (summed across ticks)",
        &shape,
        Summary::from_values(preds.into_iter().flatten(), num_pcts),
    )?;

    for r in results {
        writeln!(out, "{}", sample_line(r))?;
    }
    Ok(())
}

/// Pretty-printed sidecar, 4-space indent, keys sorted.
pub fn write_metadata<W: Write>(out: &mut W, json: &JsonValue) -> io::Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut *out, formatter);
    json.serialize(&mut ser)?;
    writeln!(out)
}

fn write_block<W: Write>(
    out: &mut W,
    label: &str,
    shape: &Shape,
    summary: Option<Summary>,
) -> io::Result<()> {
    writeln!(out, "{label}")?;
    match summary {
        Some(s) => {
            writeln!(out, "{shape} {s}")?;
            if !s.percentiles.is_empty() {
                let pcts: Vec<String> = s.percentiles.iter().map(|&p| fmt_float(p)).collect();
                writeln!(out, "percentiles of {} values: {}", s.count, pcts.join(" "))?;
            }
        }
        None => writeln!(out, "{shape} nan nan nan nan")?,
    }
    writeln!(out)
}

/// `%4d true %d pred %d acc %d loss %.3f`
pub fn sample_line(r: &SampleResult) -> String {
    let loss = if r.loss.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.3}", r.loss)
    };
    format!(
        "{:4} true {} pred {} acc {} loss {}",
        r.index,
        r.true_class,
        r.pred_class,
        u8::from(r.is_correct()),
        loss
    )
}

// ---------------------------------------------------------------------------
// CSV report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CsvRow {
    index: usize,
    true_class: usize,
    pred_class: usize,
    acc: u8,
    loss: f32,
}

impl From<&SampleResult> for CsvRow {
    fn from(r: &SampleResult) -> Self {
        CsvRow {
            index: r.index,
            true_class: r.true_class,
            pred_class: r.pred_class,
            acc: u8::from(r.is_correct()),
            loss: r.loss,
        }
    }
}

/// Per-sample results as CSV with a header row.
pub fn write_csv(path: &Path, results: &[SampleResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for r in results {
        writer.serialize(CsvRow::from(r)).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{EvalMetadata, EvalTensor};
    use crate::score::{score_all, LossMode};

    fn dump() -> EvalDump {
        let metadata_json: JsonValue =
            serde_json::from_str(r#"{"y_size": 3, "ticks_per_predict": 2, "alpha": [1, 2]}"#)
                .unwrap();
        let metadata: EvalMetadata = serde_json::from_value(metadata_json.clone()).unwrap();
        let data = vec![
            0.0, 1.0, 0.0, //
            0.2, 0.5, 0.3, //
            0.1, 0.6, 0.3, //
            0.5, 0.5, 0.5, //
            0.5, 0.5, 0.5, //
        ];
        EvalDump {
            metadata_json,
            metadata,
            tensor: EvalTensor::from_flat(data, 2, 3).unwrap(),
        }
    }

    fn render(num_pcts: usize) -> String {
        let d = dump();
        let results = score_all(&d.tensor, LossMode::Compat);
        let mut out = Vec::new();
        write_report(&mut out, &d, &results, num_pcts).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn metadata_is_sorted_with_four_space_indent() {
        let text = render(0);
        let expected = concat!(
            "{\n",
            "    \"alpha\": [\n",
            "        1,\n",
            "        2\n",
            "    ],\n",
            "    \"ticks_per_predict\": 2,\n",
            "    \"y_size\": 3\n",
            "}\n",
        );
        assert!(text.starts_with(expected), "{text}");
    }

    #[test]
    fn report_sections_in_order() {
        let text = render(0);
        let lines: Vec<&str> = text.lines().collect();
        let at = |needle: &str| {
            lines
                .iter()
                .position(|l| *l == needle)
                .unwrap_or_else(|| panic!("missing {needle:?} in\n{text}"))
        };
        let orig = at("Orig shape: (15,)");
        let reshaped = at("Reshaped: (1, 5, 3)");
        let truths = at("true classes: (1,)");
        let stds = at("prediction stds across repeats per tick");
        let means = at("prediction means across repeats per tick");
        let summed = at("prediction means across repeats (summed across ticks)");
        assert!(orig < reshaped && reshaped < truths && truths < stds);
        assert!(stds < means && means < summed);

        assert_eq!(lines[stds + 1], "(1, 2, 3) 0.5 0.0 0.5 0.5");
        assert!(lines[means + 1].starts_with("(1, 2, 3) "));
        assert!(lines[summed + 1].starts_with("(1, 3) "));
        assert_eq!(*lines.last().unwrap(), "   0 true 1 pred 1 acc 1 loss -0.001");
    }

    #[test]
    fn percentiles_follow_statistics_when_requested() {
        let text = render(2);
        assert!(text.contains(
            "(1, 2, 3) 0.5 0.0 0.5 0.5\npercentiles of 6 values: 0.5 0.5 0.5\n"
        ));
        assert!(!render(0).contains("percentiles"));
    }

    #[test]
    fn empty_blocks_print_nan() {
        let metadata_json: JsonValue =
            serde_json::from_str(r#"{"ticks_per_predict": 0, "y_size": 2}"#).unwrap();
        let d = EvalDump {
            metadata: serde_json::from_value(metadata_json.clone()).unwrap(),
            metadata_json,
            tensor: EvalTensor::from_flat(vec![0.0, 1.0], 0, 2).unwrap(),
        };
        let results = score_all(&d.tensor, LossMode::Compat);
        let mut out = Vec::new();
        write_report(&mut out, &d, &results, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(
            "prediction stds across repeats per tick\n(1, 0, 2) nan nan nan nan\n"
        ));
        assert!(text.contains("(1, 2) 0.0 0.0 0.0 0.0\n"));
    }

    #[test]
    fn sample_line_pads_index_and_flags_accuracy() {
        let r = SampleResult {
            index: 12,
            true_class: 3,
            pred_class: 7,
            loss: -0.5,
        };
        assert_eq!(sample_line(&r), "  12 true 3 pred 7 acc 0 loss -0.500");

        let wide = SampleResult {
            index: 12345,
            true_class: 0,
            pred_class: 0,
            loss: -0.001,
        };
        assert_eq!(sample_line(&wide), "12345 true 0 pred 0 acc 1 loss -0.001");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scores.csv");
        let results = [
            SampleResult {
                index: 0,
                true_class: 1,
                pred_class: 1,
                loss: -0.001,
            },
            SampleResult {
                index: 1,
                true_class: 2,
                pred_class: 0,
                loss: -0.25,
            },
        ];
        write_csv(&path, &results).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "index,true_class,pred_class,acc,loss\n0,1,1,1,-0.001\n1,2,0,0,-0.25\n"
        );
    }
}
