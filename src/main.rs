use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use eval_inspect::config::{meta_path_for, InspectConfig, DEFAULT_DATA_PATH};
use eval_inspect::data::loader::load_eval;
use eval_inspect::data::model::FloatOrder;
use eval_inspect::report::{write_csv, write_report};
use eval_inspect::score::{score_all, LossMode, ScoreSummary};

#[derive(Parser, Debug)]
#[command(name = "eval-inspect", version)]
#[command(about = "Print statistics and per-sample accuracy/loss for an evaluation dump")]
struct Cli {
    /// Binary dump of 32-bit floats
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// JSON sidecar (defaults to <DATA>.meta.json)
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Byte order the dump was written in
    #[arg(long, value_enum, default_value_t = FloatOrder::Native)]
    byte_order: FloatOrder,

    /// Loss formula
    #[arg(long, value_enum, default_value_t = LossMode::Compat)]
    loss: LossMode,

    /// Also write per-sample results to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print N+1 percentile values under each statistics block
    #[arg(long, default_value_t = 0)]
    percentiles: usize,
}

impl Cli {
    fn into_config(self) -> InspectConfig {
        let meta_path = self.meta.unwrap_or_else(|| meta_path_for(&self.data));
        InspectConfig {
            data_path: self.data,
            meta_path,
            byte_order: self.byte_order,
            loss_mode: self.loss,
            csv_path: self.csv,
            percentiles: self.percentiles,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Cli::parse().into_config();
    log::debug!("{config:?}");

    let dump = load_eval(&config).map_err(|err| {
        if err.is_not_found() {
            log::error!("dump not found; `generate_eval` writes a synthetic one");
        }
        err
    })?;
    let results = score_all(&dump.tensor, config.loss_mode);

    let mut out = BufWriter::new(io::stdout().lock());
    write_report(&mut out, &dump, &results, config.percentiles).context("writing report")?;
    out.flush().context("flushing stdout")?;

    let summary = ScoreSummary::from_results(&results);
    log::info!(
        "{} samples, {} correct (accuracy {:.4}), mean loss {:.4}",
        summary.samples,
        summary.correct,
        summary.accuracy,
        summary.mean_loss
    );

    if let Some(path) = &config.csv_path {
        write_csv(path, &results)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_reproduces_default_paths() {
        let config = Cli::parse_from(["eval-inspect"]).into_config();
        assert_eq!(config, InspectConfig::default());
    }

    #[test]
    fn sidecar_follows_data_path() {
        let config = Cli::parse_from([
            "eval-inspect",
            "--data",
            "runs/a/eval.bin",
            "--byte-order",
            "little",
            "--loss",
            "normalized",
        ])
        .into_config();
        assert_eq!(config.meta_path, PathBuf::from("runs/a/eval.bin.meta.json"));
        assert_eq!(config.byte_order, FloatOrder::Little);
        assert_eq!(config.loss_mode, LossMode::Normalized);
    }

    #[test]
    fn explicit_sidecar_wins() {
        let config =
            Cli::parse_from(["eval-inspect", "--meta", "m.json", "--csv", "out.csv"]).into_config();
        assert_eq!(config.meta_path, PathBuf::from("m.json"));
        assert_eq!(config.csv_path, Some(PathBuf::from("out.csv")));
    }
}
