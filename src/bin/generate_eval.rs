//! Write a deterministic synthetic evaluation dump plus its JSON sidecar,
//! laid out the way the trainer appends them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde_json::json;

use eval_inspect::config::{meta_path_for, DEFAULT_DATA_PATH};
use eval_inspect::data::model::FloatOrder;

#[derive(Parser, Debug)]
#[command(name = "generate_eval")]
#[command(about = "Write a synthetic eval.bin and eval.bin.meta.json")]
struct Cli {
    /// Output dump path; the sidecar goes next to it
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    out: PathBuf,

    #[arg(long, default_value_t = 50)]
    samples: usize,

    #[arg(long, default_value_t = 4)]
    ticks: usize,

    #[arg(long, default_value_t = 10)]
    classes: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Probability that a sample's predictions favour the true class
    #[arg(long, default_value_t = 0.7)]
    skill: f64,
}

/// One sample: one-hot truth row, `ticks` mean rows, `ticks` std rows.
fn generate_sample<R: Rng>(cli: &Cli, rng: &mut R) -> Vec<f32> {
    let truth = rng.random_range(0..cli.classes);
    let favoured = if rng.random::<f64>() < cli.skill {
        truth
    } else {
        rng.random_range(0..cli.classes)
    };

    let mut row = vec![0f32; cli.classes];
    row[truth] = 1.0;

    let mut means = Vec::with_capacity(cli.ticks * cli.classes);
    let mut stds = Vec::with_capacity(cli.ticks * cli.classes);
    for tick in 0..cli.ticks {
        // the favoured class firms up as ticks progress
        let boost = (tick + 1) as f64 / cli.ticks as f64;
        for c in 0..cli.classes {
            let noise = rng.random_range(0.0..0.5);
            let bump = if c == favoured { boost } else { 0.0 };
            means.push((noise + bump) as f32);
            stds.push(rng.random_range(0.0f32..0.2));
        }
    }

    row.extend(means);
    row.extend(stds);
    row
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    anyhow::ensure!(cli.classes > 0, "--classes must be at least 1");

    if let Some(dir) = cli.out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(cli.seed);
    let mut writer = BufWriter::new(
        File::create(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?,
    );
    for _ in 0..cli.samples {
        let floats = generate_sample(&cli, &mut rng);
        let mut bytes = vec![0u8; floats.len() * 4];
        FloatOrder::Native.write_from(&floats, &mut bytes);
        writer.write_all(&bytes).context("writing dump")?;
    }
    writer.flush().context("flushing dump")?;

    let meta_path = meta_path_for(&cli.out);
    let meta = json!({
        "ticks_per_predict": cli.ticks,
        "y_size": cli.classes,
    });
    std::fs::write(&meta_path, format!("{meta}\n"))
        .with_context(|| format!("writing {}", meta_path.display()))?;

    log::info!("seed {}", cli.seed);
    println!(
        "Wrote {} samples ({} ticks x {} classes) to {}",
        cli.samples,
        cli.ticks,
        cli.classes,
        cli.out.display()
    );
    Ok(())
}
