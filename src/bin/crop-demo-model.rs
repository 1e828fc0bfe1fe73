//! Fit a forest from a training file and store it as an `.apr` artefact.
//!
//! `crop-demo-model` with no arguments turns `demos/training.json` into the
//! configured `MODEL_PATH`.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use crop_recommender::common::log;
use crop_recommender::model::repo_fs::load_training_set;
use crop_recommender::model::{Classifier, FsModelRepo, ModelRepo};
use crop_recommender::AppCfg;

#[derive(Parser)]
#[command(name = "crop-demo-model")]
#[command(about = "Fit the demo crop forest and write it as an .apr file")]
struct Cli {
    /// Labelled rows with optional scale, tree count and seed
    #[arg(long, default_value = "demos/training.json")]
    training: PathBuf,
    /// Output path; defaults to MODEL_PATH
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppCfg::load()?;
    log::init(cfg.log_format);

    let out = cli.out.unwrap_or_else(|| cfg.model_path.clone());
    let forest = load_training_set(&cli.training)?
        .fit()
        .map_err(|reason| anyhow!("cannot fit {}: {reason}", cli.training.display()))?;
    FsModelRepo::at(&out, &cfg.label_encoder_path)
        .put_model(&forest)
        .with_context(|| format!("failed to write {}", out.display()))?;

    info!(
        model = %out.display(),
        features = forest.n_features(),
        classes = forest.max_class_id().map_or(0, |max| max + 1),
        "demo model written"
    );
    Ok(())
}
