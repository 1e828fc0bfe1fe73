//! crop-recommender: HTTP front end for the crop classifier.
//!
//! Reads config from env vars (an optional `.env` file is honoured):
//!   MODEL_PATH       : forest `.apr` artefact (default: model.apr)
//!   LE_PATH          : label encoding (default: label_encoder.json)
//!   CROP_FEATURE_SPEC: optional feature layout with aliases and defaults
//!   CROP_HOST / CROP_PORT: listen address (default: 0.0.0.0:5000); PORT is
//!                      used when CROP_PORT is unset
//!   CROP_LOG_FORMAT  : json (default) or text; filter via RUST_LOG

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crop_recommender::common::log;
use crop_recommender::{create_router, AppCfg, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load()?;
    log::init(cfg.log_format);

    let ctx = AppContext::load(&cfg).context("failed to load model artefacts")?;
    let app = create_router(Arc::new(ctx));

    let addr = cfg.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "crop-recommender listening");

    axum::serve(listener, app).await?;
    Ok(())
}
