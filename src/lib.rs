// lib.rs - central orchestrator
pub mod api;
pub mod common;
pub mod features;
pub mod inference;
pub mod model;

pub use api::http::create_router;
pub use common::config::AppCfg;
pub use inference::AppContext;
