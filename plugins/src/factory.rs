use std::sync::Arc;

use stackline_core::config::AppConfig;
use stackline_core::executor::traits::{OutputRenderer, StackRunner};
use stackline_core::executor::types::ProgressMode;

use crate::executor::{JsonlRenderer, TextRenderer};
use crate::runner::PulumiCliRunner;

pub fn build_runner(cfg: &AppConfig) -> Arc<dyn StackRunner> {
    Arc::new(PulumiCliRunner::from_config(&cfg.runner))
}

pub fn build_renderer(mode: ProgressMode) -> Arc<dyn OutputRenderer> {
    match mode {
        ProgressMode::Structured => Arc::new(JsonlRenderer::new(false)),
        ProgressMode::Plain => Arc::new(TextRenderer::new()),
    }
}
