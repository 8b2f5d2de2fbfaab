//! Renderer module — trait-based format dispatch.

pub mod json;

use crate::error::{DocError, Result};
use crate::model::Project;

/// Trait for rendering a resolved Project into a specific output format.
pub trait Renderer {
    fn render(&self, project: &Project) -> Result<String>;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "json" => Ok(Box::new(json::JsonRenderer)),
        _ => Err(DocError::Config(format!("unknown format: {}. Use json", format))),
    }
}
