//! JSON renderer — the resolved project model for tooling and templates.

use crate::error::Result;
use crate::model::Project;
use crate::render::Renderer;

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, project: &Project) -> Result<String> {
        let mut out = serde_json::to_string_pretty(project)?;
        out.push('\n');
        Ok(out)
    }
}
