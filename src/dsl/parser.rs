//! Canvas parser: converts raw JSON/YAML text into [`CanvasSchema`].

use super::schema::CanvasSchema;
use crate::error::CompileError;

/// Supported canvas document formats.
#[derive(Debug, Clone, Copy)]
pub enum CanvasFormat {
    /// JSON format (`.json`) — what the visual builder exports.
    Json,
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
}

/// Parse canvas content into a [`CanvasSchema`].
///
/// Parse failures are reported as `invalid_node_config` so callers see one
/// diagnostic shape from text all the way through compilation.
pub fn parse_canvas(content: &str, format: CanvasFormat) -> Result<CanvasSchema, CompileError> {
    match format {
        CanvasFormat::Json => serde_json::from_str(content)
            .map_err(|e| CompileError::invalid_config(None, format!("canvas parse error: {e}"))),
        CanvasFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| CompileError::invalid_config(None, format!("canvas parse error: {e}"))),
    }
}
