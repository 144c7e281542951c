//! CLI output: error mapping to the stable CLI surface.

/// Render an error with its causes on one line.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("Error: {:#}", e)
}
