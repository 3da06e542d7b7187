//! `stagegate check` - Validate a pipeline file
//!
//! Loads the YAML definition with the same validation as `run`, without
//! touching the workspace or any external service.
//!
//! ## Usage
//!
//! ```bash
//! stagegate check demos/vprofile.yaml
//! # Exit code 0: pipeline is valid
//! # Exit code 1: parse or validation error
//! ```

use anyhow::{Context, Result};
use stagegate::pipeline::{Pipeline, StepType};
use std::fmt::Write as _;
use std::path::Path;

/// Loads and validates the pipeline at `file`
pub fn check_pipeline(file: &Path) -> Result<Pipeline> {
    tracing::debug!(file = %file.display(), "Validating pipeline");

    if !file.exists() {
        anyhow::bail!("Pipeline file not found: {}", file.display());
    }

    let pipeline = Pipeline::from_file(file)
        .with_context(|| format!("Failed to load pipeline: {}", file.display()))?;

    tracing::info!(file = %file.display(), "Pipeline validation successful");
    Ok(pipeline)
}

/// One-line-per-stage overview of a valid pipeline
pub fn describe(pipeline: &Pipeline) -> String {
    let mut out = format!(
        "Pipeline '{}' is valid: {} stages\n",
        pipeline.name().map_or("unnamed", String::as_str),
        pipeline.stage_count()
    );
    for (index, stage) in pipeline.stages.iter().enumerate() {
        let gates = stage
            .steps
            .iter()
            .filter(|s| matches!(s.step_type, StepType::QualityGate { .. }))
            .count();
        let _ = write!(
            out,
            "  {}. {} ({} steps",
            index + 1,
            stage.name,
            stage.steps.len()
        );
        if gates > 0 {
            out.push_str(", quality gate");
        }
        if stage.best_effort {
            out.push_str(", best effort");
        }
        out.push_str(")\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_pipeline_valid_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/vprofile.yaml");
        let pipeline = check_pipeline(&path).unwrap();

        let summary = describe(&pipeline);
        assert!(summary.starts_with("Pipeline 'vprofile' is valid: 7 stages"));
        assert!(summary.contains("6. CODE ANALYSIS with SONARQUBE (2 steps, quality gate)"));
    }

    #[test]
    fn test_check_pipeline_invalid_step() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("broken.yaml");
        fs::write(
            &file_path,
            "stages:\n  - name: Build\n    steps:\n      - type: shell\n        command: \"\"\n",
        )
        .unwrap();

        let err = check_pipeline(&file_path).unwrap_err();
        assert!(format!("{err:#}").contains("Validation failed"));
    }

    #[test]
    fn test_check_pipeline_nonexistent_file() {
        let result = check_pipeline(Path::new("/nonexistent/pipeline.yaml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
