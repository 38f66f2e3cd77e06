use anyhow::Context;
use aoacore::EstimatorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Parallel estimation tasks; 0 uses the available parallelism.
    pub workers: usize,
    /// Abort the batch when any recording fails.
    pub strict: bool,
    pub result_file: String,
    pub estimator: EstimatorConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            strict: false,
            result_file: "result.txt".into(),
            estimator: EstimatorConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(workers: Option<usize>) -> Self {
        Self {
            workers: workers.unwrap_or(0),
            ..Default::default()
        }
    }

    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_reference_constants() {
        let cfg = WorkflowConfig::from_args(Some(3));
        assert_eq!(cfg.effective_workers(), 3);
        assert_eq!(cfg.estimator, EstimatorConfig::default());
        assert_eq!(cfg.result_file, "result.txt");
    }

    #[test]
    fn config_load_reads_nested_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"workers: 2\nstrict: true\nestimator:\n  mic_distance: 0.15\n  noise_gate:\n    hop_length: 256\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.workers, 2);
        assert!(cfg.strict);
        assert_eq!(cfg.estimator.mic_distance, 0.15);
        assert_eq!(cfg.estimator.noise_gate.hop_length, 256);
        assert_eq!(cfg.estimator.noise_gate.noise_len, 4000);
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}
