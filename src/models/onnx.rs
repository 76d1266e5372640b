// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

use anyhow::{anyhow, Result};
use ndarray::{ArrayD, ArrayViewD};
use ort::{inputs, session::Session, value::TensorRef};

use super::InferenceExecutor;

/// ONNX Runtime 执行器 (CPU)
pub struct OrtExecutor {
    session: Session,
    name: String,
}

impl OrtExecutor {
    /// 从 .onnx 文件加载模型
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let session = Session::builder()
            .map_err(|e| anyhow!("failed to create session builder: {e}"))?
            .commit_from_file(path)
            .map_err(|e| anyhow!("failed to load model from {}: {e}", path.display()))?;

        log::info!("🧠 模型已加载: {}", path.display());

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx")
            .to_string();
        Ok(Self { session, name })
    }
}

impl InferenceExecutor for OrtExecutor {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let tensor = TensorRef::from_array_view(input)
            .map_err(|e| anyhow!("failed to create tensor ref: {e}"))?;
        let outputs = self
            .session
            .run(inputs![tensor])
            .map_err(|e| anyhow!("inference failed: {e}"))?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("failed to extract output: {e}"))?;
        Ok(output.to_owned())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
