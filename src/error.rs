//! 错误类型 (Error taxonomy)
//!
//! 编码器与解码器对输入做严格校验, 失败时立即返回带类型的错误;
//! NMS 与关键点提取是全函数, 不会产生错误.
//! "未检测到目标" 不是错误: 它表现为全哨兵的 `KeypointSet`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseError {
    /// 空帧 / 空缓冲区 / 零像素图像
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 缓冲区长度或张量形状与声明的维度不一致
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// 外部推理引擎失败 (不重试, 整个周期被丢弃)
    #[error("external inference failure: {0:#}")]
    ExternalInferenceFailure(anyhow::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("resize failed: {0}")]
    Resize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PoseError {
    pub(crate) fn shape(expected: impl Into<String>, got: impl Into<String>) -> Self {
        PoseError::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

pub type Result<T, E = PoseError> = std::result::Result<T, E>;
