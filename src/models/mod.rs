//! 推理执行器接口 (Inference Executor)
//!
//! # 架构说明
//!
//! 网络本身是不透明的外部函数: `[1, 3, S, S]` 张量进, `56 × N` 张量出.
//! 流水线只依赖 `InferenceExecutor` trait, 不关心模型在哪里、如何执行.
//!
//! - **OrtExecutor**: ONNX Runtime 后端 (需启用 `onnx` feature)
//!   - 文件: `onnx.rs`
//! - **闭包**: 任何 `FnMut(ArrayViewD<f32>) -> anyhow::Result<ArrayD<f32>>`
//!   都可以直接作为执行器, 测试与离线回放都用这种方式
//!
//! ## 使用示例
//! ```rust
//! use ndarray::{ArrayD, ArrayViewD, IxDyn};
//! use yolo_pose_rs::models::InferenceExecutor;
//!
//! let mut executor = |_input: ArrayViewD<'_, f32>| -> anyhow::Result<ArrayD<f32>> {
//!     Ok(ArrayD::zeros(IxDyn(&[1, 56, 8400])))
//! };
//! let input = ArrayD::<f32>::zeros(IxDyn(&[1, 3, 640, 640]));
//! let output = executor.run(input.view()).unwrap();
//! assert_eq!(output.shape(), &[1, 56, 8400]);
//! ```
use anyhow::Result;
use ndarray::{ArrayD, ArrayViewD};

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OrtExecutor;

/// 模型推理统一接口
pub trait InferenceExecutor {
    /// 执行一次前向推理
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>>;

    /// 执行器名称 (日志用)
    fn name(&self) -> &str {
        "executor"
    }
}

impl<F> InferenceExecutor for F
where
    F: FnMut(ArrayViewD<'_, f32>) -> Result<ArrayD<f32>>,
{
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        self(input)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
