// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 配置参数 (JSON + 命令行)
pub mod detection; // 姿态数据模型
pub mod error; // 错误类型
pub mod input; // 帧输入
pub mod models; // 推理执行器接口
pub mod pipeline; // 单周期流水线
pub mod postprocess; // 解码 / NMS / 关键点提取
pub mod preprocess; // 图像编码

pub use crate::config::{Args, ConfidencePolicy, PoseConfig, ResizeMode};
pub use crate::detection::{
    Bbox, Detection, Keypoint, KeypointName, KeypointSet, KEYPOINT_NAMES, NUM_KEYPOINTS,
};
pub use crate::error::{PoseError, Result};
pub use crate::input::{ChannelSource, FrameSource, ImageFileSource, RawFrame};
pub use crate::models::InferenceExecutor;
#[cfg(feature = "onnx")]
pub use crate::models::OrtExecutor;
pub use crate::pipeline::{
    CycleOutcome, JsonLinesVisualizer, LogVisualizer, PoseFrame, PosePipeline, PoseWorker,
    Visualizer,
};
pub use crate::postprocess::{non_max_suppression, DetectionDecoder, KeypointExtractor};
pub use crate::preprocess::{encode, ImageEncoder, InputGeometry};
