//! 后处理: 解码 → NMS → 关键点提取
//!
//! 三个阶段都是纯函数, 只持有阈值等配置标量.

pub mod decoder;
pub mod keypoints;
pub mod nms;

pub use decoder::{decode, DetectionDecoder};
pub use keypoints::KeypointExtractor;
pub use nms::{non_max_suppression, select};
