/// 姿态数据模型 (Pose Data Model)
///
/// - Keypoint / KeypointSet: 最终输出, 固定 17 个 COCO 关键点
/// - Detection / Bbox:       解码器产生的单周期候选
pub mod types;

pub use types::{
    Bbox, Detection, Keypoint, KeypointName, KeypointSet, BOX_CHANNELS, INF_SIZE,
    KEYPOINT_NAMES, KPT_OFFSET, KPT_STEP, NUM_CHANNELS, NUM_KEYPOINTS, OBJECTNESS_CHANNEL,
    SKELETON,
};
