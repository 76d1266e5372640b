//! 姿态检测数据结构定义
//! Data structures for pose detection

use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// 推理输入尺寸 (方形)
pub const INF_SIZE: u32 = 640;

/// COCO 关键点数量
pub const NUM_KEYPOINTS: usize = 17;

/// 每个关键点的通道数 (x, y, conf)
pub const KPT_STEP: usize = 3;

/// 边界框通道数 (cx, cy, w, h) 或 (x1, y1, x2, y2)
pub const BOX_CHANNELS: usize = 4;

/// objectness 所在通道
pub const OBJECTNESS_CHANNEL: usize = BOX_CHANNELS;

/// 第一个关键点三元组所在通道
pub const KPT_OFFSET: usize = OBJECTNESS_CHANNEL + 1;

/// 每个候选框的通道总数: 4 + 1 + 17 * 3 = 56
pub const NUM_CHANNELS: usize = KPT_OFFSET + NUM_KEYPOINTS * KPT_STEP;

/// 骨架连线 (COCO 关键点索引对)
pub const SKELETON: [(usize, usize); 16] = [
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 11),
    (6, 12),
    (11, 12),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (11, 13),
    (12, 14),
    (13, 15),
    (14, 16),
];

// ========== 关键点 ==========

/// COCO 关键点索引 (index == 解剖学身份)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

/// 索引 → 名称 映射
pub const KEYPOINT_NAMES: [&str; NUM_KEYPOINTS] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

impl KeypointName {
    pub const ALL: [KeypointName; NUM_KEYPOINTS] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        KEYPOINT_NAMES[self.index()]
    }
}

impl std::fmt::Display for KeypointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<KeypointName> for usize {
    fn from(name: KeypointName) -> usize {
        name.index()
    }
}

impl TryFrom<usize> for KeypointName {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        KeypointName::ALL.get(value).copied().ok_or_else(|| {
            format!(
                "Invalid keypoint index: {}. Must be in range 0-{}.",
                value,
                NUM_KEYPOINTS - 1
            )
        })
    }
}

/// 单个关键点: 归一化位置 [0,1] + 置信度 [0,1]
///
/// 构造后不可变; 每个推理周期重新生成.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    x: f32,
    y: f32,
    confidence: f32,
}

impl Keypoint {
    /// 哨兵值: 位置 (0,0), 置信度 0
    pub const SENTINEL: Keypoint = Keypoint {
        x: 0.0,
        y: 0.0,
        confidence: 0.0,
    };

    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// 投影到目标纹理像素坐标, 越界返回 None
    pub fn to_pixel(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let px = self.x * width as f32;
        let py = self.y * height as f32;
        if px >= 0.0 && px < width as f32 && py >= 0.0 && py < height as f32 {
            Some((px as u32, py as u32))
        } else {
            None
        }
    }
}

/// 固定 17 个关键点的有序集合, 下标即解剖学身份
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeypointSet {
    points: [Keypoint; NUM_KEYPOINTS],
}

impl Default for KeypointSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl KeypointSet {
    /// 全哨兵集合 ("本帧无可用检测")
    pub fn empty() -> Self {
        Self {
            points: [Keypoint::SENTINEL; NUM_KEYPOINTS],
        }
    }

    pub fn new(points: [Keypoint; NUM_KEYPOINTS]) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        NUM_KEYPOINTS
    }

    /// 所有关键点都是哨兵
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Keypoint::is_sentinel)
    }

    pub fn get(&self, name: KeypointName) -> &Keypoint {
        &self.points[name.index()]
    }

    pub fn points(&self) -> &[Keypoint; NUM_KEYPOINTS] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeypointName, &Keypoint)> {
        KeypointName::ALL.into_iter().zip(self.points.iter())
    }

    /// 置信度 >= min_conf 的非哨兵关键点
    pub fn visible(&self, min_conf: f32) -> impl Iterator<Item = (KeypointName, &Keypoint)> {
        self.iter()
            .filter(move |(_, p)| !p.is_sentinel() && p.confidence() >= min_conf)
    }

    /// 两端都有效的骨骼连线
    pub fn bones(&self) -> impl Iterator<Item = (&Keypoint, &Keypoint)> {
        SKELETON.iter().filter_map(move |&(a, b)| {
            let (pa, pb) = (&self.points[a], &self.points[b]);
            if pa.is_sentinel() || pb.is_sentinel() {
                None
            } else {
                Some((pa, pb))
            }
        })
    }
}

impl std::ops::Index<KeypointName> for KeypointSet {
    type Output = Keypoint;

    fn index(&self, name: KeypointName) -> &Keypoint {
        self.get(name)
    }
}

// ========== 检测框 ==========

/// 角点形式的边界框 (x1, y1, x2, y2), 模型输入像素空间
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bbox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Bbox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.,
            y1: cy - h / 2.,
            x2: cx + w / 2.,
            y2: cy + h / 2.,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.x1.max(another.x1);
        let r = self.x2.min(another.x2);
        let t = self.y1.max(another.y1);
        let b = self.y2.min(another.y2);
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    /// Intersection over Union, 并集为 0 时定义为 0
    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union > 0. {
            self.intersection_area(another) / union
        } else {
            0.
        }
    }
}

/// 解码后的候选检测 (单周期内有效)
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// 在原始输出中的候选下标 (NMS 平局时下标小者优先)
    pub index: usize,
    pub bbox: Bbox,
    pub objectness: f32,
    /// 原样保留的 (x, y, conf) 三元组, 模型输入像素空间
    pub keypoints: [[f32; KPT_STEP]; NUM_KEYPOINTS],
}

impl Detection {
    pub fn confidence(&self) -> f32 {
        self.objectness
    }

    pub fn iou(&self, another: &Detection) -> f32 {
        self.bbox.iou(&another.bbox)
    }
}
