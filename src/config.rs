//! 模型配置参数 - 命令行参数 + JSON 配置文件

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::detection::{INF_SIZE, NUM_KEYPOINTS};
use crate::error::{PoseError, Result};

/// 缩放策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// 直接拉伸到 S×S (不保持长宽比)
    #[default]
    Stretch,
    /// 保持长宽比, 内容放在左上角, 其余填充 144/255
    Letterbox,
}

/// 插值算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    #[default]
    Nearest,
    Bilinear,
}

/// 关键点置信度归一化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// 仅裁剪到 [0,1], 跨帧可比
    #[default]
    Clamp,
    /// 17 个关键点内 min-max 重标定后再阈值过滤
    #[value(name = "minmax")]
    MinMax,
}

/// 模型原始输出的轴顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// [1, 56, N] (YOLOv8 / YOLO11 pose 导出格式)
    #[default]
    ChannelsFirst,
    /// [1, N, 56]
    CandidatesFirst,
}

/// 边界框通道的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFormat {
    #[default]
    Cxcywh,
    Xyxy,
}

/// 流水线配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    // === 模型参数 ===
    pub model_input_size: u32,   // 模型方形输入尺寸 S
    pub num_keypoints: usize,    // 固定 17 (COCO)
    pub num_candidates: Option<usize>, // 候选框数 N (None = 按输出形状推断)
    pub output_layout: OutputLayout,
    pub box_format: BoxFormat,

    // === 阈值 ===
    pub confidence_threshold: f32, // objectness / 关键点置信度阈值
    pub iou_threshold: f32,        // NMS IOU阈值
    pub max_detections: Option<usize>, // NMS 后保留的最大检测数

    // === 预处理 ===
    pub resize_mode: ResizeMode,
    pub resize_filter: ResizeFilter,

    // === 后处理 ===
    pub confidence_policy: ConfidencePolicy,

    pub profile: bool,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_input_size: INF_SIZE,
            num_keypoints: NUM_KEYPOINTS,
            num_candidates: None,
            output_layout: OutputLayout::ChannelsFirst,
            box_format: BoxFormat::Cxcywh,

            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            max_detections: Some(1),

            resize_mode: ResizeMode::Stretch,
            resize_filter: ResizeFilter::Nearest,

            confidence_policy: ConfidencePolicy::Clamp,

            profile: false,
        }
    }
}

impl PoseConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.model_input_size == 0 {
            return Err(PoseError::InvalidConfig(
                "model_input_size must be positive".to_string(),
            ));
        }
        for (name, v) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PoseError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if self.num_keypoints != NUM_KEYPOINTS {
            return Err(PoseError::InvalidConfig(format!(
                "num_keypoints is fixed by the COCO schema ({NUM_KEYPOINTS}), got {}",
                self.num_keypoints
            )));
        }
        if self.max_detections == Some(0) {
            return Err(PoseError::InvalidConfig(
                "max_detections must be at least 1".to_string(),
            ));
        }
        if self.num_candidates == Some(0) {
            return Err(PoseError::InvalidConfig(
                "num_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置, 文件不存在时写出默认配置
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            log::info!("✅ 配置已从 {} 加载", path.display());
            Ok(config)
        } else {
            log::info!("📝 配置文件不存在,创建默认配置...");
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        log::info!(
            "\nSummary:\n\
            > Input: {}x{} ({:?}, {:?})\n\
            > Output: {:?}, box: {:?}, nk: {}, N: {}\n\
            > conf: {}, iou: {}, max_det: {}, kpt-norm: {:?}\n",
            self.model_input_size,
            self.model_input_size,
            self.resize_mode,
            self.resize_filter,
            self.output_layout,
            self.box_format,
            self.num_keypoints,
            self.num_candidates
                .map(|n| n.to_string())
                .unwrap_or_else(|| "dynamic".to_string()),
            self.confidence_threshold,
            self.iou_threshold,
            self.max_detections
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            self.confidence_policy,
        );
    }
}

/// 命令行参数
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "YOLO 姿态估计 - 关键点提取", long_about = None)]
pub struct Args {
    /// ONNX model path
    #[arg(long, required = true)]
    pub model: String,

    /// input image files or directories
    #[arg(long, num_args = 1.., required = true)]
    pub source: Vec<PathBuf>,

    /// JSON config file (created with defaults if missing)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// model input size
    #[arg(long)]
    pub size: Option<u32>,

    /// confidence threshold
    #[arg(long)]
    pub conf: Option<f32>,

    /// iou threshold in NMS
    #[arg(long)]
    pub iou: Option<f32>,

    /// max detections kept after NMS
    #[arg(long)]
    pub max_det: Option<usize>,

    /// number of candidates in model output
    #[arg(long)]
    pub candidates: Option<usize>,

    /// keep aspect ratio when resizing
    #[arg(long)]
    pub letterbox: bool,

    /// keypoint confidence normalization
    #[arg(long, value_enum)]
    pub kpt_norm: Option<ConfidencePolicy>,

    /// write keypoints as JSON lines to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// profile each stage
    #[arg(long)]
    pub profile: bool,
}

impl Args {
    /// 命令行参数覆盖配置文件
    pub fn apply(&self, mut config: PoseConfig) -> Result<PoseConfig> {
        if let Some(size) = self.size {
            config.model_input_size = size;
        }
        if let Some(conf) = self.conf {
            config.confidence_threshold = conf;
        }
        if let Some(iou) = self.iou {
            config.iou_threshold = iou;
        }
        if let Some(max_det) = self.max_det {
            config.max_detections = Some(max_det);
        }
        if let Some(n) = self.candidates {
            config.num_candidates = Some(n);
        }
        if self.letterbox {
            config.resize_mode = ResizeMode::Letterbox;
        }
        if let Some(policy) = self.kpt_norm {
            config.confidence_policy = policy;
        }
        config.profile |= self.profile;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置文件 (若指定) 并应用命令行覆盖
    pub fn to_config(&self) -> Result<PoseConfig> {
        let base = match &self.config {
            Some(path) => PoseConfig::load_or_default(path)?,
            None => PoseConfig::default(),
        };
        self.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PoseConfig::default();
        assert_eq!(config.model_input_size, 640);
        assert_eq!(config.num_keypoints, 17);
        assert_eq!(config.max_detections, Some(1));
        assert_eq!(config.confidence_policy, ConfidencePolicy::Clamp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            PoseConfig {
                model_input_size: 0,
                ..Default::default()
            },
            PoseConfig {
                confidence_threshold: 1.5,
                ..Default::default()
            },
            PoseConfig {
                iou_threshold: f32::NAN,
                ..Default::default()
            },
            PoseConfig {
                num_keypoints: 16,
                ..Default::default()
            },
            PoseConfig {
                max_detections: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(PoseError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PoseConfig =
            serde_json::from_str(r#"{ "iou_threshold": 0.5, "resize_mode": "letterbox" }"#)
                .unwrap();
        assert_eq!(config.iou_threshold, 0.5);
        assert_eq!(config.resize_mode, ResizeMode::Letterbox);
        assert_eq!(config.confidence_threshold, 0.5);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "yolo-pose-config-{}.json",
            std::process::id()
        ));
        let config = PoseConfig {
            confidence_threshold: 0.3,
            confidence_policy: ConfidencePolicy::MinMax,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = PoseConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "yolo-pose",
            "--model",
            "m.onnx",
            "--source",
            "a.jpg",
            "b.jpg",
            "--conf",
            "0.25",
            "--letterbox",
            "--kpt-norm",
            "minmax",
        ]);
        assert_eq!(args.source.len(), 2);
        let config = args.apply(PoseConfig::default()).unwrap();
        assert_eq!(config.confidence_threshold, 0.25);
        assert_eq!(config.resize_mode, ResizeMode::Letterbox);
        assert_eq!(config.confidence_policy, ConfidencePolicy::MinMax);
        assert_eq!(config.iou_threshold, 0.45);
    }

    #[test]
    fn test_args_invalid_override() {
        let args = Args::parse_from([
            "yolo-pose", "--model", "m.onnx", "--source", "a.jpg", "--iou", "2.0",
        ]);
        assert!(args.apply(PoseConfig::default()).is_err());
    }
}
