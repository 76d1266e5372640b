/// 姿态推理流水线 (Pose Inference Pipeline)
///
/// 单周期同步流程, 每帧完整走完后才接受下一帧:
/// - Encoder:   图像 → [1, 3, S, S] 张量
/// - Executor:  外部推理 (唯一可能阻塞的点)
/// - Decoder:   56 × N → 候选检测
/// - NMS:       去除重叠检测
/// - Extractor: 最佳检测 → 17 个归一化关键点
///
/// 跨线程使用见 `worker.rs`, 结果展示见 `visualizer.rs`.
pub mod visualizer;
pub mod worker;

pub use visualizer::{JsonLinesVisualizer, LogVisualizer, Visualizer};
pub use worker::PoseWorker;

use std::time::{Duration, Instant};

use image::DynamicImage;
use ndarray::{Array, ArrayD, IxDyn};

use crate::config::PoseConfig;
use crate::detection::{Detection, KeypointSet};
use crate::error::{PoseError, Result};
use crate::input::FrameSource;
use crate::models::InferenceExecutor;
use crate::postprocess::{non_max_suppression, DetectionDecoder, KeypointExtractor};
use crate::preprocess::{ImageEncoder, InputGeometry};

/// 各阶段耗时
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleTimings {
    pub preprocess: Duration,
    pub inference: Duration,
    pub postprocess: Duration,
}

impl CycleTimings {
    pub fn total(&self) -> Duration {
        self.preprocess + self.inference + self.postprocess
    }
}

/// 单周期结果
#[derive(Debug, Clone)]
pub struct PoseFrame {
    pub frame_id: u64,
    /// 最佳检测的关键点; 无检测时为全哨兵
    pub keypoints: KeypointSet,
    /// NMS 后的检测 (置信度降序, 已按 max_detections 截断)
    pub detections: Vec<Detection>,
    pub geometry: InputGeometry,
    pub timings: CycleTimings,
}

impl PoseFrame {
    pub fn has_detection(&self) -> bool {
        !self.detections.is_empty() && !self.keypoints.is_empty()
    }
}

/// `tick` 的结果
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// 帧源无可用帧, 本周期跳过
    Skipped,
    Completed(PoseFrame),
}

impl CycleOutcome {
    pub fn frame(&self) -> Option<&PoseFrame> {
        match self {
            CycleOutcome::Skipped => None,
            CycleOutcome::Completed(frame) => Some(frame),
        }
    }
}

pub struct PosePipeline<E> {
    config: PoseConfig,
    encoder: ImageEncoder,
    decoder: DetectionDecoder,
    extractor: KeypointExtractor,
    executor: E,
    // 输入张量缓冲, 每周期覆盖
    scratch: ArrayD<f32>,
    count: u64,
}

impl<E: InferenceExecutor> PosePipeline<E> {
    pub fn new(config: PoseConfig, executor: E) -> Result<Self> {
        config.validate()?;
        let encoder = ImageEncoder::from_config(&config);
        let scratch = Array::zeros(IxDyn(&encoder.shape()));
        Ok(Self {
            decoder: DetectionDecoder::from_config(&config),
            extractor: KeypointExtractor::from_config(&config),
            encoder,
            executor,
            scratch,
            config,
            count: 0,
        })
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// 已完成的周期数
    pub fn frames_processed(&self) -> u64 {
        self.count
    }

    /// 运行一个完整周期; 任一阶段失败则整个周期作废
    pub fn process(&mut self, image: &DynamicImage) -> Result<PoseFrame> {
        // 1. 预处理
        let t_pre = Instant::now();
        let geometry = self.encoder.encode_into(image, &mut self.scratch)?;
        let preprocess = t_pre.elapsed();

        // 2. 推理
        let t_run = Instant::now();
        let output = self
            .executor
            .run(self.scratch.view())
            .map_err(PoseError::ExternalInferenceFailure)?;
        let inference = t_run.elapsed();

        // 3. 后处理
        let t_post = Instant::now();
        let mut detections = self
            .decoder
            .decode(output.view(), self.config.confidence_threshold)?;
        let num_candidates = detections.len();
        non_max_suppression(&mut detections, self.config.iou_threshold);
        if let Some(max_det) = self.config.max_detections {
            detections.truncate(max_det);
        }
        let keypoints = self.extractor.extract_best(
            &detections,
            geometry.content_width as f32,
            geometry.content_height as f32,
        );
        let postprocess = t_post.elapsed();

        let timings = CycleTimings {
            preprocess,
            inference,
            postprocess,
        };
        self.log_cycle(&timings, num_candidates, detections.len());

        let frame_id = self.count;
        self.count += 1;
        Ok(PoseFrame {
            frame_id,
            keypoints,
            detections,
            geometry,
            timings,
        })
    }

    /// 从帧源取一帧并处理; 无帧时跳过
    pub fn tick(&mut self, source: &mut dyn FrameSource) -> Result<CycleOutcome> {
        match source.acquire_frame() {
            Some(image) => self.process(&image).map(CycleOutcome::Completed),
            None => Ok(CycleOutcome::Skipped),
        }
    }

    fn log_cycle(&self, t: &CycleTimings, candidates: usize, kept: usize) {
        let level = if self.config.profile {
            log::Level::Info
        } else {
            log::Level::Debug
        };
        log::log!(
            level,
            "[{}] #{} preprocess: {:?}, inference: {:?}, postprocess: {:?} | {} candidates → {} kept",
            self.executor.name(),
            self.count,
            t.preprocess,
            t.inference,
            t.postprocess,
            candidates,
            kept
        );
    }
}
