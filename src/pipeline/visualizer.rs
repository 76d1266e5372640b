//! 结果展示 (Visualizer) - 关键点集合的消费者
//!
//! 核心流水线不关心结果如何展示; 这里只提供日志和 JSON lines 两种输出.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::detection::{KeypointSet, NUM_KEYPOINTS};

/// 展示接口: 接收关键点集合与索引 → 名称映射
pub trait Visualizer {
    fn present(&mut self, keypoints: &KeypointSet, names: &[&str; NUM_KEYPOINTS]) -> Result<()>;
}

/// 日志输出, 只显示置信度 >= min_confidence 的关键点
#[derive(Debug, Clone)]
pub struct LogVisualizer {
    min_confidence: f32,
    last_visible: usize,
}

impl Default for LogVisualizer {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl LogVisualizer {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence,
            last_visible: 0,
        }
    }

    /// 上一帧显示的关键点数
    pub fn last_visible(&self) -> usize {
        self.last_visible
    }
}

impl Visualizer for LogVisualizer {
    fn present(&mut self, keypoints: &KeypointSet, names: &[&str; NUM_KEYPOINTS]) -> Result<()> {
        if keypoints.is_empty() {
            self.last_visible = 0;
            log::info!("🙈 未检测到人体");
            return Ok(());
        }

        let mut visible = 0;
        for (name, point) in keypoints.visible(self.min_confidence) {
            visible += 1;
            log::debug!(
                "  {:<15} ({:.3}, {:.3}) conf: {:.2}",
                names[name.index()],
                point.x(),
                point.y(),
                point.confidence()
            );
        }
        self.last_visible = visible;
        log::info!(
            "🧍 关键点: {}/{} 可见, 骨骼: {}",
            visible,
            NUM_KEYPOINTS,
            keypoints.bones().count()
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct KeypointRecord<'a> {
    name: &'a str,
    x: f32,
    y: f32,
    confidence: f32,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    timestamp: String,
    /// 本输出流中的序号 (与 PoseFrame::frame_id 无关)
    seq: u64,
    detected: bool,
    keypoints: Vec<KeypointRecord<'a>>,
}

/// 每帧一行 JSON
pub struct JsonLinesVisualizer<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> JsonLinesVisualizer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Visualizer for JsonLinesVisualizer<W> {
    fn present(&mut self, keypoints: &KeypointSet, names: &[&str; NUM_KEYPOINTS]) -> Result<()> {
        let record = FrameRecord {
            timestamp: chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
            seq: self.frames,
            detected: !keypoints.is_empty(),
            keypoints: keypoints
                .iter()
                .map(|(name, p)| KeypointRecord {
                    name: names[name.index()],
                    x: p.x(),
                    y: p.y(),
                    confidence: p.confidence(),
                })
                .collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.frames += 1;
        Ok(())
    }
}
