//! 帧源 (Frame sources)
//!
//! 流水线只依赖 `FrameSource` 能力接口, 不关心具体设备.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, TryRecvError};
use image::DynamicImage;

use super::frame::RawFrame;
use crate::error::Result;

/// 帧源能力接口
pub trait FrameSource {
    /// 取一帧; `None` 表示当前无可用帧 (跳过本周期, 不是错误)
    fn acquire_frame(&mut self) -> Option<DynamicImage>;

    /// 帧源已结束, 之后不会再产生帧
    fn is_exhausted(&self) -> bool {
        false
    }
}

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "webp", "tiff"];

/// 图片文件帧源: 依次读取文件/目录中的图片
pub struct ImageFileSource {
    paths: VecDeque<PathBuf>,
    current: Option<PathBuf>,
}

impl ImageFileSource {
    /// 展开目录 (非递归, 按文件名排序)
    pub fn new(sources: &[PathBuf]) -> Result<Self> {
        let mut paths = VecDeque::new();
        for source in sources {
            if source.is_dir() {
                let mut entries: Vec<PathBuf> = std::fs::read_dir(source)?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file() && Self::is_image(p))
                    .collect();
                entries.sort();
                paths.extend(entries);
            } else {
                paths.push_back(source.clone());
            }
        }
        log::info!("📂 图片帧源: {} 个文件", paths.len());
        Ok(Self {
            paths,
            current: None,
        })
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// 最近一次取出的文件路径
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageFileSource {
    fn acquire_frame(&mut self) -> Option<DynamicImage> {
        let path = self.paths.pop_front()?;
        let frame = match image::open(&path) {
            Ok(img) => Some(img),
            Err(e) => {
                log::warn!("⚠️ 无法读取图片 {}: {}", path.display(), e);
                None
            }
        };
        self.current = Some(path);
        frame
    }

    fn is_exhausted(&self) -> bool {
        self.paths.is_empty()
    }
}

/// 通道帧源: 采集线程通过 crossbeam 通道推送原始帧
pub struct ChannelSource {
    rx: Receiver<RawFrame>,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(rx: Receiver<RawFrame>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }
}

impl FrameSource for ChannelSource {
    fn acquire_frame(&mut self) -> Option<DynamicImage> {
        // 只取最新帧, 丢弃积压
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }

        match latest?.into_image() {
            Ok(img) => Some(img),
            Err(e) => {
                log::warn!("⚠️ 丢弃无效帧: {}", e);
                None
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.disconnected && self.rx.is_empty()
    }
}
