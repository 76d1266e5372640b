/// 推理线程 (Pose Worker)
/// 职责: 独占 PosePipeline, 接收帧 → 运行周期 → 发送 PoseFrame
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use image::DynamicImage;

use super::{PoseFrame, PosePipeline};
use crate::error::Result;
use crate::models::InferenceExecutor;

pub struct PoseWorker {
    frame_tx: Option<Sender<DynamicImage>>,
    result_rx: Receiver<Result<PoseFrame>>,
    // 周期进行中: 从 submit 成功到结果产出
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    dropped: u64,
}

impl PoseWorker {
    /// 启动推理线程
    ///
    /// 同一时刻最多一帧在处理, 处理期间提交的帧直接丢弃 (不排队).
    /// 结果通道只保留最新一个结果, 未取走的旧结果会被覆盖.
    pub fn spawn<E>(mut pipeline: PosePipeline<E>) -> Result<Self>
    where
        E: InferenceExecutor + Send + 'static,
    {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<DynamicImage>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<Result<PoseFrame>>(1);
        let stale_rx = result_rx.clone();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = Arc::clone(&busy);

        let handle = thread::Builder::new()
            .name("pose-worker".to_string())
            .spawn(move || {
                log::info!("🔍 推理线程启动");
                for image in frame_rx.iter() {
                    let result = pipeline.process(&image);
                    if let Err(e) = &result {
                        log::warn!("⚠️ 本周期作废: {}", e);
                    }
                    // 丢弃未被取走的旧结果
                    while stale_rx.try_recv().is_ok() {}
                    worker_busy.store(false, Ordering::Release);
                    if let Err(TrySendError::Disconnected(_)) = result_tx.try_send(result) {
                        break;
                    }
                }
                log::info!("👋 推理线程退出 ({} 帧)", pipeline.frames_processed());
            })?;

        Ok(Self {
            frame_tx: Some(frame_tx),
            result_rx,
            busy,
            handle: Some(handle),
            dropped: 0,
        })
    }

    /// 提交一帧; 上一帧仍在处理时丢弃新帧并返回 false
    pub fn submit(&mut self, image: DynamicImage) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        if self.busy.swap(true, Ordering::AcqRel) {
            self.dropped += 1;
            return false;
        }
        match tx.try_send(image) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                self.dropped += 1;
                false
            }
        }
    }

    /// 有一帧正在处理
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 被丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// 非阻塞取结果
    pub fn try_recv(&self) -> Option<Result<PoseFrame>> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// 阻塞等待下一个结果; 线程已退出时返回 None
    pub fn recv(&self) -> Option<Result<PoseFrame>> {
        self.result_rx.recv().ok()
    }

    /// 关闭帧通道并等待线程退出
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.frame_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("⚠️ 推理线程异常退出");
            }
        }
    }
}

impl Drop for PoseWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
