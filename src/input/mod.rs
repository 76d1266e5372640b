/// 帧输入系统 (Frame Input System)
///
/// - RawFrame:        外部采集模块交付的 RGBA/RGB 8-bit 帧
/// - FrameSource:     帧源能力接口, 无帧时返回 None (跳过本周期)
/// - ImageFileSource: 图片文件 / 目录
/// - ChannelSource:   crossbeam 通道 (采集线程推送)
pub mod frame;
pub mod source;

pub use frame::{PixelFormat, RawFrame};
pub use source::{ChannelSource, FrameSource, ImageFileSource};
