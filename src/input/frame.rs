//! 原始帧 (Raw frame) - 外部采集模块交付的 8-bit 像素缓冲

use image::{DynamicImage, ImageBuffer, Rgb, Rgba};

use crate::error::{PoseError, Result};

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// 已解码帧 (采集线程 → 推理线程)
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl RawFrame {
    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgb8,
        }
    }

    /// 像素缓冲 → DynamicImage
    pub fn to_image(&self) -> Result<DynamicImage> {
        self.validate()?;
        let image = match self.format {
            PixelFormat::Rgba8 => {
                ImageBuffer::<Rgba<u8>, _>::from_raw(self.width, self.height, self.data.clone())
                    .map(DynamicImage::ImageRgba8)
            }
            PixelFormat::Rgb8 => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, self.data.clone())
                    .map(DynamicImage::ImageRgb8)
            }
        };
        image.ok_or_else(|| PoseError::InvalidInput("RGBA图像转换失败".to_string()))
    }

    /// 按值转换, 避免复制像素数据
    pub fn into_image(self) -> Result<DynamicImage> {
        self.validate()?;
        let (width, height) = (self.width, self.height);
        let image = match self.format {
            PixelFormat::Rgba8 => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgba8),
            PixelFormat::Rgb8 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgb8),
        };
        image.ok_or_else(|| PoseError::InvalidInput("RGB图像转换失败".to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.data.is_empty() {
            return Err(PoseError::InvalidInput(format!(
                "empty frame ({}x{}, {} bytes)",
                self.width,
                self.height,
                self.data.len()
            )));
        }
        let expected = self.width as usize * self.height as usize * self.format.channels();
        if self.data.len() != expected {
            return Err(PoseError::shape(
                format!("{expected} bytes ({}x{}x{})", self.width, self.height, self.format.channels()),
                format!("{} bytes", self.data.len()),
            ));
        }
        Ok(())
    }
}
