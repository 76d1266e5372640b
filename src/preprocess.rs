// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 图像编码器 (Image Encoder)
// 任意尺寸图片 → 缩放到 S×S → CHW 平面排列, 归一化到 [0,1]

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView};
use ndarray::{Array, ArrayD, IxDyn};

use crate::config::{PoseConfig, ResizeFilter, ResizeMode};
use crate::error::{PoseError, Result};

/// Letterbox 填充值 (与 YOLOv8 预处理一致)
pub const PAD_VALUE: f32 = 144.0 / 255.0;

/// 编码后的输入几何信息
///
/// `content_width/height` 是图像内容在模型输入空间中占据的区域,
/// 关键点坐标按它归一化. Stretch 模式下等于 S×S.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGeometry {
    pub model_size: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

/// 编码结果: [1, 3, S, S] 张量 + 几何信息
#[derive(Debug, Clone)]
pub struct EncodedInput {
    pub tensor: ArrayD<f32>,
    pub geometry: InputGeometry,
}

impl EncodedInput {
    /// 扁平缓冲区, 长度 3·S·S
    pub fn into_vec(self) -> Vec<f32> {
        self.tensor.into_raw_vec_and_offset().0
    }
}

/// 图像编码器
#[derive(Debug, Clone)]
pub struct ImageEncoder {
    size: u32,
    mode: ResizeMode,
    filter: ResizeFilter,
}

impl ImageEncoder {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            mode: ResizeMode::Stretch,
            filter: ResizeFilter::Nearest,
        }
    }

    pub fn from_config(config: &PoseConfig) -> Self {
        Self {
            size: config.model_input_size,
            mode: config.resize_mode,
            filter: config.resize_filter,
        }
    }

    pub fn with_mode(mut self, mode: ResizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn mode(&self) -> ResizeMode {
        self.mode
    }

    /// 输出张量形状 [1, 3, S, S]
    pub fn shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        [1, 3, s, s]
    }

    /// 分配新张量并编码
    pub fn encode(&self, image: &DynamicImage) -> Result<EncodedInput> {
        if self.size == 0 {
            return Err(PoseError::InvalidInput("target size must be positive".to_string()));
        }
        let mut tensor = Array::zeros(IxDyn(&self.shape()));
        let geometry = self.encode_into(image, &mut tensor)?;
        Ok(EncodedInput { tensor, geometry })
    }

    /// 编码到调用方持有的张量 (复用缓冲区)
    pub fn encode_into(&self, image: &DynamicImage, out: &mut ArrayD<f32>) -> Result<InputGeometry> {
        let (w0, h0) = image.dimensions();
        if w0 == 0 || h0 == 0 {
            return Err(PoseError::InvalidInput(format!(
                "image has zero pixels ({w0}x{h0})"
            )));
        }
        if self.size == 0 {
            return Err(PoseError::InvalidInput("target size must be positive".to_string()));
        }
        if out.shape() != self.shape() {
            return Err(PoseError::shape(
                format!("{:?}", self.shape()),
                format!("{:?}", out.shape()),
            ));
        }

        let (cw, ch) = self.content_size(w0, h0);
        let pixels = self.resize_rgb(image, cw, ch)?;
        if pixels.len() != cw as usize * ch as usize * 3 {
            return Err(PoseError::shape(
                format!("{} pixels", cw as usize * ch as usize),
                format!("{} pixels", pixels.len() / 3),
            ));
        }

        let s = self.size as usize;
        let plane = s * s;
        let data = out
            .as_slice_mut()
            .ok_or_else(|| PoseError::shape("standard layout tensor", "non-contiguous tensor"))?;
        if let ResizeMode::Letterbox = self.mode {
            data.fill(PAD_VALUE);
        }

        // CHW: 先全部 R, 再全部 G, 最后全部 B
        let cw_ = cw as usize;
        for (i, rgb) in pixels.chunks_exact(3).enumerate() {
            let (x, y) = (i % cw_, i / cw_);
            let idx = y * s + x;
            data[idx] = rgb[0] as f32 / 255.0;
            data[plane + idx] = rgb[1] as f32 / 255.0;
            data[2 * plane + idx] = rgb[2] as f32 / 255.0;
        }

        Ok(InputGeometry {
            model_size: self.size,
            content_width: cw,
            content_height: ch,
            source_width: w0,
            source_height: h0,
        })
    }

    fn content_size(&self, w0: u32, h0: u32) -> (u32, u32) {
        match self.mode {
            ResizeMode::Stretch => (self.size, self.size),
            ResizeMode::Letterbox => {
                let s = self.size as f32;
                let r = (s / w0 as f32).min(s / h0 as f32);
                let w = ((w0 as f32 * r).round() as u32).clamp(1, self.size);
                let h = ((h0 as f32 * r).round() as u32).clamp(1, self.size);
                (w, h)
            }
        }
    }

    /// 缩放到 (w, h) 并返回紧密排列的 RGB8 数据
    fn resize_rgb(&self, image: &DynamicImage, w: u32, h: u32) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        if rgb.dimensions() == (w, h) {
            return Ok(rgb.into_raw());
        }

        let (w0, h0) = rgb.dimensions();
        let src_image = fr::images::Image::from_vec_u8(w0, h0, rgb.into_raw(), fr::PixelType::U8x3)
            .map_err(|e| PoseError::Resize(e.to_string()))?;
        let mut dst_image = fr::images::Image::new(w, h, fr::PixelType::U8x3);

        let alg = match self.filter {
            ResizeFilter::Nearest => fr::ResizeAlg::Nearest,
            ResizeFilter::Bilinear => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
        };
        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, &fr::ResizeOptions::new().resize_alg(alg))
            .map_err(|e| PoseError::Resize(e.to_string()))?;

        Ok(dst_image.buffer().to_vec())
    }
}

/// 编码为扁平 CHW 缓冲区 (Stretch + Nearest)
pub fn encode(image: &DynamicImage, target_size: u32) -> Result<Vec<f32>> {
    ImageEncoder::new(target_size)
        .encode(image)
        .map(EncodedInput::into_vec)
}
