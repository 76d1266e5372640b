// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use ndarray::{ArrayView1, ArrayView2, ArrayViewD, Axis, Ix2};

use crate::config::{BoxFormat, OutputLayout, PoseConfig};
use crate::detection::{
    Bbox, Detection, BOX_CHANNELS, KPT_OFFSET, KPT_STEP, NUM_CHANNELS, NUM_KEYPOINTS,
    OBJECTNESS_CHANNEL,
};
use crate::error::{PoseError, Result};

/// 检测解码器: 原始输出 (56 × N) → 候选检测列表
///
/// 通道布局固定: `[box(4), objectness(1), kpts(17 × 3)]`.
#[derive(Debug, Clone, Default)]
pub struct DetectionDecoder {
    layout: OutputLayout,
    box_format: BoxFormat,
    num_candidates: Option<usize>,
}

impl DetectionDecoder {
    pub fn new(layout: OutputLayout, box_format: BoxFormat, num_candidates: Option<usize>) -> Self {
        Self {
            layout,
            box_format,
            num_candidates,
        }
    }

    pub fn from_config(config: &PoseConfig) -> Self {
        Self::new(config.output_layout, config.box_format, config.num_candidates)
    }

    /// 解码并按 objectness 过滤, 结果按候选下标顺序排列
    pub fn decode(&self, output: ArrayViewD<'_, f32>, conf_threshold: f32) -> Result<Vec<Detection>> {
        if !(0.0..=1.0).contains(&conf_threshold) {
            return Err(PoseError::InvalidInput(format!(
                "confidence threshold must be in [0, 1], got {conf_threshold}"
            )));
        }
        let preds = self.channels_by_candidates(output)?;

        let mut ys = Vec::new();
        for (index, pred) in preds.axis_iter(Axis(1)).enumerate() {
            let objectness = pred[OBJECTNESS_CHANNEL];
            // NaN 也在这里被丢弃
            if !(objectness >= conf_threshold) {
                continue;
            }
            ys.push(Detection {
                index,
                bbox: self.bbox(&pred),
                objectness,
                keypoints: Self::keypoints(&pred),
            });
        }
        Ok(ys)
    }

    /// 扁平缓冲区版本 (长度 56·N)
    pub fn decode_slice(&self, output: &[f32], conf_threshold: f32) -> Result<Vec<Detection>> {
        self.decode(ArrayView1::from(output).into_dyn(), conf_threshold)
    }

    /// 统一转换为 (C, N) 视图
    fn channels_by_candidates<'a>(&self, output: ArrayViewD<'a, f32>) -> Result<ArrayView2<'a, f32>> {
        if output.is_empty() {
            return Err(PoseError::InvalidInput("empty model output".to_string()));
        }
        let got = format!("{:?}", output.shape());

        let view: ArrayView2<'a, f32> = match output.ndim() {
            1 => {
                let len = output.len();
                let n = self.num_candidates.unwrap_or(len / NUM_CHANNELS);
                if n == 0 || len != NUM_CHANNELS * n {
                    return Err(PoseError::shape(format!("{NUM_CHANNELS} x N values"), got));
                }
                let shape = match self.layout {
                    OutputLayout::ChannelsFirst => (NUM_CHANNELS, n),
                    OutputLayout::CandidatesFirst => (n, NUM_CHANNELS),
                };
                output
                    .into_shape_with_order(shape)
                    .map_err(|e| PoseError::shape(format!("{shape:?}"), e.to_string()))?
            }
            2 => output
                .into_dimensionality::<Ix2>()
                .map_err(|e| PoseError::shape("2-D output", e.to_string()))?,
            3 => {
                if output.shape()[0] != 1 {
                    return Err(PoseError::shape("batch size 1", got));
                }
                output
                    .index_axis_move(Axis(0), 0)
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| PoseError::shape("[1, C, N]", e.to_string()))?
            }
            _ => return Err(PoseError::shape("[C, N], [1, C, N] or flat", got)),
        };

        let view = match self.layout {
            OutputLayout::ChannelsFirst => view,
            OutputLayout::CandidatesFirst => view.reversed_axes(),
        };

        let (c, n) = view.dim();
        if c != NUM_CHANNELS {
            return Err(PoseError::shape(format!("{NUM_CHANNELS} channels"), format!("{c} channels ({got})")));
        }
        if let Some(expected) = self.num_candidates {
            if n != expected {
                return Err(PoseError::shape(format!("{expected} candidates"), format!("{n} candidates")));
            }
        }
        Ok(view)
    }

    fn bbox(&self, pred: &ArrayView1<'_, f32>) -> Bbox {
        let b: [f32; BOX_CHANNELS] = [pred[0], pred[1], pred[2], pred[3]];
        match self.box_format {
            BoxFormat::Cxcywh => Bbox::from_cxcywh(b[0], b[1], b[2], b[3]),
            BoxFormat::Xyxy => Bbox::new(b[0], b[1], b[2], b[3]),
        }
    }

    fn keypoints(pred: &ArrayView1<'_, f32>) -> [[f32; KPT_STEP]; NUM_KEYPOINTS] {
        let mut kpts = [[0.0; KPT_STEP]; NUM_KEYPOINTS];
        for (i, kpt) in kpts.iter_mut().enumerate() {
            let base = KPT_OFFSET + KPT_STEP * i;
            *kpt = [pred[base], pred[base + 1], pred[base + 2]];
        }
        kpts
    }
}

/// 便捷函数: 默认布局 (ChannelsFirst + Cxcywh) 解码扁平缓冲区
pub fn decode(output: &[f32], conf_threshold: f32) -> Result<Vec<Detection>> {
    DetectionDecoder::default().decode_slice(output, conf_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    /// 构造 (56, N) 通道优先输出, 每列 (box, obj, kpt 基值)
    fn raw_output(cands: &[([f32; 4], f32, f32)]) -> Array2<f32> {
        let mut out = Array2::zeros((NUM_CHANNELS, cands.len()));
        for (j, (b, obj, k)) in cands.iter().enumerate() {
            for c in 0..4 {
                out[[c, j]] = b[c];
            }
            out[[OBJECTNESS_CHANNEL, j]] = *obj;
            for c in KPT_OFFSET..NUM_CHANNELS {
                out[[c, j]] = *k + c as f32;
            }
        }
        out
    }

    #[test]
    fn test_single_candidate_passes() {
        let out = raw_output(&[([320., 320., 100., 200.], 0.9, 0.0)]);
        let ys = DetectionDecoder::default().decode(out.view().into_dyn(), 0.5).unwrap();
        assert_eq!(ys.len(), 1);
        assert_eq!(ys[0].index, 0);
        assert_eq!(ys[0].bbox, Bbox::new(270., 220., 370., 420.));
        assert_eq!(ys[0].objectness, 0.9);
        // 关键点三元组原样保留
        assert_eq!(ys[0].keypoints[0], [5., 6., 7.]);
        assert_eq!(ys[0].keypoints[16], [53., 54., 55.]);
    }

    #[test]
    fn test_filter_keeps_index_order() {
        let out = raw_output(&[
            ([0., 0., 1., 1.], 0.2, 0.),
            ([0., 0., 1., 1.], 0.5, 0.),
            ([0., 0., 1., 1.], 0.49, 0.),
            ([0., 0., 1., 1.], 0.95, 0.),
            ([0., 0., 1., 1.], f32::NAN, 0.),
        ]);
        let ys = DetectionDecoder::default().decode(out.view().into_dyn(), 0.5).unwrap();
        let idx: Vec<usize> = ys.iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![1, 3]);
    }

    #[test]
    fn test_all_below_threshold_is_empty() {
        let out = raw_output(&[([0., 0., 1., 1.], 0.1, 0.), ([0., 0., 1., 1.], 0.3, 0.)]);
        let ys = decode(out.as_slice().unwrap(), 0.5).unwrap();
        assert!(ys.is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_is_invalid() {
        let out = raw_output(&[([0., 0., 1., 1.], 0.9, 0.), ([0., 0., 1., 1.], 0.1, 0.)]);
        let decoder = DetectionDecoder::default();
        for threshold in [f32::NAN, -1.0, 1.5] {
            assert!(matches!(
                decoder.decode(out.view().into_dyn(), threshold),
                Err(PoseError::InvalidInput(_))
            ));
        }
        assert_eq!(decoder.decode(out.view().into_dyn(), 0.0).unwrap().len(), 2);
        assert_eq!(decoder.decode(out.view().into_dyn(), 1.0).unwrap().len(), 0);
    }

    #[test]
    fn test_batched_and_flat_agree() {
        let out = raw_output(&[([10., 10., 4., 4.], 0.8, 1.), ([50., 50., 8., 8.], 0.7, 2.)]);
        let batched: Array3<f32> = out.clone().insert_axis(Axis(0));
        let decoder = DetectionDecoder::default();
        let a = decoder.decode(batched.view().into_dyn(), 0.5).unwrap();
        let b = decoder.decode_slice(out.as_slice().unwrap(), 0.5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_candidates_first_layout() {
        let out = raw_output(&[([0., 0., 10., 10.], 0.9, 0.)]);
        let transposed = out.t().to_owned();
        let decoder = DetectionDecoder::new(OutputLayout::CandidatesFirst, BoxFormat::Xyxy, Some(1));
        let ys = decoder.decode(transposed.view().into_dyn(), 0.5).unwrap();
        assert_eq!(ys[0].bbox, Bbox::new(0., 0., 10., 10.));
        assert_eq!(ys[0].keypoints[1], [8., 9., 10.]);
    }

    #[test]
    fn test_shape_errors() {
        let decoder = DetectionDecoder::default();
        assert!(matches!(
            decoder.decode_slice(&[], 0.5),
            Err(PoseError::InvalidInput(_))
        ));
        // 长度不是 56 的倍数
        assert!(matches!(
            decoder.decode_slice(&[0.0; 57], 0.5),
            Err(PoseError::ShapeMismatch { .. })
        ));
        // 通道数错误
        let wrong = Array2::<f32>::zeros((55, 3));
        assert!(matches!(
            decoder.decode(wrong.view().into_dyn(), 0.5),
            Err(PoseError::ShapeMismatch { .. })
        ));
        // batch > 1
        let batch = Array3::<f32>::zeros((2, NUM_CHANNELS, 3));
        assert!(matches!(
            decoder.decode(batch.view().into_dyn(), 0.5),
            Err(PoseError::ShapeMismatch { .. })
        ));
        // 候选数与配置不符
        let fixed = DetectionDecoder::new(OutputLayout::ChannelsFirst, BoxFormat::Cxcywh, Some(8400));
        assert!(matches!(
            fixed.decode_slice(&[0.0; NUM_CHANNELS * 2], 0.5),
            Err(PoseError::ShapeMismatch { .. })
        ));
    }
}
