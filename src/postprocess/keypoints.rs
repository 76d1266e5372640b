// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::config::{ConfidencePolicy, PoseConfig};
use crate::detection::{Detection, Keypoint, KeypointSet, NUM_KEYPOINTS};

/// 关键点提取: 原始三元组 → 归一化 [0,1] 关键点集合
#[derive(Debug, Clone)]
pub struct KeypointExtractor {
    conf_threshold: f32,
    policy: ConfidencePolicy,
}

impl KeypointExtractor {
    pub fn new(conf_threshold: f32, policy: ConfidencePolicy) -> Self {
        Self {
            conf_threshold,
            policy,
        }
    }

    pub fn from_config(config: &PoseConfig) -> Self {
        Self::new(config.confidence_threshold, config.confidence_policy)
    }

    pub fn conf_threshold(&self) -> f32 {
        self.conf_threshold
    }

    /// `width`/`height` 为模型输入空间中图像内容的尺寸.
    /// 始终返回 17 个点, 低于阈值的位置填哨兵.
    pub fn extract(&self, detection: &Detection, width: f32, height: f32) -> KeypointSet {
        if !(width > 0.0 && height > 0.0) {
            return KeypointSet::empty();
        }

        let confs = self.confidences(detection);
        let mut points = [Keypoint::SENTINEL; NUM_KEYPOINTS];
        for (i, point) in points.iter_mut().enumerate() {
            let [x, y, _] = detection.keypoints[i];
            let conf = confs[i];
            if !(x.is_finite() && y.is_finite() && conf.is_finite()) {
                continue;
            }
            if conf < self.conf_threshold {
                continue;
            }
            *point = Keypoint::new(
                (x / width).clamp(0.0, 1.0),
                (y / height).clamp(0.0, 1.0),
                conf,
            );
        }
        KeypointSet::new(points)
    }

    /// NMS 结果中取第一个 (置信度最高); 无检测时返回全哨兵
    pub fn extract_best(&self, detections: &[Detection], width: f32, height: f32) -> KeypointSet {
        detections
            .first()
            .map(|d| self.extract(d, width, height))
            .unwrap_or_default()
    }

    fn confidences(&self, detection: &Detection) -> [f32; NUM_KEYPOINTS] {
        let mut confs = detection.keypoints.map(|k| k[2]);
        if let ConfidencePolicy::MinMax = self.policy {
            let finite = confs.iter().copied().filter(|c| c.is_finite());
            let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c), hi.max(c))
            });
            // 全部相等时退化为 clamp
            if max > min {
                for c in confs.iter_mut() {
                    *c = (*c - min) / (max - min);
                }
            }
        }
        for c in confs.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
        confs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Bbox, KeypointName, KPT_STEP};

    fn detection(kpts: [[f32; KPT_STEP]; NUM_KEYPOINTS]) -> Detection {
        Detection {
            index: 0,
            bbox: Bbox::new(0., 0., 640., 640.),
            objectness: 0.9,
            keypoints: kpts,
        }
    }

    #[test]
    fn test_normalizes_and_clamps() {
        let mut kpts = [[320.0, 160.0, 0.9]; NUM_KEYPOINTS];
        kpts[1] = [640.0, 640.0, 0.8];
        kpts[2] = [700.0, -5.0, 1.7];
        let set = KeypointExtractor::new(0.5, ConfidencePolicy::Clamp)
            .extract(&detection(kpts), 640.0, 640.0);

        assert_eq!(set.len(), 17);
        assert_eq!(set[KeypointName::Nose].position(), (0.5, 0.25));
        // 坐标等于输入尺寸时恰好为 1.0
        assert_eq!(set[KeypointName::LeftEye].position(), (1.0, 1.0));
        assert_eq!(set[KeypointName::RightEye].position(), (1.0, 0.0));
        assert_eq!(set[KeypointName::RightEye].confidence(), 1.0);
    }

    #[test]
    fn test_below_threshold_is_sentinel() {
        let mut kpts = [[100.0, 100.0, 0.9]; NUM_KEYPOINTS];
        kpts[KeypointName::LeftWrist.index()] = [100.0, 100.0, 0.49];
        kpts[KeypointName::RightWrist.index()] = [100.0, 100.0, -3.0];
        kpts[KeypointName::LeftAnkle.index()] = [f32::NAN, 100.0, 0.9];
        let set = KeypointExtractor::new(0.5, ConfidencePolicy::Clamp)
            .extract(&detection(kpts), 640.0, 640.0);

        for name in [KeypointName::LeftWrist, KeypointName::RightWrist, KeypointName::LeftAnkle] {
            assert!(set[name].is_sentinel());
        }
        assert_eq!(set.visible(0.0).count(), 14);
        for p in set.points() {
            if p.confidence() < 0.5 {
                assert_eq!(p.position(), (0.0, 0.0));
                assert_eq!(p.confidence(), 0.0);
            }
        }
    }

    #[test]
    fn test_no_detection_is_all_sentinel() {
        let extractor = KeypointExtractor::new(0.5, ConfidencePolicy::Clamp);
        let set = extractor.extract_best(&[], 640.0, 640.0);
        assert_eq!(set.len(), 17);
        assert!(set.is_empty());

        let all_low = detection([[10.0, 10.0, 0.1]; NUM_KEYPOINTS]);
        assert!(extractor.extract(&all_low, 640.0, 640.0).is_empty());
        let ok = detection([[10.0, 10.0, 0.9]; NUM_KEYPOINTS]);
        assert!(extractor.extract(&ok, 0.0, 640.0).is_empty());
    }

    #[test]
    fn test_content_extent_normalization() {
        // letterbox: 内容区域 640x320
        let set = KeypointExtractor::new(0.5, ConfidencePolicy::Clamp)
            .extract(&detection([[320.0, 160.0, 0.9]; NUM_KEYPOINTS]), 640.0, 320.0);
        assert_eq!(set[KeypointName::Nose].position(), (0.5, 0.5));
    }

    #[test]
    fn test_minmax_rescales_before_threshold() {
        let mut kpts = [[10.0, 10.0, 0.3]; NUM_KEYPOINTS];
        kpts[0][2] = 0.1;
        kpts[1][2] = 0.4;
        let d = detection(kpts);

        // clamp: 0.3 < 0.5 全部丢弃
        assert!(KeypointExtractor::new(0.5, ConfidencePolicy::Clamp)
            .extract(&d, 640.0, 640.0)
            .is_empty());

        // minmax: (0.3-0.1)/0.3 ≈ 0.667 通过, 最小值 0 被丢弃
        let set = KeypointExtractor::new(0.5, ConfidencePolicy::MinMax).extract(&d, 640.0, 640.0);
        assert!(set[KeypointName::Nose].is_sentinel());
        assert!((set[KeypointName::LeftEye].confidence() - 1.0).abs() < 1e-6);
        assert!((set[KeypointName::RightEye].confidence() - 2.0 / 3.0).abs() < 1e-5);
        assert_eq!(set.visible(0.5).count(), 16);
    }

    #[test]
    fn test_minmax_flat_falls_back_to_clamp() {
        let d = detection([[10.0, 10.0, 0.6]; NUM_KEYPOINTS]);
        let set = KeypointExtractor::new(0.5, ConfidencePolicy::MinMax).extract(&d, 640.0, 640.0);
        assert!(set.points().iter().all(|p| (p.confidence() - 0.6).abs() < 1e-6));
    }
}
