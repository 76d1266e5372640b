// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::cmp::Ordering;

use crate::detection::Detection;

/// objectness 降序, 相同时候选下标小者在前
fn by_confidence(a: &Detection, b: &Detection) -> Ordering {
    b.objectness
        .total_cmp(&a.objectness)
        .then(a.index.cmp(&b.index))
}

/// 贪心 NMS, 原地压缩
///
/// 与已保留框 IoU >= iou_threshold 的候选被丢弃.
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(by_confidence);

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou >= iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

/// 按值版本: 返回互不重叠的检测, 置信度降序
pub fn select(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    non_max_suppression(&mut detections, iou_threshold);
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Bbox, KPT_STEP, NUM_KEYPOINTS};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn det(index: usize, bbox: Bbox, objectness: f32) -> Detection {
        Detection {
            index,
            bbox,
            objectness,
            keypoints: [[0.0; KPT_STEP]; NUM_KEYPOINTS],
        }
    }

    fn random_box(rng: &mut StdRng) -> Bbox {
        let x1 = rng.gen_range(0.0..600.0);
        let y1 = rng.gen_range(0.0..600.0);
        let w = rng.gen_range(1.0..120.0);
        let h = rng.gen_range(1.0..120.0);
        Bbox::new(x1, y1, x1 + w, y1 + h)
    }

    fn random_detections(rng: &mut StdRng, n: usize) -> Vec<Detection> {
        (0..n)
            .map(|i| det(i, random_box(rng), rng.gen_range(0.0..1.0)))
            .collect()
    }

    #[test]
    fn test_single_detection_survives() {
        let ys = select(vec![det(0, Bbox::new(0., 0., 10., 10.), 0.9)], 0.45);
        assert_eq!(ys.len(), 1);
        assert_eq!(ys[0].index, 0);
    }

    #[test]
    fn test_overlapping_keeps_highest() {
        let ys = select(
            vec![
                det(0, Bbox::new(1., 1., 9., 9.), 0.8),
                det(1, Bbox::new(0., 0., 10., 10.), 0.9),
            ],
            0.45,
        );
        assert_eq!(ys.len(), 1);
        assert_eq!(ys[0].objectness, 0.9);
        assert_eq!(ys[0].bbox, Bbox::new(0., 0., 10., 10.));
    }

    #[test]
    fn test_iou_equal_to_threshold_is_dropped() {
        // IoU = 50 / 150 = 1/3
        let a = Bbox::new(0., 0., 10., 10.);
        let b = Bbox::new(5., 0., 15., 10.);
        let iou = a.iou(&b);
        let ys = select(vec![det(0, a, 0.9), det(1, b, 0.8)], iou);
        assert_eq!(ys.len(), 1);
        let ys = select(vec![det(0, a, 0.9), det(1, b, 0.8)], iou + 1e-4);
        assert_eq!(ys.len(), 2);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let b = Bbox::new(0., 0., 10., 10.);
        let ys = select(vec![det(3, b, 0.7), det(1, b, 0.7), det(2, b, 0.7)], 0.5);
        assert_eq!(ys.len(), 1);
        assert_eq!(ys[0].index, 1);
    }

    #[test]
    fn test_disjoint_sorted_descending() {
        let ys = select(
            vec![
                det(0, Bbox::new(0., 0., 10., 10.), 0.6),
                det(1, Bbox::new(20., 20., 30., 30.), 0.9),
                det(2, Bbox::new(40., 40., 50., 50.), 0.75),
            ],
            0.45,
        );
        let idx: Vec<usize> = ys.iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![1, 2, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(select(Vec::new(), 0.45).is_empty());
    }

    #[test]
    fn test_iou_symmetry_and_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let a = random_box(&mut rng);
            let b = random_box(&mut rng);
            let ab = a.iou(&b);
            assert_eq!(ab, b.iou(&a));
            assert!((0.0..=1.0).contains(&ab));
            assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nms_non_overlap_and_idempotence() {
        let mut rng = StdRng::seed_from_u64(7);
        for threshold in [0.1, 0.3, 0.45, 0.7] {
            for _ in 0..50 {
                let ys = select(random_detections(&mut rng, 40), threshold);
                for (i, a) in ys.iter().enumerate() {
                    for b in &ys[i + 1..] {
                        assert!(a.iou(b) < threshold);
                        assert!(a.objectness >= b.objectness);
                    }
                }
                let again = select(ys.clone(), threshold);
                assert_eq!(again, ys);
            }
        }
    }
}
