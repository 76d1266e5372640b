/// YOLO 姿态估计 (YOLO Pose)
///
/// 图片 / 目录 → 编码 → ONNX 推理 → 解码 → NMS → 17 个关键点
///
/// 用法:
///   yolo-pose --model models/yolov8n-pose.onnx --source images/ --output poses.jsonl
use std::fs::File;
use std::io::BufWriter;

use anyhow::Result;
use clap::Parser;
use yolo_pose_rs::pipeline::CycleOutcome;
use yolo_pose_rs::{
    Args, FrameSource, ImageFileSource, JsonLinesVisualizer, LogVisualizer, OrtExecutor,
    PosePipeline, Visualizer, KEYPOINT_NAMES,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.to_config()?;
    config.print_summary();

    log::info!("🚀 YOLO 姿态估计启动");
    log::info!("📦 模型: {}", args.model);

    let executor = OrtExecutor::from_file(&args.model)?;
    let mut pipeline = PosePipeline::new(config, executor)?;
    let mut source = ImageFileSource::new(&args.source)?;

    let mut visualizers: Vec<Box<dyn Visualizer>> = vec![Box::new(LogVisualizer::default())];
    if let Some(path) = &args.output {
        let file = File::create(path)?;
        visualizers.push(Box::new(JsonLinesVisualizer::new(BufWriter::new(file))));
        log::info!("📝 关键点输出: {}", path.display());
    }

    let (mut completed, mut skipped, mut failed) = (0u64, 0u64, 0u64);
    while !source.is_exhausted() {
        let outcome = match pipeline.tick(&mut source) {
            Ok(outcome) => outcome,
            Err(e) => {
                // 单帧失败不影响后续帧
                failed += 1;
                let path = source
                    .current_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                log::error!("❌ {}: {}", path, e);
                continue;
            }
        };

        match outcome {
            CycleOutcome::Skipped => skipped += 1,
            CycleOutcome::Completed(frame) => {
                completed += 1;
                if let Some(path) = source.current_path() {
                    log::info!(
                        "🖼️  {} ({}x{}) {:?}",
                        path.display(),
                        frame.geometry.source_width,
                        frame.geometry.source_height,
                        frame.timings.total()
                    );
                }
                for vis in visualizers.iter_mut() {
                    vis.present(&frame.keypoints, &KEYPOINT_NAMES)?;
                }
            }
        }
    }

    log::info!(
        "✅ 完成: {} 帧, 跳过 {}, 失败 {}",
        completed,
        skipped,
        failed
    );
    Ok(())
}
