//! Render the demo animation and export it.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use framepress_common::config::AppConfig;
use framepress_export_engine::backend::default_backends;
use framepress_export_engine::{ExportProgress, Exporter, ProgressCallback};
use framepress_frame_model::TimingParams;

use crate::synthetic;

pub struct ExportArgs {
    pub output: Option<PathBuf>,
    pub fps: u32,
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub force_fallback: bool,
}

pub async fn run(config: &AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let timing = TimingParams::new(args.fps, args.duration_ms)?;
    let total = timing.frame_count() as usize;

    let output_path = args.output.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        config
            .export
            .output_dir
            .join(format!("framepress-{stamp}.webm"))
    });

    println!(
        "Rendering {total} frames ({}x{} @ {} fps)",
        args.width, args.height, args.fps
    );
    let render_start = Instant::now();
    let frames = synthetic::render_demo(args.width, args.height, total, |done| {
        if done % 10 == 0 || done == total {
            print!("\r  Rendering: {done}/{total} frames  ");
            let _ = std::io::stdout().flush();
        }
    })?;
    let render_secs = render_start.elapsed().as_secs_f64();
    println!("\n  Rendered in {render_secs:.2}s");

    let exporter = if args.force_fallback {
        Exporter::new(default_backends(config).without_encoder_api())
            .with_fallback_config(config.fallback.clone())
    } else {
        Exporter::from_config(config)
    };

    let progress: ProgressCallback = Arc::new(|p: ExportProgress| {
        print!(
            "\r  Export: {:>3}% [{:?}] {}  ",
            p.percent, p.stage, p.label
        );
        let _ = std::io::stdout().flush();
    });

    let result = exporter.export(&frames, timing, Some(progress)).await;
    println!();
    let result = result?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &result.bytes)?;

    println!("Export complete: {}", output_path.display());
    println!("  Method: {} ({})", result.method.as_str(), result.label);
    println!("  Codec: {}", result.codec);
    println!("  Frames: {}", result.frame_count);
    println!(
        "  Size: {:.2} MB",
        result.byte_len() as f64 / (1024.0 * 1024.0)
    );
    println!("  Render time: {render_secs:.2}s");
    println!("  Encode time: {:.2}s", result.durations.encode);
    if let Some(speedup) = result.speedup(Duration::from_millis(args.duration_ms)) {
        println!("  Speed: {speedup:.2}x real time");
    }

    Ok(())
}
