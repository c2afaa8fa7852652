//! Report encoder and recorder support.

use framepress_common::config::AppConfig;
use framepress_export_engine::backend::default_backends;
use framepress_export_engine::{select_recorder_config, CodecProber, ProbeOutcome};
use framepress_frame_model::{CapabilityResult, FALLBACK_MIME_CANDIDATES};

pub async fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let backends = default_backends(config);
    let report = CodecProber::new(backends.encoder.clone())
        .probe_report()
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("FramePress System Check");
    println!("{}", "=".repeat(50));
    println!("Encoder platform: {}", report.platform);
    if !config.fast_path.allow_software_encoders {
        println!("     (software encoders excluded by fast_path.allow_software_encoders)");
    }

    for attempt in &report.attempts {
        let status = match &attempt.outcome {
            ProbeOutcome::Supported => "[OK]  ".to_string(),
            ProbeOutcome::Rejected => "[NO]  ".to_string(),
            ProbeOutcome::CheckFailed(reason) => format!("[ERR] ({reason}) "),
            ProbeOutcome::NotProbed => "[--]  ".to_string(),
        };
        println!("{status}{} ({})", attempt.label, attempt.codec);
    }

    println!();
    let stream = &backends.stream;
    if stream.is_available() {
        println!("[OK] Stream recorder: {}", stream.name());
        for mime in FALLBACK_MIME_CANDIDATES {
            let mark = if stream.is_type_supported(mime) {
                "yes"
            } else {
                "no"
            };
            println!("     {mime}: {mark}");
        }
        let picked = select_recorder_config(stream.as_ref(), &config.fallback);
        println!(
            "     Fallback would record {} at {} kbps",
            picked.mime_type,
            picked.bitrate_bps / 1000
        );
    } else {
        println!("[WARN] Stream recorder unavailable");
    }

    println!();
    match report.result {
        CapabilityResult::Supported(descriptor) => {
            println!("Exports will use the fast path with {}.", descriptor.label);
        }
        CapabilityResult::Unsupported(reason) => {
            println!("Exports will use the paced fallback path ({reason:?}).");
        }
    }

    Ok(())
}
