//! Show or initialize the configuration file.

use framepress_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if init {
        if let Err(e) = config.save() {
            anyhow::bail!("Failed to write {}: {e}", path.display());
        }
        println!("Wrote configuration to {}", path.display());
    } else {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
