use std::env;
use std::io::{self, BufReader};
use std::path::PathBuf;

use field_viewer::{config, FieldViewer, FileConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse --config <path> and --title <title> from the command line
    let mut config_path = PathBuf::from(config::DEFAULT_CONFIG_PATH);
    let mut window_title = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                config_path = PathBuf::from(path);
            }
        } else if arg == "--title" {
            if let Some(title) = args.next() {
                window_title = Some(title);
            }
        } else {
            log::warn!("ignoring unknown argument {arg:?}");
        }
    }

    let file_config = FileConfig::load_json(&config_path)?;
    log::info!(
        "loaded {} (robot {}x{} in, field image {})",
        config_path.display(),
        file_config.robot_width,
        file_config.robot_height,
        file_config.field_image_path.display()
    );

    let mut viewer = FieldViewer::from_file_config(&file_config)?;
    if let Some(title) = window_title {
        viewer = viewer.with_title(title);
    }
    viewer.run_with_input(BufReader::new(io::stdin()))?;
    Ok(())
}
