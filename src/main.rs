//! Landmark tracker: replays recorded face and body landmarks through the
//! head pose, distance and gaze pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use landmark_tracker::{
    app::{AppConfig, InputSource, OutputFormat, TrackerApp},
    config::Config,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON Lines landmark recording, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Real face width in centimetres (10-20)
    #[arg(long)]
    calibrate: Option<f64>,

    /// Frame width used when a recording omits it
    #[arg(long)]
    width: Option<u32>,

    /// Frame height used when a recording omits it
    #[arg(long)]
    height: Option<u32>,

    /// Feed frames at this rate through the background worker
    #[arg(long)]
    fps: Option<f64>,

    /// Print one JSON object per frame
    #[arg(long)]
    json: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", landmark_tracker::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    info!("Landmark Tracker");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    // Command-line values override the file
    if let Some(width) = args.width {
        config.frame.width = width;
    }
    if let Some(height) = args.height {
        config.frame.height = height;
    }

    let tracker = config.build_tracker().context("Invalid tracker configuration")?;

    let app_config = AppConfig {
        input: InputSource::from_arg(&args.input),
        fps: args.fps,
        output_format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        calibrate_cm: args.calibrate,
    };

    // Create and run application
    let app = TrackerApp::new(app_config, tracker)?;
    app.run()?;

    Ok(())
}
