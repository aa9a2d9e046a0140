use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use knee_xray_reviewer::config::Settings;
use knee_xray_reviewer::gui_app::run_iced_app;
use knee_xray_reviewer::logging;

#[derive(Parser, Debug)]
#[command(name = "review_gui", about = "Review knee X-ray DICOM studies and grade the joint", version)]
struct Cli {
    /// Settings file (TOML). Defaults to the per-user config file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Directory for crops and result images; cleared on every new study
    #[arg(long = "scratch-dir")]
    scratch_dir: Option<PathBuf>,

    /// Side length of each ROI square, in image pixels
    #[arg(long = "box-size")]
    box_size: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Failed to load settings: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.scratch_dir {
        settings.scratch_dir = dir;
    }
    if let Some(size) = cli.box_size {
        settings.box_size = size;
    }
    if let Err(err) = settings.validate() {
        eprintln!("Invalid settings: {err}");
        return ExitCode::FAILURE;
    }

    logging::init(&settings.log_level, settings.log_format);
    info!(
        scratch_dir = %settings.scratch_dir.display(),
        box_size = settings.box_size,
        classifier = settings.classifier.is_some(),
        "starting review GUI"
    );

    match run_iced_app(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "GUI exited with an error");
            ExitCode::FAILURE
        }
    }
}
