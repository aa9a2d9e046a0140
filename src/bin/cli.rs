use clap::{Parser, Subcommand};
use bytesize::ByteSize;
use image::GrayImage;
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use knee_xray_reviewer::analysis::{ResultView, run_analysis};
use knee_xray_reviewer::browser::list_dicom_files;
use knee_xray_reviewer::config::Settings;
use knee_xray_reviewer::imaging::{extract_roi_crops, grade_from_file_name, load_study, split_joint};
use knee_xray_reviewer::inference::CommandClassifier;
use knee_xray_reviewer::logging;
use knee_xray_reviewer::roi::{ImagePoint, RoiSession, RoiSide};
use knee_xray_reviewer::scratch::ScratchDir;

#[derive(Parser, Debug)]
#[command(name = "review_cli", about = "Headless knee X-ray listing, analysis and dataset splitting", version)]
struct Cli {
    /// Settings file (TOML). Defaults to the per-user config file.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Directory for crops and result images
    #[arg(long = "scratch-dir", global = true)]
    scratch_dir: Option<PathBuf>,

    /// Side length of each ROI square, in image pixels
    #[arg(long = "box-size", global = true)]
    box_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the DICOM studies in a directory
    List { dir: PathBuf },

    /// Crop, classify and render results for one study
    Analyze {
        file: PathBuf,

        /// Top-left corner of the lateral square, as `x,y` in image pixels
        #[arg(long, value_parser = parse_point)]
        lateral: Option<ImagePoint>,

        /// Top-left corner of the medial square, as `x,y` in image pixels
        #[arg(long, value_parser = parse_point)]
        medial: Option<ImagePoint>,
    },

    /// Split every joint image in a directory into lateral and medial halves
    Split {
        dir: PathBuf,

        #[arg(short = 'o', long = "out")]
        out: PathBuf,
    },
}

fn parse_point(raw: &str) -> Result<ImagePoint, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("bad x in {raw:?}: {e}"))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("bad y in {raw:?}: {e}"))?;
    Ok(ImagePoint::new(x, y))
}

fn is_split_input(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "dcm" | "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff"
    )
}

fn load_gray(path: &Path) -> Result<GrayImage, Box<dyn Error>> {
    let is_dicom = path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"));
    if is_dicom {
        return Ok(load_study(path)?.image);
    }
    Ok(image::open(path)?.to_luma8())
}

fn run_list(dir: &Path) -> Result<(), Box<dyn Error>> {
    let entries = list_dicom_files(dir)?;
    for entry in &entries {
        println!("{}\t{}", entry.name, ByteSize::b(entry.size_bytes));
    }
    println!("{} studies", entries.len());
    Ok(())
}

fn run_analyze(
    settings: &Settings,
    file: &Path,
    lateral: Option<ImagePoint>,
    medial: Option<ImagePoint>,
) -> Result<(), Box<dyn Error>> {
    let Some(command) = settings.classifier.clone() else {
        return Err("no classifier configured; add a [classifier] table to the settings file".into());
    };

    let scratch = ScratchDir::open(&settings.scratch_dir)?;
    scratch.clear_or_log();

    let study = load_study(file)?;
    let mut session = RoiSession::new(settings.roi_box_size());
    session.load_image(study.geometry());
    if let Some(point) = lateral {
        session.move_square(RoiSide::Lateral, point)?;
    }
    if let Some(point) = medial {
        session.move_square(RoiSide::Medial, point)?;
    }
    let pair = session.boxes()?;
    info!(
        lateral = ?pair.lateral.top_left(),
        medial = ?pair.medial.top_left(),
        "ROI placement"
    );

    let crops = extract_roi_crops(&study.image, &pair);
    let classifier = CommandClassifier::new(command, scratch.path());
    let outcome = run_analysis(&study.file_name(), &crops, &scratch, &classifier)?;

    println!("lateral crop: {}", outcome.crops.lateral.display());
    println!("medial crop:  {}", outcome.crops.medial.display());
    let labelled: Vec<(&str, _)> = match &outcome.view {
        ResultView::Single(slot) => vec![("result", slot)],
        ResultView::Bilateral { right, left } => vec![("right", right), ("left", left)],
    };
    for (label, slot) in labelled {
        let grade = slot
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{label} [{}] KL grade {grade}", slot.id);
        println!("  heatmap:   {}", slot.heatmap.display());
        println!("  bar chart: {}", slot.bar_chart.display());
    }
    Ok(())
}

fn run_split(dir: &Path, out: &Path) -> Result<(), Box<dyn Error>> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()).into());
    }
    fs::create_dir_all(out)?;

    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_split_input(p))
        .collect();
    inputs.sort();

    let mut written = 0usize;
    for path in &inputs {
        let image = match load_gray(path) {
            Ok(image) => image,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable image");
                continue;
            }
        };
        let halves = split_joint(&image);

        let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or("image");
        let name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
        let grade = grade_from_file_name(name)
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());

        halves.lateral.save(out.join(format!("{stem}_lateral.png")))?;
        halves.medial.save(out.join(format!("{stem}_medial.png")))?;
        println!("{name}\tgrade {grade}");
        written += 1;
    }

    println!("split {written} of {} images into {}", inputs.len(), out.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.scratch_dir {
        settings.scratch_dir = dir;
    }
    if let Some(size) = cli.box_size {
        settings.box_size = size;
    }
    settings.validate()?;
    logging::init(&settings.log_level, settings.log_format);

    match cli.command {
        Command::List { dir } => run_list(&dir),
        Command::Analyze { file, lateral, medial } => run_analyze(&settings, &file, lateral, medial),
        Command::Split { dir, out } => run_split(&dir, &out),
    }
}
