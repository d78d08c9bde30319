mod config;

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use prism_renderer::{FrameStats, RenderBackend, StagingBackend};
use prism_scene::{SceneError, SceneImporter};
use structopt::StructOpt;

use crate::config::{ConfigError, ViewerConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "prism")]
struct CliArgs {
    /// Model files to load
    #[structopt(parse(from_os_str), required = true)]
    files: Vec<PathBuf>,
    /// JSON config file, overrides PRISM_CONFIG
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    /// Output debug info
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{failed} of {total} files failed to load")]
    Files { failed: usize, total: usize },
}

fn main() -> Result<(), AppError> {
    let args = CliArgs::from_args();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &args.config {
        Some(path) => ViewerConfig::from_path(path)?,
        None => ViewerConfig::from_env()?,
    };
    debug!("{config:?}");

    let mut failed = 0;
    for file in &args.files {
        // A broken file does not stop the others
        if let Err(e) = view(file, &config) {
            error!("{}: {e}", file.display());
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(AppError::Files {
            failed,
            total: args.files.len(),
        });
    }
    Ok(())
}

fn view(path: &Path, config: &ViewerConfig) -> Result<(), SceneError> {
    let mut importer = SceneImporter::new();
    importer.set_file_name(path);
    importer.set_frame_rate(config.frame_rate)?;
    importer.set_parallel_skinning(config.parallel_skinning);
    importer.begin()?;

    let mut backend = StagingBackend::new();
    importer.import_actors(&mut backend)?;

    let count = importer.number_of_animations();
    for i in 0..count {
        info!("Animation {i}: '{}'", importer.animation_name(i)?);
    }
    match config.animation {
        Some(only) if only < count => {
            for i in (0..count).filter(|i| *i != only) {
                importer.disable_animation(i)?;
            }
        }
        Some(only) => warn!("No animation {only} in {}, playing all", path.display()),
        None => {}
    }

    // Step through the longest enabled clip
    let mut plan = None;
    let mut longest = 0.0;
    for i in (0..count).filter(|i| importer.is_animation_enabled(*i)) {
        let info = importer.temporal_information(i, config.frame_rate)?;
        if info.range[1] > longest {
            longest = info.range[1];
            plan = Some(info);
        }
    }
    let times: Vec<f64> = match &plan {
        Some(info) => info
            .sample_times()
            .take(config.max_frames.unwrap_or(usize::MAX))
            .collect(),
        None => vec![0.0],
    };

    let mut total = FrameStats::default();
    for t in &times {
        importer.update_time(*t)?;
        let stats = backend.frame(importer.drawables());
        debug!(
            "t = {t:.3}s: {} drawables, {} triangles, {} joint matrices, {} uniform bytes",
            stats.drawables, stats.triangles, stats.joint_matrices, stats.uniform_bytes
        );
        total.joint_matrices += stats.joint_matrices;
        total.uniform_bytes += stats.uniform_bytes;
        total.drawables = stats.drawables;
        total.triangles = stats.triangles;
    }

    info!(
        "{}: {} frames over {longest:.3}s, {} drawables, {} triangles, {} joint matrices uploaded",
        path.display(),
        times.len(),
        total.drawables,
        total.triangles,
        total.joint_matrices
    );

    backend.release_graphics_resources();
    importer.release_resources();
    Ok(())
}
