//! Headless host: one image, one frame.

use clap::Parser;
use defectmark_core::{
    AnnotationSet, CatalogError, ConfigError, DefectCatalog, EngineConfig, FileSource,
    FileStorage, LoadOutcome, RenderScheduler, Session, SessionEvent, StorageError, StoreError,
};
use defectmark_render::{RenderContext, Renderer, RendererError, SkiaRenderer};
use kurbo::Size;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Host errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Invalid annotation file {path}: {message}")]
    Annotations { path: String, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("Failed to encode PNG: {0}")]
    Png(#[from] png::EncodingError),
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Result type for the host.
pub type AppResult<T> = Result<T, AppError>;

/// Render a DefectMark annotation session to a PNG snapshot.
#[derive(Debug, Clone, Parser)]
#[command(name = "defectmark", version, about)]
pub struct Args {
    /// Image name or file:// URL, resolved under --root.
    #[arg(long)]
    pub image: String,

    /// Directory that image names are resolved against.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Annotation set JSON to import.
    #[arg(long)]
    pub annotations: Option<PathBuf>,

    /// Defect catalog JSON (array of defect types).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Engine config JSON.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Container width in pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Container height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Zoom steps after fitting; negative zooms out.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub zoom: i32,

    /// Draw annotations without labels.
    #[arg(long)]
    pub hide_labels: bool,

    /// Output PNG path.
    #[arg(long)]
    pub out: PathBuf,

    /// Save the annotation set as JSON into this directory.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,
}

/// Load the config file if one was given.
pub fn load_config(path: Option<&Path>) -> AppResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Initialize `env_logger`. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: Option<&EngineConfig>) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(config.map(EngineConfig::level_filter).unwrap_or(log::LevelFilter::Info));
    }
    builder.init();
}

/// The host application.
pub struct App {
    args: Args,
    config: EngineConfig,
}

impl App {
    pub fn new(args: Args, config: EngineConfig) -> Self {
        Self { args, config }
    }

    /// Load, apply view commands, render and optionally save.
    pub async fn run(self) -> AppResult<()> {
        let args = self.args;
        let catalog = match &args.catalog {
            Some(path) => DefectCatalog::from_json(&read_file(path)?)?,
            None => DefectCatalog::default(),
        };
        let container = Size::new(f64::from(args.width), f64::from(args.height));
        let mut scheduler = RenderScheduler::with_config(&self.config);
        let mut session = Session::with_config(self.config, catalog).with_container(container);

        let loader = session.image_loader(Arc::new(FileSource::new(&args.root)));
        let outcome = loader.load(&args.image).await;
        commit_or_warn(&mut session, outcome);

        if let Some(path) = &args.annotations {
            let set = AnnotationSet::from_json(&read_file(path)?).map_err(|e| AppError::Annotations {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            session.import(set)?;
        }

        let step = if args.zoom >= 0 {
            SessionEvent::ZoomIn
        } else {
            SessionEvent::ZoomOut
        };
        for _ in 0..args.zoom.unsigned_abs() {
            let transition = session.apply(step.clone())?;
            scheduler.request(transition.render, Instant::now());
        }
        if args.hide_labels {
            let transition = session.apply(SessionEvent::ToggleLabels)?;
            scheduler.request(transition.render, Instant::now());
        }

        // Let a zoom burst settle before drawing.
        while !scheduler.poll(Instant::now()) {
            match scheduler.next_deadline() {
                Some(deadline) => std::thread::sleep(deadline.saturating_duration_since(Instant::now())),
                None => break,
            }
        }

        let mut renderer = SkiaRenderer::new();
        let stats = renderer.render(&RenderContext::new(&session, container))?;
        log::info!(
            "Rendered {} annotations ({} degenerate, {} labels)",
            stats.annotations_drawn,
            stats.degenerate_skipped,
            stats.labels_drawn
        );

        let frame = renderer
            .to_rgba_image()
            .ok_or_else(|| RendererError::RenderFailed("No frame rendered".to_string()))?;
        write_png(&args.out, frame.width(), frame.height(), frame.as_raw())?;
        log::info!("Wrote {}", args.out.display());

        if let Some(dir) = &args.save_dir {
            let storage = FileStorage::new(dir)?;
            session.save(&storage).await?;
        }
        Ok(())
    }
}

/// Commit a load result, warning when the session refuses it.
fn commit_or_warn(session: &mut Session, outcome: LoadOutcome) -> bool {
    let source = match &outcome {
        LoadOutcome::Ready(image) => image.source.clone(),
        LoadOutcome::Superseded { source, .. } => source.clone(),
    };
    let committed = session.commit_image(outcome);
    if !committed {
        log::warn!("Image {} was not committed (stale load); rendering without it", source);
    }
    committed
}

fn read_file(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|e| AppError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Encode straight-alpha RGBA8 pixels as PNG.
fn write_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> AppResult<()> {
    let file = File::create(path).map_err(|e| AppError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["defectmark", "--image", "part.png", "--out", "frame.png"]).unwrap();
        assert_eq!(args.image, "part.png");
        assert_eq!(args.root, PathBuf::from("."));
        assert_eq!((args.width, args.height), (1280, 800));
        assert_eq!(args.zoom, 0);
        assert!(!args.hide_labels);
        assert!(args.save_dir.is_none());
    }

    #[test]
    fn test_negative_zoom_and_flags() {
        let args = Args::try_parse_from([
            "defectmark",
            "--image",
            "part.png",
            "--out",
            "frame.png",
            "--zoom",
            "-3",
            "--hide-labels",
            "--save-dir",
            "sets",
        ])
        .unwrap();
        assert_eq!(args.zoom, -3);
        assert!(args.hide_labels);
        assert_eq!(args.save_dir, Some(PathBuf::from("sets")));
    }

    #[test]
    fn test_out_is_required() {
        assert!(Args::try_parse_from(["defectmark", "--image", "part.png"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_config(Some(Path::new("/nonexistent/defectmark.json")));
        assert!(matches!(result, Err(AppError::Config(ConfigError::Io { .. }))));
        assert!(load_config(None).is_ok());
    }

    #[test]
    fn test_stale_load_not_committed() {
        let mut session = Session::new();
        let stale = LoadOutcome::Superseded {
            generation: 1,
            source: "part.png".to_string(),
        };
        assert!(!commit_or_warn(&mut session, stale));
        assert!(session.image().is_none());
    }
}
