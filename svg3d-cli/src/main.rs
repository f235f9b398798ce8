//! svg3d - render a JSON box scene to SVG
//!
//! Reads a scene document, renders it and writes the SVG to a file or stdout.
//! Render options come from an optional JSON file; flags override it field by field.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use svg3d_core::{render_scene, Color, GridPlane, MeshCache, RenderOptions, Scene};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "svg3d")]
#[command(about = "Render a declarative 3D box scene to SVG")]
struct Cli {
    /// Scene document (JSON)
    scene: PathBuf,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render options document (JSON)
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Background color, e.g. "white" or "#202020"
    #[arg(long)]
    background: Option<String>,

    /// Draw the ground grid
    #[arg(long)]
    grid: bool,

    #[arg(long, value_enum)]
    grid_plane: Option<PlaneArg>,

    #[arg(long)]
    grid_cell: Option<f64>,

    /// Draw the axes gizmo
    #[arg(long)]
    axes: bool,

    /// Draw the origin crosshair
    #[arg(long)]
    origin: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlaneArg {
    Xy,
    Yz,
    Xz,
}

impl From<PlaneArg> for GridPlane {
    fn from(plane: PlaneArg) -> Self {
        match plane {
            PlaneArg::Xy => GridPlane::Xy,
            PlaneArg::Yz => GridPlane::Yz,
            PlaneArg::Xz => GridPlane::Xz,
        }
    }
}

impl Cli {
    fn render_options(&self) -> Result<RenderOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let text = read(path)?;
                RenderOptions::from_json(&text)
                    .with_context(|| format!("invalid options document {}", path.display()))?
            }
            None => RenderOptions::default(),
        };
        self.apply_overrides(&mut options);
        Ok(options)
    }

    fn apply_overrides(&self, options: &mut RenderOptions) {
        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if let Some(background) = &self.background {
            options.background_color = Some(Color::Literal(background.clone()));
        }
        if let Some(plane) = self.grid_plane {
            options.grid.plane = plane.into();
        }
        if let Some(cell) = self.grid_cell {
            options.grid.cell_size = cell;
        }
        options.show_grid |= self.grid;
        options.show_axes |= self.axes;
        options.show_origin |= self.origin;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let text = read(&cli.scene)?;
    let scene = Scene::from_json(&text)
        .with_context(|| format!("invalid scene document {}", cli.scene.display()))?;
    let options = cli.render_options()?;

    let cache = MeshCache::new();
    let svg = render_scene(&scene, &options, &cache).context("render failed")?;
    info!(boxes = scene.boxes.len(), meshes = cache.len(), bytes = svg.len(), "rendered scene");

    match &cli.output {
        Some(path) => {
            fs::write(path, &svg).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "SVG written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(svg.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Log to stderr so SVG on stdout stays clean
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
