//! Mesh slicer CLI
//!
//! Usage:
//!   mesh-slicer slice <input.stl> -o <layers.json> [--layer-height 0.2] [--mode regular]
//!   mesh-slicer slice <input.stl> --config params.json
//!   mesh-slicer slabs <input.stl> --z 1.0 --z 2.5 -o <slabs.json>
//!   mesh-slicer cut <input.stl> --z 12.5 --upper top.stl --lower bottom.stl
//!   mesh-slicer project <input.stl> -o <outline.json>
//!   mesh-slicer info <input.stl>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use slicer::geometry::Transform3D;
use slicer::mesh::{load_stl, save_stl};
use slicer::slice::{cut_mesh, project_mesh, slice_mesh_slabs, Slicer, SlicingMode, SlicingParams};
use slicer::TriangleMesh;
use std::fs;
use std::path::{Path, PathBuf};

/// Slice triangle meshes into planar layers, slab outlines and cut halves
#[derive(Parser, Debug)]
#[command(name = "mesh-slicer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of threads to use (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice an STL file into layers and write them as JSON
    Slice {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output JSON file (defaults to the input with a .json extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Slicing parameters (JSON format) - overrides the options below
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Layer height in mm
        #[arg(long, default_value = "0.2")]
        layer_height: f64,

        /// First layer height in mm
        #[arg(long, default_value = "0.2")]
        first_layer_height: f64,

        /// Slicing mode (regular, even-odd, positive, positive-largest-contour)
        #[arg(long, default_value = "regular")]
        mode: String,

        /// Morphological closing radius in mm
        #[arg(long, default_value = "0")]
        closing_radius: f64,

        /// Contour simplification resolution in mm (0 = off)
        #[arg(long, default_value = "0")]
        resolution: f64,
    },

    /// Outline of the up and down facing surface between planes
    Slabs {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Plane height in mm, repeat for several planes
        #[arg(long = "z", required = true)]
        zs: Vec<f64>,

        /// Output JSON file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Only extract the up facing slabs
        #[arg(long, conflicts_with = "bottom_only")]
        top_only: bool,

        /// Only extract the down facing slabs
        #[arg(long)]
        bottom_only: bool,
    },

    /// Cut an STL file in two at a plane
    Cut {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Plane height in mm
        #[arg(long)]
        z: f64,

        /// Output STL file for the part above the plane
        #[arg(long, value_name = "UPPER")]
        upper: Option<PathBuf>,

        /// Output STL file for the part below the plane
        #[arg(long, value_name = "LOWER")]
        lower: Option<PathBuf>,

        /// Leave the cut faces open
        #[arg(long)]
        no_caps: bool,
    },

    /// Outline of the whole mesh seen from above
    Project {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Display information about an STL file
    Info {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    match cli.command {
        Commands::Slice {
            input,
            output,
            config,
            layer_height,
            first_layer_height,
            mode,
            closing_radius,
            resolution,
        } => {
            let params = match config {
                Some(path) => {
                    info!("Loading slicing parameters from: {}", path.display());
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    SlicingParams::from_json(&json).context("Invalid slicing parameters")?
                }
                None => SlicingParams::new()
                    .layer_height(layer_height)
                    .first_layer_height(first_layer_height)
                    .mode(parse_mode(&mode)?)
                    .closing_radius(closing_radius)
                    .resolution(resolution),
            };
            cmd_slice(&input, output, params)
        }
        Commands::Slabs {
            input,
            zs,
            output,
            top_only,
            bottom_only,
        } => cmd_slabs(&input, zs, output, !bottom_only, !top_only),
        Commands::Cut {
            input,
            z,
            upper,
            lower,
            no_caps,
        } => cmd_cut(&input, z, upper, lower, !no_caps),
        Commands::Project { input, output } => cmd_project(&input, output),
        Commands::Info { input } => cmd_info(&input),
    }
}

fn parse_mode(mode: &str) -> Result<SlicingMode> {
    Ok(match mode.to_lowercase().as_str() {
        "regular" => SlicingMode::Regular,
        "even-odd" | "evenodd" => SlicingMode::EvenOdd,
        "positive" => SlicingMode::Positive,
        "positive-largest-contour" | "largest" => SlicingMode::PositiveLargestContour,
        other => bail!("Unknown slicing mode '{}'", other),
    })
}

fn load(input: &Path) -> Result<TriangleMesh> {
    info!("Loading STL file: {}", input.display());
    let mesh = load_stl(input).context("Failed to load STL file")?;
    info!("  Triangles: {}", mesh.triangle_count());
    Ok(mesh)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize output")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn cmd_slice(input: &Path, output: Option<PathBuf>, params: SlicingParams) -> Result<()> {
    let mesh = load(input)?;
    let output_path = output.unwrap_or_else(|| input.with_extension("json"));

    let slicer = Slicer::new(params);
    let mut last_reported = 0.0;
    let layers = slicer
        .slice_with_callback(
            &mesh,
            |progress| {
                if progress - last_reported >= 0.25 || progress >= 1.0 {
                    info!("  {:.0}%", progress * 100.0);
                    last_reported = progress;
                }
            },
            || false,
        )
        .context("Slicing failed")?;

    println!("Sliced {} layers", layers.len());
    write_json(&output_path, &layers)
}

fn cmd_slabs(input: &Path, mut zs: Vec<f64>, output: Option<PathBuf>, top: bool, bottom: bool) -> Result<()> {
    let mesh = load(input)?;
    zs.sort_by(f64::total_cmp);
    let output_path = output.unwrap_or_else(|| input.with_extension("slabs.json"));

    let slabs = slice_mesh_slabs(&mesh, &zs, &Transform3D::default(), top, bottom, || false)
        .context("Slab projection failed")?;
    println!(
        "{} top and {} bottom outlines over {} planes",
        slabs.top.iter().map(Vec::len).sum::<usize>(),
        slabs.bottom.iter().map(Vec::len).sum::<usize>(),
        zs.len()
    );
    write_json(&output_path, &slabs)
}

fn cmd_cut(input: &Path, z: f64, upper: Option<PathBuf>, lower: Option<PathBuf>, caps: bool) -> Result<()> {
    if upper.is_none() && lower.is_none() {
        bail!("Nothing to do: pass --upper and/or --lower");
    }
    let mesh = load(input)?;
    let result = cut_mesh(&mesh, z, upper.is_some(), lower.is_some(), caps).context("Cut failed")?;

    for (path, half, name) in [(upper, result.upper, "upper"), (lower, result.lower, "lower")] {
        if let (Some(path), Some(half)) = (path, half) {
            println!(
                "{}: {} triangles, volume {:.3} mm³",
                name,
                half.triangle_count(),
                half.volume()
            );
            save_stl(&path, &half).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    Ok(())
}

fn cmd_project(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let mesh = load(input)?;
    let output_path = output.unwrap_or_else(|| input.with_extension("outline.json"));
    let outline = project_mesh(&mesh, &Transform3D::default(), || false).context("Projection failed")?;
    println!("Outline of {} polygons", outline.len());
    write_json(&output_path, &outline)
}

fn cmd_info(input: &Path) -> Result<()> {
    let mesh = load(input)?;
    let bb = mesh.bounding_box();
    let size = bb.size();

    println!("Mesh Information:");
    println!("  File: {}", input.display());
    println!("  Vertices: {}", mesh.vertex_count());
    println!("  Triangles: {}", mesh.triangle_count());
    println!("  Bounding box:");
    println!("    Min: ({:.3}, {:.3}, {:.3}) mm", bb.min.x, bb.min.y, bb.min.z);
    println!("    Max: ({:.3}, {:.3}, {:.3}) mm", bb.max.x, bb.max.y, bb.max.z);
    println!("    Size: {:.3} x {:.3} x {:.3} mm", size.x, size.y, size.z);
    println!("  Volume: {:.2} mm³", mesh.volume());
    println!("  Surface area: {:.2} mm²", mesh.surface_area());
    println!(
        "  Open edges: {}",
        slicer::mesh::topology::num_open_edges(&slicer::mesh::topology::face_neighbors(&mesh))
    );
    Ok(())
}
