//! panotile CLI - cut a row of panorama strips into DeepZoom tiles.

use clap::Parser;
use panotile::dzi::{DescriptorFormat, DziWriter};
use panotile::{EdgePolicy, FileSource, PanotileError, PixelFormat, PixelSource, Tiler, VirtualCanvas};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panotile", about = "Slice panoramic image strips into a DeepZoom tile pyramid")]
struct Args {
    /// Input images, left to right
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "tiles")]
    output: PathBuf,
    /// Base name of the descriptor and tile directory
    #[arg(long, default_value = "tiles")]
    name: String,
    /// Tile edge length in pixels
    #[arg(short, long, default_value_t = 256)]
    tile_size: u32,
    /// Overlap border in pixels around each tile
    #[arg(long, default_value_t = 0)]
    overlap: u32,
    /// Decoded pixel format: rgb, rgba
    #[arg(long, default_value = "rgb")]
    pixel_format: String,
    /// Edge tile policy: crop, pad
    #[arg(long, default_value = "crop")]
    edge: String,
    /// Encoding for emitted tiles: jpg, png
    #[arg(long, default_value = "jpg")]
    tile_format: String,
    /// Descriptor flavor: xml, json
    #[arg(long, default_value = "xml")]
    manifest: String,
}

fn main() -> Result<(), PanotileError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let pixel_format = match args.pixel_format.as_str() {
        "rgb" => PixelFormat::Rgb,
        "rgba" => PixelFormat::Rgba,
        other => fail(format!("unknown pixel format {other:?} (expected rgb or rgba)")),
    };
    let edge_policy = match args.edge.as_str() {
        "crop" => EdgePolicy::Crop,
        "pad" => EdgePolicy::Pad,
        other => fail(format!("unknown edge policy {other:?} (expected crop or pad)")),
    };
    let manifest = match args.manifest.as_str() {
        "xml" => DescriptorFormat::Xml,
        "json" => DescriptorFormat::Json,
        other => fail(format!("unknown manifest flavor {other:?} (expected xml or json)")),
    };
    if !matches!(args.tile_format.as_str(), "jpg" | "png") {
        fail(format!("unknown tile format {:?} (expected jpg or png)", args.tile_format));
    }
    if pixel_format == PixelFormat::Rgba && args.tile_format == "jpg" {
        fail("rgba tiles need an alpha-capable format; use --tile-format png".to_string());
    }

    let mut sources: Vec<Box<dyn PixelSource>> = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        sources.push(Box::new(FileSource::open(path, pixel_format)?));
    }
    let canvas = VirtualCanvas::new(sources)?;

    let tiler = Tiler::new(canvas)
        .with_tile_size(args.tile_size)
        .with_overlap(args.overlap)
        .with_edge_policy(edge_policy);

    let writer = DziWriter::create(&args.output, &args.name, &args.tile_format)?;
    tiler.run(&writer)?;
    let descriptor = tiler.descriptor(&args.tile_format);
    let path = writer.write_descriptor(&descriptor, manifest)?;
    tracing::info!(descriptor = %path.display(), "pyramid complete");
    Ok(())
}

fn fail(message: String) -> ! {
    clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("{message}\n")).exit()
}
