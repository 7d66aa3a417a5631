use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use draco_transcoder::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "draco-transcoder-cli")]
#[command(about = "Transcodes glTF scenes and applies Draco geometry compression settings")]
struct Cli {
    /// Input file path (.gltf or .glb), or `-` to read from stdin
    #[arg(short, long, required_unless_present = "print_config_schema")]
    input: Option<PathBuf>,

    /// Output file path (.gltf or .glb), or `-` to write glTF-Binary to stdout
    #[arg(short, long, required_unless_present = "print_config_schema")]
    output: Option<PathBuf>,

    /// Write the binary payload of a .gltf output to this file
    #[arg(long)]
    bin: Option<PathBuf>,

    /// Write images of a .gltf output to this directory (requires --bin)
    #[arg(long)]
    resource_dir: Option<PathBuf>,

    /// JSON file with compression options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compression level, 0 (fastest) to 10 (smallest)
    #[arg(long)]
    compression_level: Option<i32>,

    /// Position quantization bits
    #[arg(long, conflicts_with = "grid_spacing")]
    qp: Option<i32>,

    /// Normal quantization bits
    #[arg(long)]
    qn: Option<i32>,

    /// Texture coordinate quantization bits
    #[arg(long)]
    qt: Option<i32>,

    /// Color quantization bits
    #[arg(long)]
    qc: Option<i32>,

    /// Generic attribute quantization bits
    #[arg(long)]
    qg: Option<i32>,

    /// Tangent quantization bits
    #[arg(long)]
    qtg: Option<i32>,

    /// Joint weight quantization bits
    #[arg(long)]
    qw: Option<i32>,

    /// Quantize positions to a grid with this spacing instead of a bit count
    #[arg(long)]
    grid_spacing: Option<f32>,

    /// Print the JSON schema of the --config file and exit
    #[arg(long)]
    print_config_schema: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.print_config_schema {
        let schema = serde_json::to_string_pretty(&CompressionOptions::json_schema())?;
        println!("{}", schema);
        return Ok(());
    }

    let options = compression_options(&cli)?;
    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        anyhow::bail!("--input and --output are required");
    };
    let mut transcoder = DracoTranscoder::create(options).context("Invalid compression options")?;

    if is_stdio(input) || is_stdio(output) {
        if cli.bin.is_some() || cli.resource_dir.is_some() {
            tracing::warn!("--bin and --resource-dir are ignored when streaming");
        }
        transcode_streams(&mut transcoder, input, output)
    } else {
        let mut file_options = FileOptions::new(input, output);
        file_options.output_bin_filename = cli.bin.clone();
        file_options.output_resource_directory = cli.resource_dir.clone();
        transcoder
            .transcode(&file_options)
            .with_context(|| format!("Failed to transcode {}", input.display()))
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn compression_options(cli: &Cli) -> Result<CompressionOptions> {
    let mut options = match &cli.config {
        Some(path) => CompressionOptions::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CompressionOptions::default(),
    };
    if let Some(level) = cli.compression_level {
        options.compression_level = level;
    }
    if let Some(bits) = cli.qp {
        options.quantization_position = SpatialQuantization::Bits(bits);
    }
    if let Some(spacing) = cli.grid_spacing {
        options.quantization_position = SpatialQuantization::Grid { spacing };
    }
    let overrides = [
        (cli.qn, &mut options.quantization_bits_normal),
        (cli.qt, &mut options.quantization_bits_tex_coord),
        (cli.qc, &mut options.quantization_bits_color),
        (cli.qg, &mut options.quantization_bits_generic),
        (cli.qtg, &mut options.quantization_bits_tangent),
        (cli.qw, &mut options.quantization_bits_weight),
    ];
    for (value, field) in overrides {
        if let Some(bits) = value {
            *field = bits;
        }
    }
    Ok(options)
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

// Stream mode always produces glTF-Binary.
fn transcode_streams(transcoder: &mut DracoTranscoder, input: &Path, output: &Path) -> Result<()> {
    if !is_stdio(output) && !output.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("glb")) {
        anyhow::bail!("Streamed output is glTF-Binary; use a .glb output file");
    }

    let mut source: Box<dyn ByteSource> = if is_stdio(input) {
        let mut bytes = Vec::new();
        std::io::stdin().lock().read_to_end(&mut bytes).context("Failed to read stdin")?;
        Box::new(MemoryEndpoint::from(bytes))
    } else {
        Box::new(FileEndpoint::open(input).with_context(|| format!("Failed to open {}", input.display()))?)
    };

    if is_stdio(output) {
        let mut sink = MemoryEndpoint::new();
        transcoder.transcode_endpoints(source.as_mut(), &mut sink)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(sink.as_bytes()).context("Failed to write stdout")?;
        stdout.flush()?;
    } else {
        // Refuses to overwrite an existing non-empty file.
        let mut sink = FileEndpoint::open_for_write(output)
            .with_context(|| format!("Failed to open {}", output.display()))?;
        transcoder
            .transcode_endpoints(source.as_mut(), &mut sink)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }
    Ok(())
}
