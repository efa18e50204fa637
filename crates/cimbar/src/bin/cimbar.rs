use clap::{Parser, Subcommand};
use cimbar::{decode_photo, io, TuningConfig};
use cimbar_crypto::strength_score;
use cimbar_render::render_payload;
use log::LevelFilter;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cimbar", version, about = "Color icon matrix barcode codec")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a barcode GIF or photo back into the original file
    Decode {
        /// Input image: an animated GIF or a single photo
        input: PathBuf,
        #[arg(short, long)]
        passphrase: String,
        /// Directory to write the recovered file into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode a file into rendered barcode frames, one PNG per frame
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        passphrase: String,
        /// Directory to write frame images into
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 256)]
        frame_size: u32,
    },
    /// Score a passphrase from 0 to 100
    Strength { passphrase: String },
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = cimbar_core::logger::init_with_level(level);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Decode {
            input,
            passphrase,
            output,
        } => decode(&input, &passphrase, output.as_deref()),
        Command::Encode {
            input,
            passphrase,
            output,
            frame_size,
        } => encode(&input, &passphrase, output.as_deref(), frame_size),
        Command::Strength { passphrase } => {
            println!("{}", strength_score(&passphrase));
            Ok(())
        }
    }
}

fn decode(input: &Path, passphrase: &str, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let is_gif = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("gif"))
        .unwrap_or(false);

    let result = if is_gif {
        let bytes = std::fs::read(input)?;
        io::decode_gif(&bytes, passphrase, &TuningConfig::default())?
    } else {
        let img = image::open(input)?.to_rgb8();
        let rgb = io::from_rgb8(&img);
        decode_photo(&rgb.view(), passphrase, &TuningConfig::camera())?
    };

    let dir = output.unwrap_or_else(|| Path::new("."));
    let path = dir.join(&result.filename);
    std::fs::write(&path, &result.data)?;
    println!("{} ({} bytes)", path.display(), result.data.len());
    Ok(())
}

fn encode(
    input: &Path,
    passphrase: &str,
    output: Option<&Path>,
    frame_size: u32,
) -> Result<(), Box<dyn Error>> {
    let filename = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("input path has no usable file name")?;
    let data = std::fs::read(input)?;

    let frames = render_payload(filename, &data, passphrase, frame_size)?;
    let dir = output.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    for (i, frame) in frames.iter().enumerate() {
        let img = io::to_rgb8(frame).ok_or("frame buffer conversion failed")?;
        let path = dir.join(format!("frame_{i:03}.png"));
        img.save(&path)?;
    }
    println!("{} frames of {frame_size}px written", frames.len());
    Ok(())
}
