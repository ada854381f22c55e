use clap::Parser;
use glob::glob;
use jpeg_baseline::writer::Writer;
use jpeg_baseline::{ColorKind, DecoderOptions, HuffmanKind, IdctKind, JpegDecoder, Logger};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[clap(name = "jpeg-baseline", about = "Decode baseline JPEG files")]
struct Cli {
    #[arg(required = true, help = "File path or glob pattern")]
    path: String,

    #[arg(short, long, value_parser = ["ppm", "pam", "png"], default_value = "ppm", help = "Output format")]
    format: String,

    #[arg(short = 'o', long = "output-dir", help = "Output directory for converted files")]
    output_dir: Option<String>,

    #[arg(long, default_value_t = HuffmanKind::default(), help = "Huffman decoder: tree or array")]
    huffman: HuffmanKind,

    #[arg(long, default_value_t = IdctKind::default(), help = "IDCT: naive, cached or chen-wang")]
    idct: IdctKind,

    #[arg(long, default_value_t = ColorKind::default(), help = "Color conversion: float or integer")]
    color: ColorKind,

    #[arg(long, help = "Skip damaged restart intervals instead of failing")]
    recover: bool,

    #[arg(long, help = "Print a summary of the file structure")]
    info: bool,

    #[arg(long, help = "Decode the image without writing to a file")]
    void: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More log output (-v, -vv, -vvv)")]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> DecoderOptions {
        DecoderOptions {
            huffman: self.huffman,
            idct: self.idct,
            color: self.color,
            recover_at_restart: self.recover,
        }
    }
}

fn get_files(path: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut files = Vec::new();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let absolute_pattern = if Path::new(path).is_relative() {
        base_dir.join(path).to_string_lossy().into_owned()
    } else {
        path.to_string()
    };

    for entry in glob(&absolute_pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }

    Ok(files)
}

fn get_output_path(file: &Path, output_dir: Option<&str>, format: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_stem = file
        .file_stem()
        .ok_or("Invalid file name")?
        .to_str()
        .ok_or("Invalid file stem")?;

    let output_path = match output_dir {
        Some(dir) => {
            let output_dir = Path::new(dir);
            if !output_dir.exists() {
                fs::create_dir_all(output_dir)?;
            }

            output_dir.join(format!("{}.{}", file_stem, format))
        }
        None => file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}.{}", file_stem, format)),
    };

    Ok(output_path)
}

fn process_file(file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("Decoding {}", file.display());

    let mut decoder = JpegDecoder::open(file, cli.options())?;

    if cli.info {
        let result = decoder.decode();
        println!("File: {}\n{}", file.display(), decoder.info());
        result?;
        return Ok(());
    }

    let image = decoder.decode()?;

    if cli.void {
        return Ok(());
    }

    let output_path = get_output_path(file, cli.output_dir.as_deref(), &cli.format)?;
    info!("Writing to {}", output_path.display());

    match cli.format.as_str() {
        "pam" => Writer::write_pam(&output_path, &image)?,
        "png" => Writer::write_png(&output_path, &image)?,
        _ => Writer::write_ppm(&output_path, &image)?,
    }

    Ok(())
}

fn report(file: &Path, cli: &Cli) -> bool {
    match process_file(file, cli) {
        Ok(()) => true,
        Err(err) => {
            error!("{}: {}", file.display(), err);
            false
        }
    }
}

#[cfg(feature = "rayon")]
fn process_all(files: &[PathBuf], cli: &Cli) -> usize {
    files.par_iter().filter(|file| !report(file, cli)).count()
}

#[cfg(not(feature = "rayon"))]
fn process_all(files: &[PathBuf], cli: &Cli) -> usize {
    files.iter().filter(|file| !report(file, cli)).count()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    Logger::init(Logger::level_from_verbosity(cli.verbose))?;

    let files = get_files(&cli.path)?;
    if files.is_empty() {
        error!("No files found matching pattern: {}", cli.path);
        std::process::exit(1);
    }

    let failed = process_all(&files, &cli);
    if failed > 0 {
        error!("{} of {} files failed", failed, files.len());
        std::process::exit(1);
    }

    Ok(())
}
