use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "ppimg-rust",
    version,
    about = "Convert and maintain illustration markup in ppgen source files"
)]
struct Cli {
    /// Source file to process
    infile: Option<PathBuf>,

    /// Output file (default: <infile stem>-out.txt)
    outfile: Option<PathBuf>,

    /// Convert [Illustration] tags to .il/.ca statements
    #[arg(short = 'i', long = "illustrations")]
    illustrations: bool,

    /// Generate HTML boilerplate for .il/.ca statements with ppgen
    #[arg(short = 'b', long = "boilerplate")]
    boilerplate: bool,

    /// Update .il widths to match the image files
    #[arg(short = 'w', long = "update-widths")]
    update_widths: bool,

    /// Check illustrations against the image files
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Run without writing the output file
    #[arg(short = 'd', long = "dry-run")]
    dry_run: bool,

    /// Calculate target widths from % widths and record them in the width cache
    #[arg(long = "calcimagewidths")]
    calc_image_widths: bool,

    /// Maximum image width in pixels for --calcimagewidths
    #[arg(long = "maxwidth", value_name = "PIXELS")]
    max_width: Option<u32>,

    /// Print the target width recorded for an image (e.g. images/i_005.jpg)
    #[arg(long = "gettargetwidth", value_name = "IMAGE")]
    get_target_width: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ppimg_rust::logging::init(level)?;

    let config = ppimg_rust::Config {
        infile: cli.infile,
        outfile: cli.outfile,
        illustrations: cli.illustrations,
        boilerplate: cli.boilerplate,
        update_widths: cli.update_widths,
        calc_widths: cli.calc_image_widths,
        check: cli.check,
        dry_run: cli.dry_run,
        max_width: cli.max_width,
        target_width_of: cli.get_target_width,
        settings_path: cli.read_settings,
    };
    let output = ppimg_rust::run(config)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
