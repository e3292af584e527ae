//! twilight-boxart - box art for TWiLight Menu++
//!
//! Identifies ROMs by hash and drops 128x115 box art where TWiLight Menu++
//! looks for it.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use twilight_boxart::asset_key::AssetKeyBuilder;
use twilight_boxart::catalog::DatDirectory;
use twilight_boxart::config::{RunConfig, Settings, DAT_SUBDIR};
use twilight_boxart::console::Console;
use twilight_boxart::hash;
use twilight_boxart::http::HttpClient;
use twilight_boxart::pipeline::{self, CatalogContext};
use twilight_boxart::report::{PipelineReport, RenameStatus};
use twilight_boxart::resolver::{Resolver, DEFAULT_FUZZY_THRESHOLD};
use twilight_boxart::scan::{self, GameFile};

#[derive(Parser)]
#[command(name = "twilight-boxart")]
#[command(version)]
#[command(about = "Box art for TWiLight Menu++, matched by ROM hash")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify ROMs and fetch their box art
    Run {
        /// Directory containing ROMs (searched recursively)
        #[arg(short, long)]
        rom_dir: PathBuf,

        /// SD card root (defaults to the saved setting)
        #[arg(short, long, env = "TWILIGHT_SDCARD")]
        sdcard_dir: Option<PathBuf>,

        /// Rename identified ROMs to their No-Intro titles
        #[arg(long)]
        rename: bool,

        /// Write unresolved files and missing box art to FILE
        #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "errors.txt")]
        errors: Option<PathBuf>,

        /// Hashing threads (defaults to 1)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Minimum name similarity for the fuzzy fallback (0-1)
        #[arg(long)]
        fuzzy_threshold: Option<f64>,

        /// Only identify (and rename), do not download box art
        #[arg(long)]
        no_fetch: bool,

        /// Replace box art that already exists
        #[arg(long)]
        force: bool,

        /// Remember the SD card, jobs and threshold for later runs
        #[arg(long)]
        save_defaults: bool,
    },

    /// Print the SHA-1 used for catalog matching
    Hash {
        /// ROM files (.zip and .gz are unpacked)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Console id, when it cannot be detected (see `consoles`)
        #[arg(short, long)]
        console: Option<String>,
    },

    /// Resolve a single ROM and show its box art candidates
    Lookup {
        /// ROM file
        file: PathBuf,

        /// SD card root holding the DAT cache (defaults to the saved setting)
        #[arg(short, long, env = "TWILIGHT_SDCARD")]
        sdcard_dir: Option<PathBuf>,

        /// Console id, when it cannot be detected
        #[arg(short, long)]
        console: Option<String>,
    },

    /// List supported consoles
    Consoles,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(if cli.verbose {
                "twilight_boxart=debug".parse()?
            } else {
                "twilight_boxart=warn".parse()?
            }))
            .init();
    }

    let mut settings = Settings::load();

    match cli.command {
        Commands::Run {
            rom_dir,
            sdcard_dir,
            rename,
            errors,
            jobs,
            fuzzy_threshold,
            no_fetch,
            force,
            save_defaults,
        } => {
            let sdcard_dir = sdcard_dir
                .or_else(|| settings.sdcard_dir())
                .ok_or_else(|| anyhow!("No SD card given (--sdcard-dir or TWILIGHT_SDCARD)"))?;

            let mut config = RunConfig::new(rom_dir, sdcard_dir).with_settings(&settings);
            config.rename = rename;
            config.error_log = errors;
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            if let Some(threshold) = fuzzy_threshold {
                config.fuzzy_threshold = threshold;
            }
            config.fetch_artwork = !no_fetch;
            config.force = force;

            if save_defaults {
                config.validate()?;
                settings.sdcard_dir = config.sdcard_dir.to_string_lossy().into_owned();
                settings.jobs = Some(config.jobs);
                settings.fuzzy_threshold = Some(config.fuzzy_threshold);
                settings.save()?;
                println!("Saved defaults to {}", Settings::settings_path()?.display());
            }

            println!("twilight-boxart");
            println!("ROMs:       {}", config.rom_dir.display());
            println!("SD card:    {}", config.sdcard_dir.display());
            println!("Threads:    {}", config.jobs);
            if !config.fetch_artwork {
                println!("Box art:    disabled");
            }
            println!();

            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                    .unwrap()
                    .progress_chars("=>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));

            let report = pipeline::run_with_config(&config, pb.clone());
            pb.finish_and_clear();
            let report = report?;

            print_summary(&report, config.error_log.as_deref());
        }

        Commands::Hash { files, console } => {
            let forced = console.as_deref().map(parse_console).transpose()?;
            for path in &files {
                let console = forced
                    .or_else(|| detect_console(path))
                    .ok_or_else(|| anyhow!("Cannot detect console of {} (use --console)", path.display()))?;
                let digest = hash::hash_file(path, console)?;
                println!("{}  {}  {}", digest, console, path.display());
            }
        }

        Commands::Lookup {
            file,
            sdcard_dir,
            console,
        } => {
            let sdcard_dir = sdcard_dir
                .or_else(|| settings.sdcard_dir())
                .ok_or_else(|| anyhow!("No SD card given (--sdcard-dir or TWILIGHT_SDCARD)"))?;
            let console = match console.as_deref() {
                Some(id) => parse_console(id)?,
                None => detect_console(&file)
                    .ok_or_else(|| anyhow!("Cannot detect console of {} (use --console)", file.display()))?,
            };

            let game = GameFile {
                size: std::fs::metadata(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
                    .len(),
                path: file,
                console,
            };
            let digest = hash::hash_file(&game.path, console)?;

            let source = DatDirectory::with_download(
                sdcard_dir.join(DAT_SUBDIR),
                &settings.catalog_base_url,
                HttpClient::new()?,
            );
            let mut catalogs = CatalogContext::new(Box::new(source));
            let index = catalogs.get(console).map_err(|e| anyhow!("{}", e))?;

            let resolver = Resolver::new(settings.fuzzy_threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD));
            let identity = resolver.resolve(&game, &digest, index);

            println!("File:     {}", game.path.display());
            println!("Console:  {}", console.name());
            println!("SHA-1:    {}", digest);
            println!("Match:    {}", identity.kind);
            match &identity.title {
                Some(title) => println!("Title:    {}", title),
                None => {
                    println!("Title:    (unresolved)");
                    return Ok(());
                }
            }

            println!("\n=== Box Art Candidates ===");
            for key in AssetKeyBuilder.candidates(&identity)? {
                println!("  {}", key.url(&settings.thumbnail_base_url));
            }
        }

        Commands::Consoles => {
            println!("{:<6}  {:<22}  {}", "ID", "EXTENSIONS", "CATALOG");
            for console in Console::all() {
                let spec = console.spec();
                println!("{:<6}  {:<22}  {}", spec.id, spec.extensions.join(" "), spec.dat_name);
            }
        }
    }

    Ok(())
}

fn parse_console(id: &str) -> Result<Console> {
    Console::from_id(id).ok_or_else(|| anyhow!("Unknown console '{}' (see `twilight-boxart consoles`)", id))
}

fn detect_console(path: &Path) -> Option<Console> {
    let root = path.parent().unwrap_or(Path::new("."));
    scan::detect_console(root, path)
}

fn print_summary(report: &PipelineReport, error_log: Option<&Path>) {
    println!("=== Summary ===");
    println!("Processed:  {}", report.processed);
    println!(
        "Resolved:   {} ({} by hash, {} by name)",
        report.resolved(),
        report.resolved_exact,
        report.resolved_fuzzy
    );
    println!("Unresolved: {}", report.unresolved.len());
    if !report.errors.is_empty() {
        println!("Errors:     {}", report.errors.len());
    }
    println!(
        "Box art:    {} saved, {} already present, {} not found",
        report.artwork.saved, report.artwork.skipped_existing, report.artwork.not_found
    );

    let renamed = report
        .renames
        .iter()
        .filter(|r| matches!(r.status, RenameStatus::Renamed(_)))
        .count();
    if !report.renames.is_empty() {
        println!("Renamed:    {}", renamed);
    }

    for (console, reason) in &report.catalog_failures {
        println!("\nWARNING: {} catalog unavailable: {}", console.name(), reason);
    }

    if report.has_problems() {
        match error_log {
            Some(path) => println!("\nDetails written to {}", path.display()),
            None => println!("\nRun with --errors to write the details to a file."),
        }
    } else {
        println!("\nDone!");
    }
}
