//! The identify → resolve → box art pipeline.
//!
//! Files are hashed first (in parallel when more than one job is
//! configured), then resolved and processed one at a time in scan order.
//! Per-file problems are recorded in the [`PipelineReport`]; only setup
//! failures and broken internal invariants abort a run.

use crate::asset_key::AssetKeyBuilder;
use crate::catalog::{CatalogError, CatalogIndex, CatalogSource, DatDirectory};
use crate::config::RunConfig;
use crate::console::Console;
use crate::fetch::{ArtworkFetcher, HttpArtworkFetcher};
use crate::hash::{self, ChecksumDigest, HashError};
use crate::http::HttpClient;
use crate::rename::{self, FsRenamer, RenameDecision, Renamer};
use crate::report::{
    FileError, MissingArtwork, PipelineReport, RenameOutcome, RenameStatus, UnresolvedFile,
    UnresolvedReason,
};
use crate::resolver::{MatchKind, ResolvedIdentity, Resolver};
use crate::scan::{self, GameFile};
use crate::thumbnail::{self, PngThumbnailWriter, ThumbnailWriter, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Lazily loaded catalogs, one per console.
///
/// A console's catalog is loaded on the first file that needs it. A load
/// failure is remembered so the source is asked only once per run.
pub struct CatalogContext {
    source: Box<dyn CatalogSource>,
    indices: HashMap<Console, Result<CatalogIndex, CatalogError>>,
}

impl CatalogContext {
    pub fn new(source: Box<dyn CatalogSource>) -> Self {
        Self {
            source,
            indices: HashMap::new(),
        }
    }

    /// Catalog for `console`, loading it on first use.
    pub fn get(&mut self, console: Console) -> Result<&CatalogIndex, &CatalogError> {
        let source = &self.source;
        self.indices
            .entry(console)
            .or_insert_with(|| {
                let loaded = CatalogIndex::load(console, source.as_ref());
                match &loaded {
                    Ok(index) => info!("Loaded {} catalog ({} entries)", console, index.len()),
                    Err(e) => warn!("{}", e),
                }
                loaded
            })
            .as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub rename: bool,
    /// Replace existing box art
    pub force: bool,
    /// Hashing threads; 1 hashes on the calling thread
    pub jobs: usize,
    pub boxart_dir: PathBuf,
}

/// The side-effecting parts of a run.
pub struct Collaborators<'a> {
    /// `None` for a dry run (identify and rename only)
    pub fetcher: Option<&'a dyn ArtworkFetcher>,
    pub writer: &'a dyn ThumbnailWriter,
    pub renamer: &'a dyn Renamer,
}

pub struct Pipeline<'a> {
    resolver: Resolver,
    builder: AssetKeyBuilder,
    options: PipelineOptions,
    collaborators: Collaborators<'a>,
    progress: ProgressBar,
}

impl<'a> Pipeline<'a> {
    pub fn new(resolver: Resolver, options: PipelineOptions, collaborators: Collaborators<'a>) -> Self {
        Self {
            resolver,
            builder: AssetKeyBuilder,
            options,
            collaborators,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Process `files` in order.
    pub fn run(&self, files: &[GameFile], catalogs: &mut CatalogContext) -> Result<PipelineReport> {
        let digests = self.hash_all(files)?;
        let mut report = PipelineReport::default();

        self.progress.set_length(files.len() as u64);
        self.progress.set_position(0);
        self.progress.set_message("Resolving");

        for (file, digest) in files.iter().zip(digests) {
            report.processed += 1;
            self.process(file, digest, catalogs, &mut report)?;
            self.progress.inc(1);
        }

        info!(
            "Processed {} files: {} exact, {} fuzzy, {} unresolved, {} errors",
            report.processed,
            report.resolved_exact,
            report.resolved_fuzzy,
            report.unresolved.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Digests in `files` order.
    fn hash_all(&self, files: &[GameFile]) -> Result<Vec<Result<ChecksumDigest, HashError>>> {
        let progress = &self.progress;
        progress.set_length(files.len() as u64);
        progress.set_message("Hashing");

        let hash_one = |file: &GameFile| {
            let digest = hash::hash_file(&file.path, file.console);
            progress.inc(1);
            digest
        };

        if self.options.jobs <= 1 {
            return Ok(files.iter().map(hash_one).collect());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .thread_name(|idx| format!("hash-{idx}"))
            .build()
            .context("Failed to build hashing thread pool")?;

        Ok(pool.install(|| files.par_iter().map(hash_one).collect()))
    }

    fn process(
        &self,
        file: &GameFile,
        digest: Result<ChecksumDigest, HashError>,
        catalogs: &mut CatalogContext,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let digest = match digest {
            Ok(digest) => digest,
            Err(e) => {
                warn!("{}", e);
                report.errors.push(FileError {
                    path: file.path.clone(),
                    console: file.console,
                    message: e.to_string(),
                });
                return Ok(());
            }
        };

        let index = match catalogs.get(file.console) {
            Ok(index) => index,
            Err(e) => {
                if !report.catalog_failures.iter().any(|(c, _)| *c == file.console) {
                    report.catalog_failures.push((file.console, e.to_string()));
                }
                report.unresolved.push(UnresolvedFile {
                    path: file.path.clone(),
                    console: file.console,
                    reason: UnresolvedReason::CatalogUnavailable,
                });
                return Ok(());
            }
        };

        let identity = self.resolver.resolve(file, &digest, index);
        match identity.kind {
            MatchKind::ExactHash => report.resolved_exact += 1,
            MatchKind::FuzzyName => report.resolved_fuzzy += 1,
            MatchKind::Unresolved => {
                debug!("Unresolved: {} ({})", file.path.display(), digest);
                report.unresolved.push(UnresolvedFile {
                    path: file.path.clone(),
                    console: file.console,
                    reason: UnresolvedReason::NoMatch { digest },
                });
                return Ok(());
            }
        }

        let file_name = if self.options.rename {
            self.rename(file, &identity, report)
        } else {
            file.file_name()
        };

        if let Some(fetcher) = self.collaborators.fetcher {
            self.fetch_artwork(fetcher, &file_name, &digest, &identity, report)?;
        }
        Ok(())
    }

    /// Rename a resolved file. Returns the file name it ends up with.
    fn rename(&self, file: &GameFile, identity: &ResolvedIdentity, report: &mut PipelineReport) -> String {
        let status = match rename::rename_target(file, identity) {
            RenameDecision::Rename(target) => match self.collaborators.renamer.rename(&file.path, &target) {
                Ok(()) => {
                    info!("Renamed {} -> {}", file.file_name(), target.display());
                    RenameStatus::Renamed(target)
                }
                Err(e) => {
                    warn!("{:#}", e);
                    RenameStatus::Failed(format!("{:#}", e))
                }
            },
            RenameDecision::Unchanged => RenameStatus::Unchanged,
            RenameDecision::TargetExists(target) => {
                warn!(
                    "Not renaming {}: {} already exists",
                    file.path.display(),
                    target.display()
                );
                RenameStatus::TargetExists(target)
            }
            RenameDecision::NotEligible => return file.file_name(),
        };

        let file_name = match &status {
            RenameStatus::Renamed(target) => target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.file_name()),
            _ => file.file_name(),
        };

        report.renames.push(RenameOutcome {
            path: file.path.clone(),
            status,
        });
        file_name
    }

    /// Try each candidate key until one yields a usable image.
    fn fetch_artwork(
        &self,
        fetcher: &dyn ArtworkFetcher,
        file_name: &str,
        digest: &ChecksumDigest,
        identity: &ResolvedIdentity,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let dest = thumbnail::boxart_path(&self.options.boxart_dir, file_name);
        if !self.options.force && dest.exists() {
            debug!("Box art exists: {}", dest.display());
            report.artwork.skipped_existing += 1;
            return Ok(());
        }

        // Only resolved identities get here, so a key error is a bug.
        let candidates = self
            .builder
            .candidates(identity)
            .with_context(|| format!("No box art keys for {}", file_name))?;

        for key in &candidates {
            match fetcher.fetch(key) {
                Ok(Some(bytes)) => {
                    match self
                        .collaborators
                        .writer
                        .write(&bytes, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, &dest)
                    {
                        Ok(()) => {
                            debug!("Saved {} from {}", dest.display(), key);
                            report.artwork.saved += 1;
                            return Ok(());
                        }
                        Err(e) => warn!("Unusable image at {}: {:#}", key, e),
                    }
                }
                Ok(None) => debug!("No image at {}", key),
                Err(e) => warn!("Failed to fetch {}: {:#}", key, e),
            }
        }

        report.artwork.not_found += 1;
        report.missing_artwork.push(MissingArtwork {
            file_name: file_name.to_string(),
            digest: digest.clone(),
            title: identity.title.clone().unwrap_or_default(),
        });
        Ok(())
    }
}

/// Scan, resolve and fetch box art as configured, writing the error log
/// if one was requested.
pub fn run_with_config(config: &RunConfig, progress: ProgressBar) -> Result<PipelineReport> {
    config.validate()?;

    let files = scan::scan_directory(&config.rom_dir);
    info!("Found {} ROMs in {}", files.len(), config.rom_dir.display());

    let source = DatDirectory::with_download(config.dat_dir(), &config.catalog_base_url, HttpClient::new()?);
    let mut catalogs = CatalogContext::new(Box::new(source));

    let fetcher = if config.fetch_artwork {
        Some(HttpArtworkFetcher::new(HttpClient::new()?, &config.thumbnail_base_url))
    } else {
        None
    };

    let options = PipelineOptions {
        rename: config.rename,
        force: config.force,
        jobs: config.jobs,
        boxart_dir: config.boxart_dir(),
    };
    let collaborators = Collaborators {
        fetcher: fetcher.as_ref().map(|f| f as &dyn ArtworkFetcher),
        writer: &PngThumbnailWriter,
        renamer: &FsRenamer,
    };

    let pipeline = Pipeline::new(Resolver::new(config.fuzzy_threshold), options, collaborators)
        .with_progress(progress);
    let report = pipeline.run(&files, &mut catalogs)?;

    if let Some(path) = &config.error_log {
        report.save_error_log(path)?;
        info!("Wrote error log to {}", path.display());
    }

    Ok(report)
}
