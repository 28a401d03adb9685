//! Main entry point for the runxar CLI application.
//!
//! This binary provides a command-line interface for listing and extracting
//! XAR members from both local filesystem and remote HTTP URLs.

use anyhow::Result;
use clap::Parser;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use runxar::{
    Cli, HttpRangeReader, LocalFileReader, ManifestEntry, RemoteXar, XarArchive, XarIndex,
};

/// Either kind of opened archive, with its index already read.
enum Archive<'a> {
    Local(&'a XarArchive<LocalFileReader>),
    Remote(&'a RemoteXar<HttpRangeReader>, &'a XarIndex),
}

impl Archive<'_> {
    fn index(&self) -> &XarIndex {
        match self {
            Archive::Local(archive) => archive.index(),
            Archive::Remote(_, index) => index,
        }
    }

    async fn read(&self, entry: &ManifestEntry) -> runxar::Result<Vec<u8>> {
        match self {
            Archive::Local(archive) => archive.extract_entry(entry).await,
            Archive::Remote(remote, index) => {
                Ok(remote.extract_entry(index, entry).await?.to_vec())
            }
        }
    }
}

/// Application entry point.
///
/// Parses command-line arguments and dispatches to the appropriate handler
/// based on whether the input is a local file or HTTP URL.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level());

    if cli.is_http_url() {
        // The table of contents is fetched once and reused for every member
        let config = cli.fetch_config();
        let reader = Arc::new(HttpRangeReader::new(cli.file.clone(), &config)?);
        let remote = RemoteXar::new(reader.clone(), config.retry.clone());
        let index = remote.fetch_toc().await?;

        process_xar(&Archive::Remote(&remote, &index), &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
    } else {
        let archive = XarArchive::open_path(Path::new(&cli.file)).await?;
        process_xar(&Archive::Local(&archive), &cli).await?;
    }

    Ok(())
}

/// Install a stderr subscriber; `RUST_LOG` overrides the CLI-derived level.
fn setup_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// List or extract, depending on CLI options.
async fn process_xar(archive: &Archive<'_>, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        list_members(archive.index(), cli.verbose);
        return Ok(());
    }

    // Requested names must all exist; with none requested, take every entry
    let index = archive.index();
    let selected: Vec<&ManifestEntry> = if cli.members.is_empty() {
        index.entries().iter().collect()
    } else {
        cli.members
            .iter()
            .map(|name| {
                index
                    .manifest
                    .lookup(name)
                    .ok_or_else(|| runxar::XarError::MemberNotFound(name.clone()))
            })
            .collect::<runxar::Result<_>>()?
    };

    let multiple = cli.pipe && selected.len() > 1;
    for entry in selected {
        extract_member(archive, entry, cli, multiple).await?;
    }

    Ok(())
}

/// Print the manifest, one member per line or as a table.
fn list_members(index: &XarIndex, verbose: bool) {
    if !verbose {
        for entry in index.entries() {
            println!("{}", entry.name);
        }
        return;
    }

    println!(
        "{:>12}  {:>10}  {:>10}  {:<24}  Name",
        "Offset", "Size", "Length", "Encoding"
    );
    println!("{}", "-".repeat(72));

    let mut total_size = 0u64;
    for entry in index.entries() {
        let offset = index
            .location
            .member_location(entry)
            .map(|loc| loc.absolute_offset.to_string())
            .unwrap_or_else(|_| "?".to_string());
        let length = entry
            .length
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>12}  {:>10}  {:>10}  {:<24}  {}",
            offset,
            entry.data_size,
            length,
            entry.encoding.as_deref().unwrap_or("-"),
            entry.name
        );
        total_size += entry.data_size;
    }

    println!("{}", "-".repeat(72));
    println!(
        "{:>12}  {:>10}  {:>10}  {:<24}  {} members",
        "",
        total_size,
        "",
        "",
        index.entries().len()
    );
}

/// Extract a single member to a file or stdout.
async fn extract_member(
    archive: &Archive<'_>,
    entry: &ManifestEntry,
    cli: &Cli,
    show_name: bool,
) -> Result<()> {
    if cli.pipe {
        let data = archive.read(entry).await?;
        let mut stdout = tokio::io::stdout();
        if show_name {
            stdout
                .write_all(format!("--- {} ---\n", entry.name).as_bytes())
                .await?;
        }
        stdout.write_all(&data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let Some(relative) = safe_relative_path(&entry.name) else {
        if !cli.is_very_quiet() {
            eprintln!("Skipping: {} (unsafe path)", entry.name);
        }
        return Ok(());
    };
    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(relative),
        None => relative,
    };

    // Handle existing files based on overwrite options
    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", entry.name);
            }
            return Ok(());
        }
        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.name);
    }

    let data = archive.read(entry).await?;
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::File::create(&output_path).await?;
    file.write_all(&data).await?;

    Ok(())
}

/// Member names become paths only when they stay below the output directory.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (safe && path.components().next().is_some()).then(|| path.to_path_buf())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
