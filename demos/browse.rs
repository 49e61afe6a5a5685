//! Lists a directory through the tracker browser engine.
//!
//! Usage: `browse [DIR] [--pattern PATS] [--all] [--page N]`
//!
//! Set `RUST_LOG=tracker_browser=debug` to see scan and cache events.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracker_browser::{BrowserConfig, BrowserSession, EntryType, FileEntry, FormatFamily};

struct Args {
    dir: PathBuf,
    patterns: Option<String>,
    all: bool,
    page: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        dir: std::env::current_dir().context("reading current directory")?,
        patterns: None,
        all: false,
        page: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--pattern" => {
                args.patterns = Some(it.next().context("--pattern needs a value")?);
            }
            "--all" => args.all = true,
            "--page" => {
                let n = it.next().context("--page needs a value")?;
                let n: usize = n
                    .parse()
                    .with_context(|| format!("invalid page size {n:?}"))?;
                if n == 0 {
                    bail!("page size must be at least 1");
                }
                args.page = Some(n);
            }
            "-h" | "--help" => {
                println!("Usage: browse [DIR] [--pattern PATS] [--all] [--page N]");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            dir => args.dir = PathBuf::from(dir),
        }
    }
    Ok(args)
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tracker_browser=info,tracker_formats=info,warn".into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let mut config = BrowserConfig::default().show_hidden(args.all);
    if let Some(rows) = args.page {
        config = config.page_size(rows);
    }
    if let Some(patterns) = &args.patterns {
        config = config.default_patterns(patterns.clone());
    }

    let mut session = BrowserSession::with_std_fs(
        tracker_formats::format_table(),
        tracker_formats::probe_table(),
        config,
    );
    let mut page = session.new_page(&args.dir);
    session.activate(&mut page);

    println!("{}", page.cwd().display());
    if let Some(err) = page.last_error() {
        eprintln!("warning: {err}");
    }
    if !page.filter().is_empty() {
        println!("filter: {}", page.filter().source());
    }

    let list = page.list();
    for entry in list.visible_entries() {
        println!("{}", format_row(entry));
    }
    let shown = list.visible_entries().len();
    if shown < list.len() {
        println!("... {} more", list.len() - shown);
    }
    tracing::debug!(stats = ?session.cache().stats(), "done");
    Ok(())
}

fn format_row(e: &FileEntry) -> String {
    let kind = match e.entry_type() {
        EntryType::Directory => "dir",
        EntryType::Unchecked => "?",
        EntryType::Unknown => "",
        EntryType::Extended(FormatFamily::Sample) => "sample",
        EntryType::Extended(FormatFamily::Module) => "module",
        EntryType::Extended(FormatFamily::Library) => "library",
    };
    let size = if e.is_dir() {
        String::new()
    } else {
        format_size(e.size())
    };
    let mut row = format!(
        "{:<32} {:>9}  {:<16}  {:<7}",
        e.base_name(),
        size,
        format_modified(e.modified()),
        kind
    );
    if let Some(meta) = e.metadata() {
        if let Some(title) = &meta.title {
            row.push_str(&format!("  \"{title}\""));
        }
        if let Some(desc) = &meta.description {
            row.push_str(&format!("  {desc}"));
        }
        if let Some(s) = &meta.sample {
            row.push_str(&format!("  [{} frames @ {} Hz]", s.length, s.c5_speed));
        }
    }
    row
}

fn format_size(size: u64) -> String {
    match size {
        0..1024 => format!("{size} B"),
        1024..1_048_576 => format!("{:.1} KB", size as f64 / 1024.0),
        _ => format!("{:.1} MB", size as f64 / 1_048_576.0),
    }
}

fn format_modified(modified: Option<std::time::SystemTime>) -> String {
    use chrono::{DateTime, Local};
    match modified {
        Some(m) => DateTime::<Local>::from(m).format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("browse: {e:#}");
        std::process::exit(1);
    }
}
