//! docxgrep - search, audit, and rewrite .docx documents
//!
//! Usage:
//!   docxgrep scan <dir>                         List documents under a directory
//!   docxgrep analyze <file>                     Hyperlinks and track-changes status
//!   docxgrep links <dir>                        Extract hyperlinks across a tree
//!   docxgrep find <dir> <query>                 Find text across a tree
//!   docxgrep replace <dir> <query> <new>        Replace text, backup-first
//!   docxgrep find-links <dir> <query>           Find in link text/URLs
//!   docxgrep replace-links <dir> <old> <new>    Rewrite link text/URLs
//!   docxgrep deps <dir>                         Cross-document dependency graph

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docxgrep::bulk::{BulkOptions, DEFAULT_CONCURRENCY, Operation, run_bulk};
use docxgrep::document::{LinkTarget, MatchMode, MatchResult};
use docxgrep::graph::build_dependency_graph;
use docxgrep::{ops, scan};

#[derive(Parser)]
#[command(
    name = "docxgrep",
    version,
    about = "Search, audit, and rewrite .docx documents"
)]
struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the .docx files under a directory
    Scan { root: PathBuf },

    /// Report hyperlinks and track-changes status for one document
    Analyze { file: PathBuf },

    /// Extract hyperlinks from every document under a directory
    Links { root: PathBuf },

    /// Find text in document bodies across a tree
    Find {
        root: PathBuf,
        query: String,
        /// Match case exactly instead of ignoring it
        #[arg(long)]
        case_sensitive: bool,
        /// Treat the query as a regular expression
        #[arg(long)]
        regex: bool,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Replace text in document bodies across a tree, backup-first
    Replace {
        root: PathBuf,
        query: String,
        replacement: String,
        #[arg(long)]
        case_sensitive: bool,
        /// Skip the pre-write backup
        #[arg(long)]
        no_backup: bool,
        /// Where backups go (defaults to bulk_found on the desktop)
        #[arg(long)]
        backup_root: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Find within hyperlink text and/or URLs across a tree
    FindLinks {
        root: PathBuf,
        query: String,
        /// Which side of each link to search
        #[arg(long, value_enum, default_value = "both")]
        target: LinkTarget,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Replace within hyperlink text and/or URLs across a tree, backup-first
    ReplaceLinks {
        root: PathBuf,
        query: String,
        replacement: String,
        #[arg(long, value_enum, default_value = "both")]
        target: LinkTarget,
        #[arg(long)]
        no_backup: bool,
        #[arg(long)]
        backup_root: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Build the cross-document link dependency graph for a tree
    Deps { root: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan { root } => {
            let files = scan::scan(&root);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                for file in &files {
                    println!("{}", file.display());
                }
                eprintln!("{} document(s)", files.len());
            }
        }
        Command::Analyze { file } => {
            let analysis = ops::analyze(&file)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                let tc = &analysis.track_changes;
                println!(
                    "track changes: {} marker(s), tracking {}",
                    tc.revision_count,
                    if tc.tracking_enabled { "on" } else { "off" }
                );
                println!("{} hyperlink(s):", analysis.links.len());
                for link in &analysis.links {
                    println!(
                        "  [{:?}] {:?} -> {}",
                        link.kind,
                        link.text,
                        link.url.as_deref().unwrap_or("<unresolved>")
                    );
                }
            }
        }
        Command::Links { root } => {
            let reports = ops::collect_links(&root);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    if let Some(err) = &report.error {
                        eprintln!("{}: error: {err}", report.path.display());
                        continue;
                    }
                    for link in &report.links {
                        println!(
                            "{}: {:?} -> {}",
                            report.path.display(),
                            link.text,
                            link.url.as_deref().unwrap_or("<unresolved>")
                        );
                    }
                }
            }
        }
        Command::Find {
            root,
            query,
            case_sensitive,
            regex,
            concurrency,
        } => {
            let op = Operation::FindText {
                query,
                case_sensitive,
                mode: if regex {
                    MatchMode::Pattern
                } else {
                    MatchMode::Literal
                },
            };
            let options = BulkOptions {
                concurrency,
                ..BulkOptions::default()
            };
            let results = run_bulk(&root, op, options).await?;
            print_results(&results, cli.json)?;
        }
        Command::Replace {
            root,
            query,
            replacement,
            case_sensitive,
            no_backup,
            backup_root,
            concurrency,
        } => {
            let op = Operation::ReplaceText {
                query,
                replacement,
                case_sensitive,
            };
            let options = BulkOptions {
                concurrency,
                backup: !no_backup,
                backup_root,
                ..BulkOptions::default()
            };
            let results = run_bulk(&root, op, options).await?;
            print_results(&results, cli.json)?;
        }
        Command::FindLinks {
            root,
            query,
            target,
            concurrency,
        } => {
            let op = Operation::FindLinks { query, target };
            let options = BulkOptions {
                concurrency,
                ..BulkOptions::default()
            };
            let results = run_bulk(&root, op, options).await?;
            print_results(&results, cli.json)?;
        }
        Command::ReplaceLinks {
            root,
            query,
            replacement,
            target,
            no_backup,
            backup_root,
            concurrency,
        } => {
            let op = Operation::ReplaceLinks {
                query,
                replacement,
                target,
            };
            let options = BulkOptions {
                concurrency,
                backup: !no_backup,
                backup_root,
                ..BulkOptions::default()
            };
            let results = run_bulk(&root, op, options).await?;
            print_results(&results, cli.json)?;
        }
        Command::Deps { root } => {
            let graph = build_dependency_graph(&root)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                for (path, node) in &graph.nodes {
                    println!(
                        "{} ({} link(s), {} incoming)",
                        path.display(),
                        node.total_links,
                        node.incoming_count
                    );
                    for edge in &node.outgoing {
                        println!("  -> {} (x{})", edge.to.display(), edge.link_count);
                    }
                }
                for (path, err) in &graph.errors {
                    eprintln!("{}: error: {err}", path.display());
                }
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(results: &[MatchResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    let mut matched = 0usize;
    let mut failed = 0usize;
    for result in results {
        if let Some(err) = &result.error {
            eprintln!("{}: error: {err}", result.file_path.display());
            failed += 1;
            continue;
        }
        if result.match_count == 0 {
            continue;
        }
        matched += 1;
        println!(
            "{}: {} match(es){}",
            result.file_path.display(),
            result.match_count,
            if result.was_modified { ", modified" } else { "" }
        );
        for snippet in &result.snippets {
            println!("  [{}] {}", snippet.location, snippet.text);
        }
        if let Some(backup) = &result.backup_path {
            println!("  backup: {}", backup.display());
        }
    }
    eprintln!(
        "{matched} file(s) matched, {failed} failed, {} processed",
        results.len()
    );
    Ok(())
}
