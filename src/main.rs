//! hojear CLI - browse and serve tabular record datasets.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]

use std::{net::SocketAddr, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use hojear::{pivot, query, Dataset, PageRequest};

/// hojear - Paginated record browsing in Pure Rust
#[derive(Parser)]
#[command(name = "hojear")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a dataset over HTTP
    Serve {
        /// Path to the dataset file (json, jsonl, csv, xlsx)
        path: PathBuf,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Display dataset information
    Info {
        /// Path to the dataset file
        path: PathBuf,
    },
    /// Display the first N records of a dataset
    Head {
        /// Path to the dataset file
        path: PathBuf,
        /// Number of records to display
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
    },
    /// Run one page query and print the matching records as JSON
    Query {
        /// Path to the dataset file
        path: PathBuf,
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: usize,
        /// Records per page
        #[arg(long, default_value = "10")]
        page_size: usize,
        /// Column to filter on (requires --filter-value)
        #[arg(long, requires = "filter_value")]
        filter_column: Option<String>,
        /// Substring to filter for (requires --filter-column)
        #[arg(long, requires = "filter_column")]
        filter_value: Option<String>,
    },
    /// Group records by one column and total another
    Pivot {
        /// Path to the dataset file
        path: PathBuf,
        /// Column to group by
        row_column: String,
        /// Numeric column to total per group
        value_column: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { path, addr } => cmd_serve(&path, addr),
        Commands::Info { path } => cmd_info(&path),
        Commands::Head { path, rows } => cmd_head(&path, rows),
        Commands::Query {
            path,
            page,
            page_size,
            filter_column,
            filter_value,
        } => cmd_query(&path, page, page_size, filter_column, filter_value),
        Commands::Pivot {
            path,
            row_column,
            value_column,
        } => cmd_pivot(&path, &row_column, &value_column),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_serve(path: &PathBuf, addr: SocketAddr) -> hojear::Result<()> {
    let dataset = Dataset::from_path(path)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(hojear::Error::io_no_path)?
        .block_on(hojear::serve::run(dataset, addr))
}

fn cmd_info(path: &PathBuf) -> hojear::Result<()> {
    let dataset = Dataset::from_path(path)?;

    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("File: {}", path.display());
    println!("Records: {}", dataset.len());
    println!("Columns: {}", dataset.columns().len());
    for column in dataset.columns() {
        println!("  {}", column);
    }
    println!("Size: {} bytes", file_size);

    Ok(())
}

fn cmd_head(path: &PathBuf, rows: usize) -> hojear::Result<()> {
    let dataset = Dataset::from_path(path)?;

    if dataset.is_empty() {
        println!("Dataset is empty");
        return Ok(());
    }

    let shown = rows.min(dataset.len());
    for record in dataset.iter().take(shown) {
        println!("{}", serde_json::to_string(record)?);
    }

    if shown < dataset.len() {
        println!("... showing {} of {} records", shown, dataset.len());
    }

    Ok(())
}

fn cmd_query(
    path: &PathBuf,
    page: usize,
    page_size: usize,
    filter_column: Option<String>,
    filter_value: Option<String>,
) -> hojear::Result<()> {
    let dataset = Dataset::from_path(path)?;

    let mut request = PageRequest::new(page, page_size);
    if let (Some(column), Some(value)) = (filter_column, filter_value) {
        request = request.with_filter(column, value);
    }

    let result = query(&dataset, &request)?;
    println!("{}", serde_json::to_string_pretty(&result.records)?);
    eprintln!(
        "page {} of {} ({} matching records)",
        page,
        hojear::total_pages(result.total_count, page_size),
        result.total_count
    );

    Ok(())
}

fn cmd_pivot(path: &PathBuf, row_column: &str, value_column: &str) -> hojear::Result<()> {
    let dataset = Dataset::from_path(path)?;
    let rows = pivot(&dataset, row_column, value_column)?;

    println!("{:<30} {:>10} {:>14}", row_column, "count", value_column);
    for row in &rows {
        println!("{:<30} {:>10} {:>14.2}", row.key, row.count, row.total);
    }

    Ok(())
}
