use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use lookup_engine::{
    aggregate_groups, assign_parent_paths, compile_lookups, find_duplicates, remove_rows,
    resolve_duplicates, ParentPathMap, PathFallback, ResolutionStrategy,
};
use lookup_model::{
    lookup_name, read_csv_file, write_lookup_file, write_rows_file, CsvOptions, RowTable,
};

#[derive(Parser, Debug)]
#[command(
    name = "lookup",
    about = "Duplicate resolution and lookup-table compilation over equipment/tag CSVs"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report every (group, key) pair that occurs more than once.
    Detect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        group_column: String,
        #[arg(long)]
        key_column: String,
    },
    /// Resolve duplicates and write the phase-one artifact.
    Resolve {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        group_column: String,
        #[arg(long)]
        key_column: String,
        /// Strategy name: keep_first, keep_last, remove_all, user_specific.
        #[arg(long)]
        strategy: Option<String>,
        /// Original-file row indices to keep (user_specific only; repeatable).
        #[arg(long = "keep-index")]
        keep_indices: Vec<usize>,
        /// Original-file row indices to drop explicitly instead of using a
        /// strategy (repeatable).
        #[arg(long = "remove-index", conflicts_with = "strategy")]
        remove_indices: Vec<usize>,
        /// Where to write the resolved table.
        #[arg(long)]
        output: PathBuf,
    },
    /// List the lookup entry names a resolved table will produce.
    Names {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        group_column: String,
    },
    /// Compile a resolved table into the final lookup CSV.
    Compile {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        group_column: String,
        #[arg(long)]
        key_column: String,
        #[arg(long)]
        value_column: String,
        /// JSON file mapping group names to parent paths.
        #[arg(long)]
        paths: Option<PathBuf>,
        /// Insert uncovered groups under "Root Asset" instead of reporting
        /// them as failures.
        #[arg(long)]
        root_fallback: bool,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Detect {
            input,
            group_column,
            key_column,
        } => detect(&input, &group_column, &key_column),
        Command::Resolve {
            input,
            group_column,
            key_column,
            strategy,
            keep_indices,
            remove_indices,
            output,
        } => resolve(
            &input,
            &group_column,
            &key_column,
            strategy.as_deref(),
            keep_indices,
            remove_indices,
            &output,
        ),
        Command::Names {
            input,
            group_column,
        } => names(&input, &group_column),
        Command::Compile {
            input,
            group_column,
            key_column,
            value_column,
            paths,
            root_fallback,
            output,
        } => compile(
            &input,
            &group_column,
            &key_column,
            &value_column,
            paths.as_deref(),
            root_fallback,
            &output,
        ),
    }
}

fn load_table(path: &std::path::Path) -> Result<RowTable> {
    read_csv_file(path, CsvOptions::default())
        .with_context(|| format!("read csv {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

fn detect(input: &std::path::Path, group_column: &str, key_column: &str) -> Result<()> {
    let table = load_table(input)?;
    let report = find_duplicates(&table, group_column, key_column)?;

    let clusters: Vec<_> = report
        .clusters
        .iter()
        .map(|c| {
            json!({
                "group": c.group,
                "key": c.key,
                "rows": c.rows.iter().map(|r| r.source_index()).collect::<Vec<_>>(),
            })
        })
        .collect();
    print_json(&json!({
        "duplicate_rows": report.row_count(),
        "clusters": clusters,
    }))
}

fn resolve(
    input: &std::path::Path,
    group_column: &str,
    key_column: &str,
    strategy: Option<&str>,
    keep_indices: Vec<usize>,
    remove_indices: Vec<usize>,
    output: &std::path::Path,
) -> Result<()> {
    let table = load_table(input)?;

    let resolved = match strategy {
        Some(name) => {
            let keep: BTreeSet<usize> = keep_indices.into_iter().collect();
            let strategy =
                ResolutionStrategy::parse(name, if keep.is_empty() { None } else { Some(keep) })?;
            resolve_duplicates(&table, group_column, key_column, &strategy)?
        }
        None if !remove_indices.is_empty() => {
            // Explicit review path: the operator names the rows to discard.
            table.require_columns(&[group_column, key_column])?;
            remove_rows(&table, &remove_indices.into_iter().collect())
        }
        None => bail!("either --strategy or --remove-index is required"),
    };

    write_rows_file(output, &resolved)
        .with_context(|| format!("write resolved table {}", output.display()))?;
    print_json(&json!({
        "input_rows": table.len(),
        "resolved_rows": resolved.len(),
        "output": output.display().to_string(),
    }))
}

fn names(input: &std::path::Path, group_column: &str) -> Result<()> {
    let table = load_table(input)?;
    table.require_columns(&[group_column])?;

    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for row in table.rows() {
        let group = table.value(row, group_column).unwrap_or_default();
        if seen.insert(group.to_string()) {
            names.push(lookup_name(group));
        }
    }
    print_json(&json!({ "lookup_names": names }))
}

fn compile(
    input: &std::path::Path,
    group_column: &str,
    key_column: &str,
    value_column: &str,
    paths: Option<&std::path::Path>,
    root_fallback: bool,
    output: &std::path::Path,
) -> Result<()> {
    let table = load_table(input)?;
    let groups = aggregate_groups(&table, group_column, key_column, value_column)?;
    let drafts = compile_lookups(&groups)?;

    let path_map: ParentPathMap = match paths {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read parent path map {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parse parent path map {}", path.display()))?
        }
        None => ParentPathMap::new(),
    };
    let fallback = if root_fallback {
        PathFallback::RootAsset
    } else {
        PathFallback::Strict
    };

    let assignment = assign_parent_paths(drafts, &path_map, fallback);
    write_lookup_file(output, &assignment.entries)
        .with_context(|| format!("write lookup table {}", output.display()))?;

    print_json(&json!({
        "groups": groups.len(),
        "entries": assignment.entries.len(),
        "failures": assignment.failures,
        "output": output.display().to_string(),
    }))
}
