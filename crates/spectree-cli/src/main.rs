//! `spectree` - inspect a docstring registry

mod config;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use spectree_core::LexicalIndex;
use spectree_docstring::ContentHash;
use spectree_registry::Registry;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("spectree")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect a Spectree docstring registry")
        .subcommand_required(true)
        .arg(
            Arg::new("registry")
                .long("registry")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Registry root directory"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config with a [registry] section"),
        )
        .subcommand(
            Command::new("show")
                .about("Print a stored docstring and its edges")
                .arg(Arg::new("hash").required(true).help("Docstring hash")),
        )
        .subcommand(
            Command::new("tree")
                .about("Print the dependency tree below a docstring as JSON")
                .arg(Arg::new("hash").required(true).help("Root docstring hash")),
        )
        .subcommand(
            Command::new("similar")
                .about("List stored docstrings lexically closest to a text")
                .arg(Arg::new("text").required(true).help("Query text"))
                .arg(
                    Arg::new("k")
                        .short('k')
                        .value_parser(value_parser!(usize))
                        .help("Number of neighbors (defaults to the configured neighbor_count)"),
                ),
        )
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn hash_arg(args: &ArgMatches) -> Result<ContentHash> {
    let hash = args.get_one::<String>("hash").context("missing hash")?;
    hash.parse::<ContentHash>()
        .with_context(|| format!("not a docstring hash: {hash}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = cli().get_matches();

    let (registry_config, decompose) = config::ToolConfig::resolve(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
        matches.get_one::<PathBuf>("registry").cloned(),
    )?;
    let registry = Registry::open_with_config(&registry_config)
        .await
        .with_context(|| format!("cannot open registry at {}", registry_config.root.display()))?;
    tracing::debug!("Opened registry at {}", registry.root().display());

    match matches.subcommand() {
        Some(("show", args)) => {
            let id = hash_arg(args)?;
            let docstring = registry.get(&id).await?;
            println!("{docstring}");
            println!();
            println!("Dependencies:");
            for child in registry.dependencies(&id).await? {
                println!("  {child}");
            }
            println!("Dependents:");
            for parent in registry.dependents(&id).await? {
                println!("  {parent}");
            }
        }
        Some(("tree", args)) => {
            let id = hash_arg(args)?;
            let graph = registry.dependency_graph(&id).await?;
            println!("{}", serde_json::to_string_pretty(&graph.to_tree())?);
        }
        Some(("similar", args)) => {
            let text = args.get_one::<String>("text").context("missing text")?;
            let k = args
                .get_one::<usize>("k")
                .copied()
                .unwrap_or(decompose.neighbor_count);

            let neighbors = LexicalIndex::new(registry).scored(text, k).await?;
            if neighbors.is_empty() {
                println!("No similar docstrings");
            }
            for neighbor in neighbors {
                let summary = neighbor.text.lines().next().unwrap_or_default();
                println!("{:.3}  {}  {}", neighbor.score, neighbor.id.short(), summary);
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_similar_with_k() {
        let matches = cli()
            .try_get_matches_from(["spectree", "--registry", "/tmp/r", "similar", "parse a date", "-k", "3"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "similar");
        assert_eq!(args.get_one::<usize>("k"), Some(&3));
        assert_eq!(args.get_one::<String>("text").map(String::as_str), Some("parse a date"));
    }

    #[test]
    fn rejects_bad_hash() {
        let matches = cli()
            .try_get_matches_from(["spectree", "show", "zz"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(hash_arg(args).is_err());
    }
}
