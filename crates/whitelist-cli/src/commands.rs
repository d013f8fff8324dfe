//! CLI command implementations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use whitelist_crypto::{Blake3, HashAlgorithm, Keccak256, MerkleTree};
use whitelist_store::WhitelistArtifact;
use whitelist_types::{Hash, Identity};

use crate::config::CliConfig;
use crate::output::*;

/// Main CLI.
#[derive(Parser)]
#[command(name = "whitelist")]
#[command(about = "Build Merkle whitelists and verify membership proofs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file (defaults to ~/.whitelist/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hash algorithm: keccak256 or blake3
    #[arg(short, long, global = true)]
    pub algorithm: Option<HashAlgorithm>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build the tree and write the whitelist artifact
    Build {
        /// Identity file, one per line
        #[arg(short, long)]
        input: PathBuf,
        /// Artifact path (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the root of an identity file
    Root {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the proof for one identity
    Proof {
        identity: Identity,
        /// Identity file to build the tree from
        #[arg(short, long, conflicts_with = "artifact", required_unless_present = "artifact")]
        input: Option<PathBuf>,
        /// Previously built artifact
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
    /// Check an identity against a root
    Verify {
        identity: Identity,
        /// Published root (hex)
        #[arg(long)]
        root: String,
        /// Proof sibling (hex), repeat in order from the leaf up
        #[arg(long = "proof")]
        proof: Vec<String>,
    },
    /// Print the whole tree
    Show {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config commands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute a command.
pub fn execute(cli: Cli, config: CliConfig) -> anyhow::Result<ExitCode> {
    let algorithm = cli.algorithm.unwrap_or(config.algorithm);

    match cli.command {
        Commands::Build { input, output } => {
            let identities = read_identities(&input)?;
            let artifact = WhitelistArtifact::build(algorithm, &identities)?;
            let path = output.unwrap_or_else(|| config.artifact_path.clone());
            artifact
                .save(&path)
                .with_context(|| format!("writing artifact to {}", path.display()))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&artifact)?);
            } else {
                print_success(&format!(
                    "Whitelist of {} members ({}) written to {}",
                    artifact.len(),
                    format_hash_short(&artifact.root),
                    path.display()
                ));
                print_hash("Root", &artifact.root);
            }
        }

        Commands::Root { input } => {
            let identities = read_identities(&input)?;
            let root = tree_root(algorithm, &identities)?;
            if cli.json {
                println!("{}", serde_json::json!({ "algorithm": algorithm, "root": root }));
            } else {
                println!("{root}");
            }
        }

        Commands::Proof { identity, input, artifact } => {
            let artifact = match (input, artifact) {
                (_, Some(path)) => WhitelistArtifact::load(&path)
                    .with_context(|| format!("loading artifact {}", path.display()))?,
                (Some(path), None) => {
                    WhitelistArtifact::build(algorithm, &read_identities(&path)?)?
                }
                (None, None) => anyhow::bail!("either --input or --artifact is required"),
            };
            let entry = artifact.proof_for(&identity)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "identity": entry.identity,
                        "leaf": entry.leaf,
                        "proof": entry.proof,
                        "root": artifact.root,
                    })
                );
            } else {
                print_hash("Leaf", &entry.leaf);
                print_hash("Root", &artifact.root);
                println!("Proof:");
                print_proof(&entry.proof);
            }
        }

        Commands::Verify { identity, root, proof } => {
            let valid = algorithm.verify_hex(&identity, &proof, &root);
            tracing::debug!(%identity, %algorithm, valid, "verified proof");

            if cli.json {
                println!("{}", serde_json::json!({ "identity": identity, "valid": valid }));
            } else if valid {
                print_success(&format!("{identity} is whitelisted"));
            } else {
                print_error(&format!("{identity} is not whitelisted under {root}"));
            }
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Show { input } => {
            let identities = read_identities(&input)?;
            print!("{}", render_tree(algorithm, &identities)?);
        }

        Commands::Config(ConfigCommands::Show) => {
            print!("{}", toml::to_string_pretty(&config)?);
        }

        Commands::Config(ConfigCommands::Init { force }) => {
            let path = match cli.config {
                Some(path) => path,
                None => CliConfig::config_path()?,
            };
            if path.exists() && !force {
                print_warning(&format!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                ));
                return Ok(ExitCode::FAILURE);
            }
            CliConfig::default().save(&path)?;
            print_info(&format!("Wrote {}", path.display()));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read an identity file: one per line, blank lines and `#` comments skipped.
pub fn read_identities(path: &Path) -> anyhow::Result<Vec<Identity>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading identities from {}", path.display()))?;
    parse_identities(&contents)
}

pub fn parse_identities(contents: &str) -> anyhow::Result<Vec<Identity>> {
    contents
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            line.parse::<Identity>()
                .with_context(|| format!("line {n}: invalid identity {line:?}"))
        })
        .collect()
}

fn tree_root(algorithm: HashAlgorithm, identities: &[Identity]) -> anyhow::Result<Hash> {
    Ok(match algorithm {
        HashAlgorithm::Keccak256 => MerkleTree::<Keccak256>::from_identities(identities)?.root(),
        HashAlgorithm::Blake3 => MerkleTree::<Blake3>::from_identities(identities)?.root(),
    })
}

fn render_tree(algorithm: HashAlgorithm, identities: &[Identity]) -> anyhow::Result<String> {
    Ok(match algorithm {
        HashAlgorithm::Keccak256 => {
            MerkleTree::<Keccak256>::from_identities(identities)?.to_string()
        }
        HashAlgorithm::Blake3 => MerkleTree::<Blake3>::from_identities(identities)?.to_string(),
    })
}
