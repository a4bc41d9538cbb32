use crate::bencode::{parse, pretty_print, BencodeValue};
use crate::config::{self, split_urls, CreateConfig};
use crate::creator::TorrentCreator;
use crate::error::{MktorrentError, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mktorrent-rs")]
#[command(version, about = "Create BitTorrent metainfo files", long_about = None)]
pub struct Cli {
    /// Be more verbose, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a torrent from a file or directory
    Create(CreateArgs),

    /// Rehash the payload of a torrent and compare the piece digests
    Check {
        /// Path to the .torrent file
        torrent: PathBuf,

        /// Payload location, defaults to the torrent name next to the .torrent file
        #[arg(long)]
        target: Option<PathBuf>,

        /// Number of hashing threads
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Pretty-print any bencoded file
    Dump {
        file: PathBuf,
    },

    /// Show information about a torrent file
    Info {
        /// Path to the .torrent file
        torrent: PathBuf,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// File or directory to make the torrent from
    target: PathBuf,

    /// Announce URLs of one tier, comma separated; repeat for more tiers
    #[arg(short, long = "announce", value_name = "URL[,URL]*", required = true)]
    announce: Vec<String>,

    /// Add a comment to the metainfo
    #[arg(short, long)]
    comment: Option<String>,

    /// Leave out the creation date
    #[arg(short = 'd', long)]
    no_date: bool,

    /// Piece length as a power of two
    #[arg(short = 'l', long, value_name = "N", default_value_t = config::DEFAULT_PIECE_EXP)]
    piece_length: u32,

    /// Torrent name, defaults to the basename of the target
    #[arg(short, long)]
    name: Option<String>,

    /// Output file, defaults to <name>.torrent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Set the private flag
    #[arg(short, long)]
    private: bool,

    /// Add a source string embedded in the info dictionary
    #[arg(short, long)]
    source: Option<String>,

    /// Make the info hash unique by adding a random tag
    #[arg(short = 'x', long)]
    cross_seed: bool,

    /// Number of hashing threads, defaults to the number of CPUs
    #[arg(short, long)]
    threads: Option<usize>,

    /// Web seed URLs, comma separated
    #[arg(short, long = "web-seed", value_name = "URL[,URL]*")]
    web_seed: Vec<String>,

    /// Maximum number of directories held open while scanning
    #[arg(long, default_value_t = config::DEFAULT_MAX_OPEN_DIRS)]
    max_open_dirs: usize,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,
}

impl CreateArgs {
    fn into_config(self, show_progress: bool) -> Result<CreateConfig> {
        let mut config = CreateConfig::new(self.target);
        config.announce = self.announce.iter().map(|tier| split_urls(tier)).collect();
        config.web_seeds = self.web_seed.iter().flat_map(|w| split_urls(w)).collect();
        config.comment = self.comment;
        config.no_date = self.no_date;
        config.piece_length_exp = self.piece_length;
        config.name = self.name;
        config.output = self.output;
        config.private = self.private;
        config.source = self.source;
        config.cross_seed = self.cross_seed;
        config.threads = self.threads;
        config.max_open_dirs = self.max_open_dirs;
        config.force = self.force;
        config.show_progress = show_progress;
        config.validate()
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Default log level for the chosen verbosity
    pub fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    pub async fn run(self) -> Result<()> {
        let show_progress = !self.quiet;

        match self.command {
            Commands::Create(args) => {
                let config = args.into_config(show_progress)?;
                let output = TorrentCreator::new(config).create().await?;
                println!("Wrote {}", output.display());
            }

            Commands::Check {
                torrent,
                target,
                threads,
            } => {
                let threads = threads.unwrap_or_else(config::default_threads);
                let report = TorrentCreator::check(&torrent, target, threads, show_progress).await?;

                if report.is_complete() {
                    println!("All {} pieces match.", report.pieces);
                } else {
                    println!(
                        "{} of {} pieces differ: {:?}",
                        report.mismatched.len(),
                        report.pieces,
                        report.mismatched
                    );
                    return Err(MktorrentError::InvalidTorrent(
                        "payload does not match the torrent".to_string(),
                    ));
                }
            }

            Commands::Dump { file } => dump(&file)?,

            Commands::Info { torrent } => show_torrent_info(&torrent).await?,
        }

        Ok(())
    }
}

fn dump(path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| MktorrentError::file(path, e))?;
    let value = parse(BufReader::new(file))?;

    if !matches!(value, BencodeValue::Dict(_)) {
        return Err(MktorrentError::BencodeError(format!(
            "expected a dictionary at the top level, found a {}",
            value.type_name()
        )));
    }

    let written = pretty_print(&value, std::io::stdout().lock())?;
    info!("Printed {} bytes", written);
    Ok(())
}

async fn show_torrent_info(torrent_path: &Path) -> Result<()> {
    let (metainfo, _) = crate::torrent::load_torrent_file(torrent_path).await?;

    println!("Torrent Information");
    println!("==================");
    println!("Name: {}", metainfo.info.name);
    if let Some(announce) = &metainfo.announce {
        println!("Tracker: {}", announce);
    }
    println!("Total Size: {} bytes", metainfo.info.total_length);
    println!("Piece Length: {} bytes", metainfo.info.piece_length);
    println!("Number of Pieces: {}", metainfo.info.pieces.len());
    println!("Info Hash: {}", metainfo.info_hash_hex());
    println!("Private: {}", if metainfo.info.private { "yes" } else { "no" });

    if let Some(source) = &metainfo.info.source {
        println!("Source: {}", source);
    }
    if let Some(comment) = &metainfo.comment {
        println!("Comment: {}", comment);
    }
    if let Some(created_by) = &metainfo.created_by {
        println!("Created By: {}", created_by);
    }
    if let Some(date) = metainfo.creation_date {
        println!("Creation Date: {} (unix time)", date);
    }

    if metainfo.info.multi_file {
        println!("\nFiles:");
        for (i, file) in metainfo.info.files.iter().enumerate() {
            println!(
                "  {}: {} ({} bytes)",
                i + 1,
                file.path.join("/"),
                file.length
            );
        }
    }

    if let Some(announce_list) = &metainfo.announce_list {
        println!("\nAdditional Trackers:");
        for (tier, trackers) in announce_list.iter().enumerate() {
            println!("  Tier {}:", tier + 1);
            for tracker in trackers {
                println!("    - {}", tracker);
            }
        }
    }

    if !metainfo.web_seeds.is_empty() {
        println!("\nWeb Seeds:");
        for seed in &metainfo.web_seeds {
            println!("    - {}", seed);
        }
    }

    Ok(())
}
