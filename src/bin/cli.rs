//! FlatStore CLI
//!
//! Maintenance tool for inspecting and editing record store and index files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use flatstore::{Config, RecordId, RecordStore, Result, SparseIndex, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// FlatStore CLI
#[derive(Parser, Debug)]
#[command(name = "flatstore-cli")]
#[command(about = "Inspect and edit FlatStore record and index files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print header statistics of a record store
    Info(StoreArgs),

    /// Record store operations
    #[command(subcommand)]
    Record(RecordCommand),

    /// Sparse index operations
    #[command(subcommand)]
    Index(IndexCommand),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Record store file
    file: PathBuf,

    /// Record size in bytes
    #[arg(short, long)]
    entry_size: u32,
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    /// Allocate a record and print its index
    Create(StoreArgs),

    /// Print a record as hex
    Get {
        #[command(flatten)]
        store: StoreArgs,

        /// Record index
        index: u32,
    },

    /// Overwrite a record with UTF-8 text, zero padded
    Put {
        #[command(flatten)]
        store: StoreArgs,

        /// Record index
        index: u32,

        /// Text to store
        data: String,
    },

    /// Recycle a record onto the free list
    Delete {
        #[command(flatten)]
        store: StoreArgs,

        /// Record index
        index: u32,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommand {
    /// Map a key to a value
    Put {
        /// Index file
        file: PathBuf,

        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u32)]
        key: u32,

        /// Value, non-zero (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u32)]
        value: u32,
    },

    /// Look up a key
    Get {
        /// Index file
        file: PathBuf,

        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u32)]
        key: u32,
    },

    /// Unmap a key
    Remove {
        /// Index file
        file: PathBuf,

        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u32)]
        key: u32,
    },

    /// Print every mapping in key order
    Dump {
        /// Index file
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let existing = Config::builder().create_if_missing(false).build();
    let creating = Config::default();

    match command {
        Commands::Info(args) => {
            let store = RecordStore::open_with_config(&args.file, args.entry_size, &existing)?;
            let stats = store.stats()?;
            println!("entry_size:        {}", stats.entry_size);
            println!("last_entry:        {}", stats.last_entry);
            println!("entries_allocated: {}", stats.entries_allocated);
            println!("entries_free:      {}", stats.entries_free);
            println!("file_len:          {}", stats.file_len);
            store.close()
        }

        Commands::Record(RecordCommand::Create(args)) => {
            let mut store = RecordStore::open_with_config(&args.file, args.entry_size, &creating)?;
            let id = store.create_record()?;
            store.put_record(id, &vec![0u8; store.entry_size() as usize])?;
            println!("{}", id.get());
            store.close()
        }

        Commands::Record(RecordCommand::Get { store: args, index }) => {
            let mut store = RecordStore::open_with_config(&args.file, args.entry_size, &existing)?;
            let data = store.get_record(record_id(index)?)?;
            println!("{}", to_hex(&data));
            store.close()
        }

        Commands::Record(RecordCommand::Put { store: args, index, data }) => {
            let mut store = RecordStore::open_with_config(&args.file, args.entry_size, &existing)?;
            let size = store.entry_size() as usize;
            if data.len() > size {
                return Err(StoreError::RecordSize {
                    expected: size,
                    actual: data.len(),
                });
            }
            let mut record = vec![0u8; size];
            record[..data.len()].copy_from_slice(data.as_bytes());
            store.put_record(record_id(index)?, &record)?;
            store.close()
        }

        Commands::Record(RecordCommand::Delete { store: args, index }) => {
            let mut store = RecordStore::open_with_config(&args.file, args.entry_size, &existing)?;
            store.delete_record(record_id(index)?)?;
            store.close()
        }

        Commands::Index(IndexCommand::Put { file, key, value }) => {
            let mut index = SparseIndex::open_with_config(&file, &creating)?;
            index.put(key, value)?;
            index.close()
        }

        Commands::Index(IndexCommand::Get { file, key }) => {
            let mut index = SparseIndex::open_with_config(&file, &existing)?;
            match index.get(key)? {
                Some(value) => println!("{:#010x} => {}", key, value),
                None => println!("{:#010x} not found", key),
            }
            index.close()
        }

        Commands::Index(IndexCommand::Remove { file, key }) => {
            let mut index = SparseIndex::open_with_config(&file, &existing)?;
            match index.remove(key)? {
                Some(value) => println!("removed {:#010x} => {}", key, value),
                None => println!("{:#010x} not found", key),
            }
            index.close()
        }

        Commands::Index(IndexCommand::Dump { file }) => {
            let mut index = SparseIndex::open_with_config(&file, &existing)?;
            for (key, value) in index.entries()? {
                println!("{:#010x} => {}", key, value);
            }
            tracing::debug!(keys = index.len(), nodes = index.node_count(), "Dump complete");
            index.close()
        }
    }
}

fn record_id(index: u32) -> Result<RecordId> {
    RecordId::from_raw(index)
        .ok_or_else(|| StoreError::Config(format!("{} is not a valid record index", index)))
}

fn parse_u32(s: &str) -> std::result::Result<u32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
