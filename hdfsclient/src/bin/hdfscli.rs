use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hdfsclient::{ConnectionManager, PathStatus, Session, TransferOptions};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hdfscli")]
#[command(about = "Command-line client for HDFS-compatible namespaces", long_about = None)]
struct Cli {
    /// "default" for the configured filesystem, "" for the local one, a
    /// host name or a URI such as webhdfs://namenode:9870
    #[arg(long, env = "HDFS_HOST", default_value = "default")]
    host: String,

    /// 0 selects the port from configuration
    #[arg(long, env = "HDFS_PORT", default_value_t = 0)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List a directory")]
    Ls {
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },
    #[command(about = "Show metadata of a path")]
    Stat {
        #[arg(value_name = "PATH")]
        path: String,
    },
    #[command(about = "Create a directory and its missing parents")]
    Mkdir {
        #[arg(value_name = "PATH")]
        path: String,
    },
    #[command(about = "Delete a file or directory")]
    Rm {
        #[arg(short, long)]
        recursive: bool,
        #[arg(value_name = "PATH")]
        path: String,
    },
    #[command(about = "Rename a path")]
    Mv {
        #[arg(value_name = "SRC")]
        src: String,
        #[arg(value_name = "DST")]
        dst: String,
    },
    #[command(about = "Print a file to stdout")]
    Cat {
        #[arg(value_name = "PATH")]
        path: String,
    },
    #[command(about = "Download a file")]
    Get {
        #[arg(value_name = "REMOTE")]
        remote: String,
        #[arg(value_name = "LOCAL")]
        local: PathBuf,
        /// Fail instead of replacing an existing local file
        #[arg(long)]
        no_clobber: bool,
    },
    #[command(about = "Upload a file")]
    Put {
        #[arg(value_name = "LOCAL")]
        local: PathBuf,
        #[arg(value_name = "REMOTE")]
        remote: String,
        /// Fail instead of replacing an existing remote file
        #[arg(long)]
        no_clobber: bool,
    },
    #[command(about = "Set access and modification time to now, creating the file if absent")]
    Touch {
        #[arg(value_name = "PATH")]
        path: String,
    },
    #[command(about = "Write, read back and remove a scratch file")]
    Test {
        #[arg(value_name = "PATH", default_value = "/tmp/hdfscli-smoke")]
        path: String,
    },
}

fn print_status(st: &PathStatus) {
    let kind = if st.is_dir() { 'd' } else { '-' };
    println!(
        "{kind}{} {:>3} {:<10} {:<10} {:>12} {} {}",
        st.permission,
        st.replication,
        st.owner,
        st.group,
        st.size,
        st.modified.format("%Y-%m-%d %H:%M"),
        st.path
    );
}

async fn run(session: &Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ls { path } => {
            for st in session.listdir(&path).await? {
                print_status(&st);
            }
        }
        Commands::Stat { path } => {
            let st = session.stat(&path).await?;
            println!("{}", serde_json::to_string_pretty(&st)?);
        }
        Commands::Mkdir { path } => {
            session.mkdir(&path).await?;
        }
        Commands::Rm { recursive, path } => {
            if !session.delete(&path, recursive).await? {
                bail!("{path}: no such file or directory");
            }
        }
        Commands::Mv { src, dst } => {
            session.rename(&src, &dst).await?;
        }
        Commands::Cat { path } => {
            let chunk = session.config().transfer_chunk_size.max(1);
            let mut fh = session.open(&path, "r").await?;
            let mut out = tokio::io::stdout();
            loop {
                let data = fh.read(Some(chunk)).await?;
                if data.is_empty() {
                    break;
                }
                out.write_all(&data).await?;
            }
            out.flush().await?;
            fh.close().await?;
        }
        Commands::Get {
            remote,
            local,
            no_clobber,
        } => {
            let opts = TransferOptions {
                overwrite: !no_clobber,
                ..Default::default()
            };
            let n = session.get_with(&remote, &local, &opts).await?;
            println!("{n} bytes");
        }
        Commands::Put {
            local,
            remote,
            no_clobber,
        } => {
            let opts = TransferOptions {
                overwrite: !no_clobber,
                ..Default::default()
            };
            let n = session.put_with(&local, &remote, &opts).await?;
            println!("{n} bytes");
        }
        Commands::Touch { path } => {
            if !session.exists(&path).await? {
                session.open(&path, "w").await?.close().await?;
            }
            let now = Utc::now();
            session.utime(&path, Some(now), Some(now)).await?;
        }
        Commands::Test { path } => smoke(session, &path).await?,
    }
    Ok(())
}

/// Write, flush, close, reopen, read back in two pieces.
async fn smoke(session: &Session, path: &str) -> anyhow::Result<()> {
    const PAYLOAD: &[u8] = b"hoho\0haha\nxixi";

    let mut fh = session.open(path, "w").await?;
    let n = fh.write(PAYLOAD).await?;
    if n != PAYLOAD.len() {
        bail!("short write: {n} of {} bytes", PAYLOAD.len());
    }
    fh.flush().await?;
    fh.close().await?;

    let mut fh = session.open(path, "r").await?;
    let head = fh.read(Some(5)).await?;
    let rest = fh.read(None).await?;
    fh.close().await?;
    if &head[..] != b"hoho\0" || &rest[..] != b"haha\nxixi" {
        bail!("read back {head:?} + {rest:?}");
    }

    let st = session.stat(path).await?;
    println!("{path}: {} bytes, ok", st.size);
    session.delete(path, false).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let manager = ConnectionManager::from_env().context("loading client configuration")?;
    let session = manager
        .connect(&cli.host, cli.port)
        .await
        .with_context(|| format!("connecting to {:?}", cli.host))?;

    let result = run(&session, cli.command).await;
    manager.disconnect(&session)?;
    result
}
