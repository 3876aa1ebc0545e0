//! Command-line interface.

use std::fmt::Debug;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Report, bail, miette};
use time::UtcOffset;
use tracing::{info, warn};
use wisp_config::Config;
use wisp_extract::Chunks;
use wisp_history::{History, HistoryEntry};
use wisp_storage::backend::LocalBackend;

use crate::{display, load};

/// Extract embedded workflows from ComfyUI images and keep a history of them
#[derive(Parser, Debug)]
#[command(name = "wisp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the workflow embedded in a PNG image (or stored in a JSON file)
    Extract {
        file: PathBuf,
    },
    /// List the chunks of a PNG image, with the keyword of every text chunk
    Inspect {
        file: PathBuf,
    },
    /// Add the workflow from a PNG image or JSON file to the history
    Add {
        file: PathBuf,
        /// Name to remember the workflow by (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show or manage remembered workflows
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List remembered workflows, newest first
    #[command(alias = "ls")]
    List,
    /// Print a remembered workflow
    Show {
        /// Content hash, or an unambiguous prefix of it
        hash: String,
    },
    /// Forget a remembered workflow
    #[command(alias = "rm")]
    Remove {
        /// Content hash, or an unambiguous prefix of it
        hash: String,
    },
    /// Forget every remembered workflow
    Clear,
}

/// Turn a library error (and its error tree) into a diagnostic.
pub fn report<E: Debug>(err: E) -> Report {
    miette!("{err:?}")
}

impl Cli {
    pub async fn run(self, config: &Config, offset: UtcOffset, out: &mut impl Write) -> miette::Result<()> {
        match self.command {
            Command::Extract { file } => {
                let workflow = load::workflow(&file).await?;
                writeln!(out, "{workflow}").into_diagnostic()
            },
            Command::Inspect { file } => inspect(&file, out).await,
            Command::Add { file, name } => {
                let workflow = load::workflow(&file).await?;
                let name = name.unwrap_or_else(|| load::default_name(&file));
                let history = open_history(config)?;
                match history.insert_or_refresh(&name, &workflow).await {
                    Ok(entry) => writeln!(out, "{}", display::entry_line(&entry, offset)).into_diagnostic(),
                    // The workflow itself was read fine, so this isn't fatal.
                    Err(err) if err.is_warning() => {
                        warn!(error = ?err, "workflow was not added to the history");
                        Ok(())
                    },
                    Err(err) => Err(report(err)),
                }
            },
            Command::History(command) => {
                let history = open_history(config)?;
                run_history(command, &history, offset, out).await
            },
        }
    }
}

async fn run_history(
    command: HistoryCommand,
    history: &History,
    offset: UtcOffset,
    out: &mut impl Write,
) -> miette::Result<()> {
    match command {
        HistoryCommand::List => {
            let entries = history.list().await.map_err(report)?;
            if entries.is_empty() {
                return writeln!(out, "No history yet").into_diagnostic();
            }
            for entry in &entries {
                writeln!(out, "{}", display::entry_line(entry, offset)).into_diagnostic()?;
            }
            let total = entries.iter().map(|entry| entry.byte_size).sum();
            writeln!(
                out,
                "{} workflows, {} of {}",
                entries.len(),
                display::size(total),
                display::size(history.budget())
            )
            .into_diagnostic()
        },
        HistoryCommand::Show { hash } => {
            let entry = resolve(history, &hash).await?;
            writeln!(out, "{}", entry.content).into_diagnostic()
        },
        HistoryCommand::Remove { hash } => {
            let entry = resolve(history, &hash).await?;
            history.remove(&entry.content_hash).await.map_err(report)?;
            info!(hash = %entry.content_hash, "removed workflow from history");
            writeln!(out, "Removed {}", entry.title()).into_diagnostic()
        },
        HistoryCommand::Clear => {
            history.clear().await.map_err(report)?;
            writeln!(out, "History cleared").into_diagnostic()
        },
    }
}

fn open_history(config: &Config) -> miette::Result<History> {
    let directory = config.history.directory().map_err(report)?;
    let backend = LocalBackend::new("local", &directory).map_err(report)?;
    let history = History::new(Arc::new(backend), &config.history.slot).map_err(report)?;
    Ok(history.with_budget(config.history.budget))
}

/// Find the entry whose hash is `hash`, or starts with `hash`.
async fn resolve(history: &History, hash: &str) -> miette::Result<HistoryEntry> {
    if let Some(entry) = history.get(hash).await.map_err(report)? {
        return Ok(entry);
    }
    let mut matches = history.list().await.map_err(report)?.into_iter().filter(|e| e.content_hash.starts_with(hash));
    match (matches.next(), matches.next()) {
        (Some(entry), None) if !hash.is_empty() => Ok(entry),
        (Some(_), Some(_)) => bail!("more than one workflow in the history matches `{hash}`"),
        _ => bail!("no workflow in the history matches `{hash}`"),
    }
}

async fn inspect(file: &std::path::Path, out: &mut impl Write) -> miette::Result<()> {
    let bytes = tokio::fs::read(file).await.into_diagnostic()?;
    for chunk in Chunks::new(&bytes).map_err(report)? {
        let chunk = chunk.map_err(report)?;
        let crc = match chunk.crc_matches() {
            Some(true) => "",
            Some(false) => "  (checksum mismatch)",
            None => "  (checksum missing)",
        };
        let keyword = chunk.text().map(|entry| format!("  {}", entry.keyword_lossy())).unwrap_or_default();
        writeln!(out, "{:>10}  {}  {:>10}{keyword}{crc}", chunk.offset(), chunk.kind(), chunk.data().len())
            .into_diagnostic()?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wisp_extract::{ChunkType, SIGNATURE, checksum};

    /// A PNG container holding one `tEXt` chunk per keyword/value pair.
    pub(crate) fn png(texts: &[(&str, &str)]) -> Vec<u8> {
        let mut chunks: Vec<(ChunkType, Vec<u8>)> = vec![(ChunkType(*b"IHDR"), vec![0; 13])];
        for (keyword, value) in texts {
            chunks.push((ChunkType(*b"tEXt"), [keyword.as_bytes(), &[0u8], value.as_bytes()].concat()));
        }
        chunks.push((ChunkType(*b"IEND"), Vec::new()));

        let mut bytes = SIGNATURE.to_vec();
        for (kind, data) in chunks {
            bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
            bytes.extend_from_slice(kind.as_bytes());
            bytes.extend_from_slice(&data);
            bytes.extend_from_slice(&checksum(kind, &data).to_be_bytes());
        }
        bytes
    }

    struct Fixture {
        dir: tempfile::TempDir,
        config: Config,
    }
    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.history.directory = Some(dir.path().join("data"));
            Self { dir, config }
        }

        fn file(&self, name: &str, contents: impl AsRef<[u8]>) -> String {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path.to_str().unwrap().to_string()
        }

        async fn run(&self, args: &[&str]) -> miette::Result<String> {
            let cli = Cli::try_parse_from(std::iter::once("wisp").chain(args.iter().copied())).into_diagnostic()?;
            let mut out = Vec::new();
            cli.run(&self.config, UtcOffset::UTC, &mut out).await?;
            Ok(String::from_utf8(out).unwrap())
        }
    }

    #[tokio::test]
    async fn extract_prints_workflow() {
        let fixture = Fixture::new();
        let path = fixture.file("image.png", png(&[("workflow", r#"{"nodes": []}"#)]));
        let out = fixture.run(&["extract", &path]).await.unwrap();
        assert_eq!(out, "{\"nodes\": []}\n");
    }

    #[tokio::test]
    async fn inspect_lists_chunks() {
        let fixture = Fixture::new();
        let path = fixture.file("image.png", png(&[("prompt", "{}"), ("workflow", "{}")]));
        let out = fixture.run(&["inspect", &path]).await.unwrap();
        let lines: Vec<_> = out.lines().map(str::split_whitespace).map(Iterator::collect::<Vec<_>>).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ["8", "IHDR", "13"]);
        assert_eq!(lines[1], ["33", "tEXt", "9", "prompt"]);
        assert_eq!(lines[2][3], "workflow");
        assert_eq!(lines[3][1], "IEND");
    }

    #[tokio::test]
    async fn add_then_list_show_remove() {
        let fixture = Fixture::new();
        let image = fixture.file("image.png", png(&[("workflow", r#"{"from": "png"}"#)]));
        let json = fixture.file("flow.json", r#"{"from": "json"}"#);

        let added = fixture.run(&["add", &image]).await.unwrap();
        assert!(added.trim_end().ends_with("image.png"));
        fixture.run(&["add", &json, "--name", "Mine"]).await.unwrap();

        let listed = fixture.run(&["history", "list"]).await.unwrap();
        let lines: Vec<_> = listed.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Mine"));
        assert!(lines[1].ends_with("image.png"));
        assert!(lines[2].starts_with("2 workflows"));

        let hash = wisp_history::content_hash(r#"{"from": "png"}"#);
        let shown = fixture.run(&["history", "show", &hash[..8]]).await.unwrap();
        assert_eq!(shown, "{\"from\": \"png\"}\n");

        let removed = fixture.run(&["history", "remove", &hash]).await.unwrap();
        assert_eq!(removed, "Removed image.png\n");
        assert!(fixture.run(&["history", "show", &hash]).await.is_err());

        fixture.run(&["history", "clear"]).await.unwrap();
        assert_eq!(fixture.run(&["history", "list"]).await.unwrap(), "No history yet\n");
    }

    #[tokio::test]
    async fn add_rejects_unsupported_files() {
        let fixture = Fixture::new();
        let path = fixture.file("image.gif", b"GIF89a");
        assert!(fixture.run(&["add", &path]).await.is_err());
        assert_eq!(fixture.run(&["history", "list"]).await.unwrap(), "No history yet\n");
    }

    #[tokio::test]
    async fn ambiguous_prefix_is_rejected() {
        let fixture = Fixture::new();
        for n in 0..2 {
            let path = fixture.file(&format!("{n}.json"), format!(r#"{{"n": {n}}}"#));
            fixture.run(&["add", &path]).await.unwrap();
        }
        // An empty prefix matches everything.
        let err = fixture.run(&["history", "show", ""]).await.unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }
}
