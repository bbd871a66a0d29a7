//! qrdx: encrypted QR transfer units from the command line
//!
//! Commands:
//!   encode <file>                - seal a file into one or more unit files
//!   decode <unit-files>...       - reassemble units (any order) back into the file
//!   decrypt --text <unit>        - decode a single unit given inline
//!   info <unit-files>...         - inspect units without the password
//!   config show                  - display the effective configuration

mod password;
mod units;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use qrdx_codec::CodecOptions;
use qrdx_core::{QrdxConfig, QrdxError, QrdxResult};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "qrdx",
    version,
    about = "Password-protected file transfer through QR codes",
    long_about = "qrdx: compress, encrypt and split files into text units that each fit in one QR code"
)]
struct Cli {
    /// Path to config.toml
    #[arg(long, short = 'c', env = "QRDX_CONFIG", default_value = "~/.config/qrdx/config.toml")]
    config: PathBuf,

    /// Log level filter (overrides the config file)
    #[arg(long, env = "QRDX_LOG")]
    log: Option<String>,

    /// Log output format (overrides the config file)
    #[arg(long, env = "QRDX_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file into transfer units
    Encode {
        /// File to encode
        file: PathBuf,
        /// Directory for the unit files (default: next to the input)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
        /// Capacity of one QR code in bytes (overrides config)
        #[arg(long)]
        max_unit_bytes: Option<usize>,
        /// Print units to stdout, one per line, instead of writing files
        #[arg(long)]
        stdout: bool,
        /// Password (prompted for when absent)
        #[arg(long, env = "QRDX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Reassemble and decrypt transfer units read from files
    ///
    /// Every non-empty line is one unit; files and lines may be in any order.
    Decode {
        /// Files holding scanned units
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Where to write the recovered file
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[arg(long, env = "QRDX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Decrypt a single-part unit given on the command line
    Decrypt {
        /// The unit text
        #[arg(long)]
        text: String,
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[arg(long, env = "QRDX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show what each unit is, without decrypting
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = QrdxConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "qrdx starting"
    );

    match cli.command {
        Commands::Encode {
            file,
            out_dir,
            max_unit_bytes,
            stdout,
            password,
        } => {
            let max = max_unit_bytes.unwrap_or(config.codec.max_unit_bytes);
            cmd_encode(&config, &file, out_dir.as_deref(), max, stdout, password).await
        }
        Commands::Decode {
            files,
            output,
            password,
        } => cmd_decode(&config, &files, &output, password).await,
        Commands::Decrypt {
            text,
            output,
            password,
        } => cmd_decrypt(&config, text, &output, password).await,
        Commands::Info { files, json } => cmd_info(&files, json),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so `encode --stdout` output stays clean.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

// ── Progress helpers ───────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Run a codec call on the blocking pool; Argon2 at the default cost takes
/// long enough to stall the runtime otherwise.
async fn run_codec<T, F>(prefix: &str, msg: &'static str, work: F) -> Result<T>
where
    F: FnOnce() -> QrdxResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pb = make_spinner(prefix);
    pb.set_message(msg);
    let result = tokio::task::spawn_blocking(work).await;
    pb.finish_and_clear();
    result.context("codec task panicked")?.map_err(explain)
}

fn explain(err: QrdxError) -> anyhow::Error {
    match &err {
        QrdxError::MissingParts { missing, total } => {
            let list = missing
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let hint = format!("incomplete transfer: scan part(s) {list} of {total} and retry");
            anyhow::Error::new(err).context(hint)
        }
        QrdxError::Decryption => {
            anyhow::Error::new(err).context("check the password, KDF settings and scanned text")
        }
        _ => anyhow::Error::new(err),
    }
}

// ── `qrdx encode` ──────────────────────────────────────────────────────────────

async fn cmd_encode(
    config: &QrdxConfig,
    file: &Path,
    out_dir: Option<&Path>,
    max_unit_bytes: usize,
    to_stdout: bool,
    password: Option<String>,
) -> Result<()> {
    let raw = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let password = password::resolve(password, true)?;
    let opts = CodecOptions::from_config(config);

    info!(file = %file.display(), bytes = raw.len(), max_unit_bytes, "encoding");

    let encoded = run_codec("encode", "deriving key and encrypting", move || {
        qrdx_codec::encode(&raw, &password, max_unit_bytes, &opts)
    })
    .await?;

    if to_stdout {
        for unit in encoded.units() {
            println!("{unit}");
        }
        return Ok(());
    }

    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let written = units::write_units(&dir, &units::file_stem(file), &encoded)?;

    println!(
        "Encoded {} into {} unit{}:",
        file.display(),
        written.len(),
        if written.len() == 1 { "" } else { "s" }
    );
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}

// ── `qrdx decode` / `qrdx decrypt` ─────────────────────────────────────────────

async fn cmd_decode(
    config: &QrdxConfig,
    files: &[PathBuf],
    output: &Path,
    password: Option<String>,
) -> Result<()> {
    let scanned = units::read_units(files)?;
    if scanned.is_empty() {
        anyhow::bail!("no transfer units found in the given files");
    }
    let password = password::resolve(password, false)?;
    info!(units = scanned.len(), "decoding");

    let raw = decode_units(config, scanned, password).await?;
    write_output(output, &raw)
}

async fn cmd_decrypt(
    config: &QrdxConfig,
    text: String,
    output: &Path,
    password: Option<String>,
) -> Result<()> {
    let password = password::resolve(password, false)?;
    let raw = decode_units(config, vec![text], password).await?;
    write_output(output, &raw)
}

async fn decode_units(
    config: &QrdxConfig,
    scanned: Vec<String>,
    password: SecretString,
) -> Result<Vec<u8>> {
    let opts = CodecOptions::from_config(config);
    run_codec("decode", "deriving key and decrypting", move || {
        qrdx_codec::decode(&scanned, &password, &opts)
    })
    .await
}

fn write_output(output: &Path, raw: &[u8]) -> Result<()> {
    std::fs::write(output, raw).with_context(|| format!("writing {}", output.display()))?;
    println!("Recovered {} bytes into {}", raw.len(), output.display());
    Ok(())
}

// ── `qrdx info` ────────────────────────────────────────────────────────────────

fn cmd_info(files: &[PathBuf], json: bool) -> Result<()> {
    let summaries: Vec<_> = units::read_units(files)?
        .iter()
        .map(|u| units::summarize(u))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let mut invalid = 0usize;
    for (i, s) in summaries.iter().enumerate() {
        match (&s.part, &s.error) {
            (Some(part), _) => println!("#{i:<4} part {part}  {} bytes", s.len),
            (None, Some(err)) => {
                invalid += 1;
                println!("#{i:<4} invalid  {} bytes  ({err})", s.len);
            }
            (None, None) => println!("#{i:<4} single  {} bytes", s.len),
        }
    }
    if invalid > 0 {
        anyhow::bail!("{invalid} of {} units could not be parsed", summaries.len());
    }
    Ok(())
}

// ── `qrdx config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &QrdxConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("serializing config")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_encode() {
        let cli = Cli::try_parse_from([
            "qrdx",
            "encode",
            "notes.txt",
            "--max-unit-bytes",
            "500",
            "--stdout",
        ])
        .unwrap();
        match cli.command {
            Commands::Encode {
                file,
                max_unit_bytes,
                stdout,
                ..
            } => {
                assert_eq!(file, PathBuf::from("notes.txt"));
                assert_eq!(max_unit_bytes, Some(500));
                assert!(stdout);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decode_requires_files() {
        assert!(Cli::try_parse_from(["qrdx", "decode", "--output", "x"]).is_err());
    }

    #[test]
    fn tilde_expansion() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_tilde(Path::new("~/a/b")), PathBuf::from(home).join("a/b"));
        assert_eq!(expand_tilde(Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }

    #[test]
    fn missing_parts_are_explained() {
        let err = explain(QrdxError::MissingParts {
            missing: vec![2, 4],
            total: 5,
        });
        let text = format!("{err:#}");
        assert!(text.contains("scan part(s) 2, 4 of 5"), "{text}");
    }

    #[tokio::test]
    async fn codec_round_trip_through_blocking_pool() {
        let mut config = QrdxConfig::default();
        config.kdf.mem_cost_kib = 256;
        config.kdf.time_cost = 1;
        let opts = CodecOptions::from_config(&config);
        let encoded = run_codec("test", "encoding", move || {
            qrdx_codec::encode(b"through the pool", &SecretString::from("pw"), 2953, &opts)
        })
        .await
        .unwrap();

        let raw = decode_units(&config, encoded.into_units(), SecretString::from("pw"))
            .await
            .unwrap();
        assert_eq!(raw, b"through the pool");
    }
}
