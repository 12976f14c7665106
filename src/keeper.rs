//! Renewal process: config, backends and the cycle loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use namekeeper::{
    config::{self, ConfigToml, KeeperConfig},
    CycleOutcome, CycleRunner, DisabledNotifier, HsdNodeClient, HsdWalletClient, Notifier,
    TelegramNotifier,
};

/// What the process does once configured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One cycle, exit code from its outcome
    Once,
    /// Cycles every loop period until Ctrl-C
    Loop,
    /// Print wallet status
    Status,
}

struct Options {
    config_path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options { config_path: None };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                match args.get(i) {
                    Some(path) => options.config_path = Some(PathBuf::from(path)),
                    None => bail!("--config needs a path"),
                }
            }
            other => bail!("unknown argument: {other} (see --help)"),
        }
        i += 1;
    }

    Ok(options)
}

/// Load config, build backends and run `mode`. Returns the exit code.
#[tokio::main]
pub async fn run(mode: Mode, args: Vec<String>) -> anyhow::Result<i32> {
    let options = parse_args(&args)?;

    // Initialize logging with EnvFilter to support RUST_LOG
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load(options.config_path.as_deref()).context("loading configuration")?;
    let runner = build_runner(config)?;

    match mode {
        Mode::Once => run_once(&runner).await,
        Mode::Loop => run_loop(&runner).await.map(|()| 0),
        Mode::Status => {
            print!("{}", runner.status().await.render());
            Ok(0)
        }
    }
}

fn build_runner(config: KeeperConfig) -> anyhow::Result<CycleRunner> {
    let timeout = config.executor.call_timeout;

    let node = HsdNodeClient::new(&config.node, timeout).context("creating node client")?;
    let wallet = HsdWalletClient::new(
        &config.wallet,
        timeout,
        config.wallet_id.clone(),
        config.wallet_account.clone(),
        config.wallet_passphrase.expose(),
    )
    .context("creating wallet client")?;

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => Arc::new(
            TelegramNotifier::new(telegram, timeout).context("creating Telegram notifier")?,
        ),
        None => {
            warn!("Telegram not configured; reports will only be logged");
            Arc::new(DisabledNotifier)
        }
    };

    if config.wallet_passphrase.is_empty() {
        warn!("No wallet passphrase configured; renewals of a locked wallet will be rejected");
    }

    Ok(CycleRunner::new(
        Arc::new(wallet),
        Arc::new(node),
        notifier,
        config,
    ))
}

/// Fail startup unless the configured wallet answers
async fn ensure_wallet(runner: &CycleRunner) -> anyhow::Result<()> {
    let wallet_id = runner.config().wallet_id.as_str();
    match runner.check_wallet().await {
        Ok(info) => {
            info!(wallet = %info.id, "Wallet is ready");
            Ok(())
        }
        Err(e) => bail!(
            "wallet '{wallet_id}' does not exist or is unreachable ({e}).\n\
             Import the wallet into hsd first, then restart namekeeper."
        ),
    }
}

async fn run_once(runner: &CycleRunner) -> anyhow::Result<i32> {
    ensure_wallet(runner).await?;
    let outcome = runner.run().await;
    log_outcome(&outcome);
    Ok(outcome.exit_code())
}

async fn run_loop(runner: &CycleRunner) -> anyhow::Result<()> {
    ensure_wallet(runner).await?;

    let period = runner.config().loop_period;
    info!(period_secs = period.as_secs(), "Renewal loop started");

    loop {
        let outcome = runner.run().await;
        log_outcome(&outcome);

        tokio::select! {
            () = tokio::time::sleep(period) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Done { report, notified } => info!(
            renewed = report.renewed.len(),
            errors = report.errors.len(),
            notified,
            "Cycle done"
        ),
        CycleOutcome::Fatal {
            inventory, notify, ..
        } => error!("Cycle failed: {}; operator not notified: {}", inventory, notify),
    }
}

/// Write the default configuration to `path` (or the default location)
pub fn init_config(path: Option<&str>) -> anyhow::Result<()> {
    let path = path.map_or_else(config::default_path, PathBuf::from);
    write_default(&path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set wallet_passphrase and the [telegram] section before running.");
    Ok(())
}

fn write_default(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists; not overwriting", path.display());
    }
    ConfigToml::default()
        .save_to_file(path)
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_config_flag() {
        let options = parse_args(&args(&["--config", "/tmp/nk.toml"])).unwrap();
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/nk.toml")));

        let options = parse_args(&[]).unwrap();
        assert_eq!(options.config_path, None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing_value() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["-c"])).is_err());
    }

    fn unreachable_runner() -> CycleRunner {
        let mut toml = ConfigToml::default();
        // Nothing listens on the discard port
        toml.node.url = "http://127.0.0.1:9".to_string();
        toml.wallet.url = "http://127.0.0.1:9".to_string();
        toml.call_timeout_secs = 2;
        build_runner(toml.validate().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_run_once_checks_wallet_first() {
        let runner = unreachable_runner();

        let err = ensure_wallet(&runner).await.unwrap_err();
        assert!(err.to_string().contains("wallet 'primary' does not exist or is unreachable"));

        // One-shot mode fails at startup instead of reporting a cycle
        let err = run_once(&runner).await.unwrap_err();
        assert!(err.to_string().contains("Import the wallet into hsd first"));
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = std::env::temp_dir().join(format!("namekeeper-init-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_dir_all(&dir);

        write_default(&path).unwrap();
        let loaded = ConfigToml::load_from_file(&path).unwrap();
        assert_eq!(loaded.wallet_id, "primary");
        assert!(write_default(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
