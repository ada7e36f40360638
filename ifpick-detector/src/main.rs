use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, instrument};

use ifpick_detector::BusiestInterfaceDetector;
use ifpick_detector::config::{self, AppConfig, OutputFormat};
use ifpick_shared::errors::DetectError;

/// Exit status used when the run is interrupted by Ctrl-C
const EXIT_CANCELLED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e.downcast_ref::<DetectError>(), Some(DetectError::Cancelled)) {
                eprintln!("Interrupted");
                return ExitCode::from(EXIT_CANCELLED);
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = config::from_cli_and_env()?;
    config.init_logging()?;

    debug!(
        "Configuration: source={}, window={:?}, output={}, exclude={:?}",
        config.source, config.window, config.output, config.exclude
    );

    let selection = detect(&config).await?;

    match config.output {
        OutputFormat::Plain => println!("{}", selection.interface),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&selection).context("Serializing selection")?
        ),
    }

    Ok(())
}

#[instrument(skip(config), fields(source = %config.source))]
async fn detect(config: &AppConfig) -> Result<ifpick_shared::Selection> {
    let detector = BusiestInterfaceDetector::new(config.build_provider())
        .with_window(config.window)
        .with_exclusions(config.exclusion_patterns()?);

    let interrupted = interrupt_signal()?;

    Ok(detector.detect_until(interrupted).await?)
}

/// Resolves on SIGINT. The handler is registered before the first sample.
#[cfg(unix)]
fn interrupt_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).context("Installing SIGINT handler")?;
    Ok(async move {
        if sigint.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    })
}

#[cfg(not(unix))]
fn interrupt_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        // Without a signal handler the run simply cannot be interrupted
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}
