use anyhow::Context;
use ble_sighting_reporter::domain::settings::{Settings, SettingsService};
use ble_sighting_reporter::infrastructure::bluetooth::radio::Radio;
use ble_sighting_reporter::infrastructure::bluetooth::replay::ReplayRadio;
use ble_sighting_reporter::infrastructure::bluetooth::ScanService;
use ble_sighting_reporter::infrastructure::keep_alive::ProcessKeepAlive;
use ble_sighting_reporter::infrastructure::logging;
use ble_sighting_reporter::infrastructure::upload::webdav::WebdavConfig;
use ble_sighting_reporter::infrastructure::upload::{RecordingUploader, Uploader, WebdavUploader};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay recorded advertisements from an NDJSON file, `-` for stdin
    #[arg(short, long)]
    replay: Option<String>,

    /// Report only this device address
    #[arg(long)]
    target_address: Option<String>,

    /// Report only this manufacturer (name or 0xNNNN identifier)
    #[arg(long)]
    target_manufacturer: Option<String>,

    /// Override the WebDAV resource URL
    #[arg(long)]
    webdav_url: Option<String>,

    /// Log reports instead of uploading them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings_service = match &args.config {
        Some(path) => SettingsService::from_path(path.clone())?,
        None => SettingsService::new().context("Failed to load settings")?,
    };
    {
        let settings = settings_service.get_mut();
        if let Some(address) = &args.target_address {
            settings.target_address = address.clone();
        }
        if let Some(manufacturer) = &args.target_manufacturer {
            settings.target_manufacturer = manufacturer.clone();
        }
        if let Some(url) = &args.webdav_url {
            settings.webdav_url = url.clone();
        }
    }
    let settings = settings_service.get().clone();

    let _log_guard =
        logging::init_logger(&settings.log_settings).context("Failed to initialize logging")?;
    info!(
        "Settings loaded from {}",
        settings_service.path().display()
    );

    if args.save {
        settings_service.save().context("Failed to save settings")?;
        info!("Settings saved");
    }

    if args.dry_run {
        run_with_radio(&args, &settings, Arc::new(RecordingUploader::new())).await
    } else {
        let uploader = WebdavUploader::new(WebdavConfig::from_settings(&settings))
            .context("Failed to build WebDAV client")?;
        run_with_radio(&args, &settings, Arc::new(uploader)).await
    }
}

async fn run_with_radio<U: Uploader>(
    args: &Args,
    settings: &Settings,
    uploader: Arc<U>,
) -> anyhow::Result<()> {
    match args.replay.as_deref() {
        Some("-") => {
            let radio = ReplayRadio::spawn(BufReader::new(tokio::io::stdin()));
            run(radio, settings, uploader).await
        }
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open replay file {}", path))?;
            run(ReplayRadio::spawn(BufReader::new(file)), settings, uploader).await
        }
        None => run_host(settings, uploader).await,
    }
}

#[cfg(feature = "btleplug")]
async fn run_host<U: Uploader>(settings: &Settings, uploader: Arc<U>) -> anyhow::Result<()> {
    use ble_sighting_reporter::infrastructure::bluetooth::host::BtleplugRadio;

    let radio = BtleplugRadio::new()
        .await
        .context("Bluetooth radio unavailable")?;
    run(radio, settings, uploader).await
}

#[cfg(not(feature = "btleplug"))]
async fn run_host<U: Uploader>(_settings: &Settings, _uploader: Arc<U>) -> anyhow::Result<()> {
    anyhow::bail!("No Bluetooth backend built in; use --replay or build with --features btleplug")
}

async fn run<R: Radio, U: Uploader>(
    radio: R,
    settings: &Settings,
    uploader: Arc<U>,
) -> anyhow::Result<()> {
    let mut service = ScanService::new(radio, uploader, Arc::new(ProcessKeepAlive::new()));

    if let Err(e) = service.start(settings).await {
        error!("Could not start scanning: {}", e);
        return Err(e.into());
    }

    let outcome = tokio::select! {
        result = service.wait() => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping scan");
            Ok(())
        }
    };

    service.stop().await;
    outcome.map_err(Into::into)
}
