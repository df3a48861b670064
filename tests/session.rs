use ble_sighting_reporter::domain::error::{RadioError, SessionError};
use ble_sighting_reporter::domain::models::CycleState;
use ble_sighting_reporter::domain::settings::Settings;
use ble_sighting_reporter::infrastructure::bluetooth::controller::MonotonicClock;
use ble_sighting_reporter::infrastructure::bluetooth::radio::SimulatedRadio;
use ble_sighting_reporter::infrastructure::bluetooth::replay::ReplayRadio;
use ble_sighting_reporter::infrastructure::bluetooth::ScanService;
use ble_sighting_reporter::infrastructure::keep_alive::ProcessKeepAlive;
use ble_sighting_reporter::infrastructure::upload::RecordingUploader;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

const APPLE_A: &str = "02010605FF4C000102000000";
const APPLE_B: &str = "02010605FF4C000103000000";
const MICROSOFT: &str = "02010603FF0600";

fn line(address: &str, data: &str, delay_ms: u64) -> String {
    format!(
        "{{\"address\":\"{}\",\"rssi\":-60,\"data\":\"{}\",\"delay_ms\":{}}}\n",
        address, data, delay_ms
    )
}

fn settings(address: &str, manufacturer: &str) -> Settings {
    Settings {
        target_address: address.into(),
        target_manufacturer: manufacturer.into(),
        ..Settings::default()
    }
}

struct Harness {
    service: ScanService<ReplayRadio, RecordingUploader, MonotonicClock>,
    radio: SimulatedRadio,
    uploader: Arc<RecordingUploader>,
    lock: Arc<ProcessKeepAlive>,
}

fn harness(lines: &[String]) -> Harness {
    let replay = ReplayRadio::spawn(Cursor::new(lines.concat().into_bytes()));
    let radio = replay.radio().clone();
    let uploader = Arc::new(RecordingUploader::new());
    let lock = Arc::new(ProcessKeepAlive::new());
    let service = ScanService::with_clock(
        replay,
        Arc::clone(&uploader),
        lock.clone(),
        MonotonicClock::new(),
    );
    Harness {
        service,
        radio,
        uploader,
        lock,
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_target_never_scans() {
    let mut h = harness(&[line("AA:BB:CC:DD:EE:FF", APPLE_A, 0)]);

    assert!(matches!(
        h.service.start(&settings("", "")).await,
        Err(SessionError::NoTarget)
    ));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.radio.start_count(), 0);
    assert!(h.uploader.reports().is_empty());
    assert!(!h.lock.is_held());
}

#[tokio::test(start_paused = true)]
async fn test_address_target_reports_only_that_device() {
    let mut h = harness(&[
        line("11:22:33:44:55:66", APPLE_A, 0),
        line("AA:BB:CC:DD:EE:FF", APPLE_A, 10),
        line("aa:bb:cc:dd:ee:ff", APPLE_B, 10),
    ]);

    h.service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let reports = h.uploader.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mac, "AA:BB:CC:DD:EE:FF");
    assert_eq!(reports[0].rssi, "-60");
    assert_eq!(reports[0].data, "0x02010605FF4C000102");

    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_manufacturer_target() {
    let mut h = harness(&[
        line("11:22:33:44:55:66", APPLE_A, 0),
        line("22:33:44:55:66:77", MICROSOFT, 10),
        line("33:44:55:66:77:88", APPLE_B, 10),
        line("44:55:66:77:88:99", "0A", 10),
    ]);

    h.service.start(&settings("", "Apple, Inc.")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let macs: Vec<String> = h.uploader.reports().into_iter().map(|r| r.mac).collect();
    assert_eq!(macs, vec!["11:22:33:44:55:66", "33:44:55:66:77:88"]);

    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_continuous_session_across_restarts() {
    let mut h = harness(&[
        line("AA:BB:CC:DD:EE:FF", APPLE_A, 0),
        // Repeat within the duplicate window
        line("AA:BB:CC:DD:EE:FF", APPLE_B, 200),
        // Next window, same content as the last report
        line("AA:BB:CC:DD:EE:FF", APPLE_A, 61_000),
        line("AA:BB:CC:DD:EE:FF", APPLE_B, 2_000),
    ]);

    h.service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(70)).await;

    assert_eq!(h.service.state(), CycleState::Scanning);
    assert_eq!(h.radio.start_count(), 2);
    assert_eq!(h.radio.stop_count(), 1);

    let data: Vec<String> = h.uploader.reports().into_iter().map(|r| r.data).collect();
    assert_eq!(
        data,
        vec!["0x02010605FF4C000102", "0x02010605FF4C000103"]
    );

    h.service.stop().await;
    assert_eq!(h.service.state(), CycleState::Idle);
    assert!(!h.radio.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_does_not_stop_session() {
    let mut h = harness(&[
        line("11:22:33:44:55:66", APPLE_A, 0),
        line("22:33:44:55:66:77", APPLE_A, 10),
    ]);
    h.uploader.fail_next(1);

    h.service.start(&settings("", "0x004C")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(h.service.is_running());
    let reports = h.uploader.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mac, "22:33:44:55:66:77");

    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_released_when_radio_lost() {
    let mut h = harness(&[]);

    h.service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
    assert!(h.lock.is_held());

    h.radio.set_enabled(false);
    assert!(matches!(
        h.service.wait().await,
        Err(SessionError::RadioUnavailable(RadioError::StreamClosed))
    ));
    assert!(!h.lock.is_held());
    assert!(!h.service.is_running());
}
