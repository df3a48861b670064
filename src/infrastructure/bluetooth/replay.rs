//! Replay radio
//!
//! Feeds recorded advertisements into a [`SimulatedRadio`]. Input is NDJSON,
//! one event per line:
//!
//! ```text
//! {"address":"AA:BB:CC:DD:EE:FF","rssi":-61,"data":"02010605FF4C000102","delay_ms":250}
//! ```
//!
//! `delay_ms` (optional) is waited before the line is delivered. Lines are
//! held back while no scan window is open, the same way a real adapter only
//! reports while scanning.

use crate::domain::error::RadioError;
use crate::domain::models::RawEvent;
use crate::infrastructure::bluetooth::radio::{
    EventReceiver, Radio, ScanFilter, ScanSettings, SimulatedRadio,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ReplayLine {
    #[serde(flatten)]
    event: RawEvent,
    #[serde(default)]
    delay_ms: u64,
}

pub struct ReplayRadio {
    radio: SimulatedRadio,
    feeder: JoinHandle<()>,
}

impl ReplayRadio {
    /// Start replaying `reader` into a fresh simulated adapter.
    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let radio = SimulatedRadio::new();
        let feeder = tokio::spawn(feed(reader, radio.clone()));
        Self { radio, feeder }
    }

    pub fn radio(&self) -> &SimulatedRadio {
        &self.radio
    }

    pub fn is_finished(&self) -> bool {
        self.feeder.is_finished()
    }
}

async fn feed<R>(reader: R, radio: SimulatedRadio)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut scanning = radio.subscribe();
    let mut line_no = 0usize;
    let mut delivered = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Replay input error: {}", e);
                break;
            }
        };
        line_no += 1;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed: ReplayLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping replay line {}: {}", line_no, e);
                continue;
            }
        };

        if parsed.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(parsed.delay_ms)).await;
        }

        // Hold the event until a scan window is open
        if scanning.wait_for(|on| *on).await.is_err() {
            break;
        }
        if radio.inject(parsed.event) {
            delivered += 1;
        } else {
            debug!("Replay line {} filtered by radio", line_no);
        }
    }

    info!("Replay finished: {} events delivered", delivered);
}

impl Radio for ReplayRadio {
    fn start_scan(
        &mut self,
        filter: &ScanFilter,
        settings: &ScanSettings,
    ) -> Result<EventReceiver, RadioError> {
        self.radio.start_scan(filter, settings)
    }

    fn stop_scan(&mut self) {
        self.radio.stop_scan()
    }

    async fn shutdown(&mut self) {
        self.radio.shutdown().await
    }
}

impl Drop for ReplayRadio {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ScanTarget;

    #[tokio::test(start_paused = true)]
    async fn test_replays_lines_once_scanning() {
        let input = concat!(
            "# recorded on bench\n",
            "{\"address\":\"AA:BB:CC:DD:EE:FF\",\"rssi\":-61,\"data\":\"020106\"}\n",
            "not json\n",
            "{\"address\":\"11:22:33:44:55:66\",\"rssi\":-70,\"data\":\"020106\",\"delay_ms\":50}\n",
        );
        let mut replay = ReplayRadio::spawn(std::io::Cursor::new(input.as_bytes().to_vec()));

        // Nothing is lost while the window is still closed
        tokio::time::sleep(Duration::from_millis(10)).await;
        let filter = ScanFilter::for_target(&ScanTarget::from_preferences("", "Apple, Inc."));
        let mut rx = replay
            .start_scan(&filter, &ScanSettings::default())
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(first.rssi, -61);
        assert_eq!(first.data, vec![0x02, 0x01, 0x06]);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.address, "11:22:33:44:55:66");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(replay.is_finished());
    }
}
