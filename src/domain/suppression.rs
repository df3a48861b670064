use crate::domain::models::Sighting;
use chrono::{DateTime, Duration, Local};

/// Repeats from the same device inside this window are dropped.
pub const DUPLICATE_WINDOW_MS: i64 = 1000;

/// Last admitted sighting. Owned by a single running session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionState {
    pub last_address: String,
    pub last_timestamp: Option<DateTime<Local>>,
    pub last_payload_hex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Report,
    /// Same device inside the duplicate window
    TooSoon,
    /// Same device, byte-for-byte unchanged payload
    SameContent,
}

#[derive(Debug, Default)]
pub struct DuplicateSuppressor {
    state: SuppressionState,
}

impl DuplicateSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SuppressionState {
        &self.state
    }

    /// Decide whether `sighting` should be reported. State only moves on
    /// [`Verdict::Report`].
    pub fn admit(&mut self, sighting: &Sighting) -> Verdict {
        if sighting.address == self.state.last_address {
            if let Some(last) = self.state.last_timestamp {
                // Negative elapsed (clock stepped back) counts as too soon
                if sighting.observed_at - last < Duration::milliseconds(DUPLICATE_WINDOW_MS) {
                    return Verdict::TooSoon;
                }
            }
            if sighting.payload_hex == self.state.last_payload_hex {
                return Verdict::SameContent;
            }
        }

        self.state = SuppressionState {
            last_address: sighting.address.clone(),
            last_timestamp: Some(sighting.observed_at),
            last_payload_hex: sighting.payload_hex.clone(),
        };
        Verdict::Report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn sighting(address: &str, payload: &str, ms: i64) -> Sighting {
        Sighting {
            address: address.to_string(),
            rssi: -70,
            payload_hex: payload.to_string(),
            observed_at: at(ms),
        }
    }

    #[test]
    fn test_first_sighting_reported() {
        let mut suppressor = DuplicateSuppressor::new();
        assert_eq!(suppressor.admit(&sighting("A", "0x01", 0)), Verdict::Report);
        assert_eq!(suppressor.state().last_address, "A");
        assert_eq!(suppressor.state().last_timestamp, Some(at(0)));
        assert_eq!(suppressor.state().last_payload_hex, "0x01");
    }

    #[test]
    fn test_same_address_within_window_suppressed_regardless_of_payload() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 0));
        assert_eq!(suppressor.admit(&sighting("A", "0x01", 500)), Verdict::TooSoon);
        assert_eq!(suppressor.admit(&sighting("A", "0x02", 999)), Verdict::TooSoon);
    }

    #[test]
    fn test_same_payload_after_window_suppressed() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 0));
        assert_eq!(suppressor.admit(&sighting("A", "0x01", 1000)), Verdict::SameContent);
        assert_eq!(suppressor.admit(&sighting("A", "0x01", 3_600_000)), Verdict::SameContent);
    }

    #[test]
    fn test_changed_payload_after_window_reported() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 0));
        assert_eq!(suppressor.admit(&sighting("A", "0x02", 1000)), Verdict::Report);
        assert_eq!(suppressor.state().last_payload_hex, "0x02");
    }

    #[test]
    fn test_suppressed_sightings_do_not_move_state() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 0));
        suppressor.admit(&sighting("A", "0x02", 600));
        // Window measured from the admitted sighting, not the suppressed one
        assert_eq!(suppressor.admit(&sighting("A", "0x02", 1100)), Verdict::Report);
    }

    #[test]
    fn test_other_address_never_suppressed() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 0));
        assert_eq!(suppressor.admit(&sighting("B", "0x01", 10)), Verdict::Report);
        // B replaced A as the last report, so A is fresh again
        assert_eq!(suppressor.admit(&sighting("A", "0x01", 20)), Verdict::Report);
    }

    #[test]
    fn test_clock_step_back_is_too_soon() {
        let mut suppressor = DuplicateSuppressor::new();
        suppressor.admit(&sighting("A", "0x01", 5000));
        assert_eq!(suppressor.admit(&sighting("A", "0x02", 0)), Verdict::TooSoon);
    }
}
