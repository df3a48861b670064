//! BLE sighting reporter
//!
//! Scans for BLE advertisements in fixed windows, keeps the ones matching a
//! configured device address and/or manufacturer, drops duplicate reports
//! and forwards each remaining sighting to a WebDAV store.
//!
//! - [`domain`] - pure decoding, filtering and suppression logic
//! - [`infrastructure`] - radio adapters, scan cycle, uploads, logging

pub mod domain;
pub mod infrastructure;
