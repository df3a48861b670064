//! Bluetooth Module
//!
//! Scans for advertisements from the configured target and reports them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      ScanService                         │
//! │  (Session lifecycle - public API for the application)    │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ spawns
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ScanCycleController                     │
//! │  (Scan windows, filter → decode → suppress → dispatch)   │
//! └───────┬─────────────────────────────────────┬───────────┘
//!         │                                     │
//!         ▼                                     ▼
//! ┌───────────────┐                    ┌─────────────────┐
//! │     Radio     │                    │ReportDispatcher │
//! │               │                    │                 │
//! │ - Simulated   │                    │ - one task per  │
//! │ - Replay      │                    │   upload        │
//! │ - btleplug    │                    └─────────────────┘
//! └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`radio`] - Radio capability and the in-process simulated adapter
//! - [`replay`] - Radio fed from recorded NDJSON advertisements
//! - `host` - Host adapter via btleplug (`btleplug` feature)
//! - [`controller`] - Scan cycle state machine
//! - [`dispatcher`] - Asynchronous report dispatch
//! - [`service`] - Session coordinator

pub mod controller;
pub mod dispatcher;
#[cfg(feature = "btleplug")]
pub mod host;
pub mod radio;
pub mod replay;
pub mod service;

// Re-export main service for convenience
pub use service::ScanService;
