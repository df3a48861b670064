//! Domain Module
//!
//! Platform-independent sighting logic: advertisement decoding, target
//! filtering, duplicate suppression and the shared data model.
//!
//! ```text
//! RawEvent ─► SightingFilter ─► advertisement ─► DuplicateSuppressor ─► Sighting
//!                 │                   │
//!                 └── manufacturers ◄─┘
//! ```

pub mod advertisement;
pub mod error;
pub mod filter;
pub mod manufacturers;
pub mod models;
pub mod settings;
pub mod suppression;
