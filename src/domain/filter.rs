//! Target matching for raw advertisement events.
//!
//! The address check runs first and needs no decoding. The manufacturer
//! check decodes the frame and compares the resolved company name (or the
//! numeric identifier when the target is written as `0xNNNN`).

use crate::domain::advertisement;
use crate::domain::manufacturers;
use crate::domain::models::{RawEvent, ScanTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Neither a target address nor a manufacturer is configured
    NoTarget,
    Address,
    /// Frame could not be decoded
    Malformed,
    Manufacturer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ManufacturerTarget {
    Name(String),
    Id(u16),
}

#[derive(Debug, Clone)]
pub struct SightingFilter {
    address: Option<String>,
    manufacturer: Option<ManufacturerTarget>,
}

impl SightingFilter {
    pub fn new(target: &ScanTarget) -> Self {
        let manufacturer = target.manufacturer.as_deref().map(|m| {
            match manufacturers::parse_identifier(m) {
                Some(id) => ManufacturerTarget::Id(id),
                None => ManufacturerTarget::Name(m.to_string()),
            }
        });
        Self {
            address: target.address.clone(),
            manufacturer,
        }
    }

    /// Manufacturer name target that is not in the company table and so can
    /// never match. Identifier targets are always usable.
    pub fn unknown_manufacturer(&self) -> Option<&str> {
        match &self.manufacturer {
            Some(ManufacturerTarget::Name(name)) if manufacturers::id_for(name).is_none() => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn check(&self, event: &RawEvent) -> Result<(), Rejection> {
        if self.address.is_none() && self.manufacturer.is_none() {
            return Err(Rejection::NoTarget);
        }

        // Addresses arrive canonical uppercase, compare as-is
        if let Some(address) = &self.address {
            if event.address != *address {
                return Err(Rejection::Address);
            }
        }

        if let Some(target) = &self.manufacturer {
            let decoded =
                advertisement::decode(&event.data).map_err(|_| Rejection::Malformed)?;
            let matched = match target {
                ManufacturerTarget::Id(id) => decoded.manufacturer_id() == Some(*id),
                ManufacturerTarget::Name(name) => decoded.manufacturer_name() == Some(name.as_str()),
            };
            if !matched {
                return Err(Rejection::Manufacturer);
            }
        }

        Ok(())
    }
}
