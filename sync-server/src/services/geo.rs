//! Geo resolution and marking-code collaborators

use shared::ids::{OrderId, ProfileId};
use std::collections::HashMap;

/// GPS point of a warehouse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Render as the address string stored on FBS orders
    pub fn as_address(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Warehouse GPS lookup per seller profile
pub trait WarehouseLocator: Send + Sync {
    fn locate(&self, profile: ProfileId) -> Option<GeoPoint>;
}

/// Static warehouse registry (profile -> point)
pub struct StaticWarehouses {
    by_profile: HashMap<ProfileId, GeoPoint>,
}

impl StaticWarehouses {
    pub fn new(by_profile: HashMap<ProfileId, GeoPoint>) -> Self {
        Self { by_profile }
    }
}

impl WarehouseLocator for StaticWarehouses {
    fn locate(&self, profile: ProfileId) -> Option<GeoPoint> {
        self.by_profile.get(&profile).copied()
    }
}

/// Address normalization for merchant-delivered orders
pub trait Geocoder: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Identity normalization; the trait is the seam for a real resolver
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    fn normalize(&self, raw: &str) -> String {
        raw.trim().to_string()
    }
}

/// One marking code (честный знак) of an order exemplar
#[derive(Debug, Clone)]
pub struct SignMark {
    pub code: String,
    pub gtd: Option<String>,
}

/// Marking-code repository of the sign subsystem
pub trait SignRepository: Send + Sync {
    fn marks_for(&self, order: OrderId) -> Vec<SignMark>;
}

/// Fixed mark set; empty by default
#[derive(Default)]
pub struct StaticSigns {
    pub marks: Vec<SignMark>,
}

impl SignRepository for StaticSigns {
    fn marks_for(&self, _order: OrderId) -> Vec<SignMark> {
        self.marks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_address() {
        let point = GeoPoint {
            latitude: 55.755864,
            longitude: 37.617698,
        };
        assert_eq!(point.as_address(), "55.755864,37.617698");
    }

    #[test]
    fn test_noop_geocoder_trims() {
        assert_eq!(NoopGeocoder.normalize("  Москва, Тверская 1 "), "Москва, Тверская 1");
    }
}
