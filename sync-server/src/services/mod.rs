//! External collaborators
//!
//! Token registry, product catalog, geo resolution and the marking-code
//! repository live in other systems; these traits are the integration
//! points. File-backed implementations cover the standalone deployment and
//! the tests.

pub mod catalog;
pub mod geo;
pub mod tokens;

pub use catalog::{CatalogProduct, CatalogResolver, FileCatalog};
pub use geo::{
    Geocoder, GeoPoint, NoopGeocoder, SignMark, SignRepository, StaticSigns, StaticWarehouses,
    WarehouseLocator,
};
pub use tokens::{FileTokens, ProfileToken, TokenProvider};
