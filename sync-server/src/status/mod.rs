//! Status propagation back to the marketplace
//!
//! Merchant-fulfilled (DBS) orders require the seller's system to report
//! fulfillment progress explicitly; marketplace-fulfilled orders additionally
//! need the awaiting-shipment transition once exemplar data is complete.

pub mod delivered_dbs;
pub mod delivery_dbs;
pub mod exemplar_info;
pub mod waiting_shipment;

pub use delivered_dbs::DeliveredDbsDispatcher;
pub use delivery_dbs::DeliveryDbsDispatcher;
pub use exemplar_info::ExemplarInfoDispatcher;
pub use waiting_shipment::WaitingShipmentDispatcher;
