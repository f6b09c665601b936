//! The seams of the engine: the persistence trait the flow API is generic over, the data objects
//! that cross it, and the external collaborator interfaces (geocoding, messaging).

mod collaborators;
mod data_objects;
mod order_gateway_database;

pub use collaborators::{
    AddressComponents, CollaboratorError, Geocoder, LogOnlyMessenger, Messenger, NullGeocoder,
};
pub use data_objects::{
    BatchDraft, CheckoutPlan, OrderItemDraft, OrderWithChildren, PlacedOrder, PurchasedItem,
    SubOrderDraft,
};
pub use order_gateway_database::{OrderGatewayDatabase, OrderGatewayError};
