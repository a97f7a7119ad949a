pub mod describer;
pub mod rest;
pub mod traits;
pub mod types;

/// Sent by every outgoing HTTP client.
pub(crate) const USER_AGENT: &str = concat!("hotel-hub/", env!("CARGO_PKG_VERSION"));

pub use describer::OpenAiDescriber;
pub use rest::RestGateway;
pub use traits::{AuthGateway, DescriptionGenerator, DocumentGateway, FileGateway};
pub use types::{Credential, HotelDescription, IdentityProvider, HOTELS_COLLECTION, USERS_COLLECTION};
