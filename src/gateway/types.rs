use serde::{Deserialize, Serialize};

pub const HOTELS_COLLECTION: &str = "hotels";
pub const USERS_COLLECTION: &str = "users";

/// Third-party identity providers offered on the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityProvider {
    Google,
}

impl IdentityProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityProvider::Google => "google",
        }
    }
}

/// What the identity provider hands back after a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Bearer token for subsequent gateway calls, if the backend issues one.
    #[serde(default, skip_serializing)]
    pub id_token: Option<String>,
}

/// Structured reply of the description generator:
/// `{ "recipe": { "hotelDescription": "..." } }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotelDescription {
    pub recipe: DescriptionRecipe,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRecipe {
    pub hotel_description: String,
}

impl HotelDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            recipe: DescriptionRecipe {
                hotel_description: text.into(),
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.recipe.hotel_description
    }
}
