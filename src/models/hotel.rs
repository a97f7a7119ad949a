use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Star category of a hotel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Category {
    Three,
    Four,
    Five,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Three, Category::Four, Category::Five];

    pub fn stars(self) -> u8 {
        match self {
            Category::Three => 3,
            Category::Four => 4,
            Category::Five => 5,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Three
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        match stars {
            3 => Ok(Category::Three),
            4 => Ok(Category::Four),
            5 => Ok(Category::Five),
            other => Err(format!("unsupported hotel category: {other}")),
        }
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> Self {
        category.stars()
    }
}

/// Inventory for one room type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RoomInventory {
    #[serde(default)]
    pub enabled: bool,
    pub available: u32,
    pub price: f64,
}

/// The closed set of room types a hotel can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    Single,
    Twin,
    Queen,
}

impl RoomKind {
    pub const ALL: [RoomKind; 3] = [RoomKind::Single, RoomKind::Twin, RoomKind::Queen];

    pub fn label(self) -> &'static str {
        match self {
            RoomKind::Single => "Single Room",
            RoomKind::Twin => "Two Twin Bedroom",
            RoomKind::Queen => "One Queen Bedroom",
        }
    }
}

/// Room inventory, one member per room type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rooms {
    pub single_room: RoomInventory,
    pub twin_room: RoomInventory,
    pub queen_room: RoomInventory,
}

impl Rooms {
    pub fn get(&self, kind: RoomKind) -> &RoomInventory {
        match kind {
            RoomKind::Single => &self.single_room,
            RoomKind::Twin => &self.twin_room,
            RoomKind::Queen => &self.queen_room,
        }
    }

    pub fn get_mut(&mut self, kind: RoomKind) -> &mut RoomInventory {
        match kind {
            RoomKind::Single => &mut self.single_room,
            RoomKind::Twin => &mut self.twin_room,
            RoomKind::Queen => &mut self.queen_room,
        }
    }

    /// Room types currently offered, in display order.
    pub fn offered(&self) -> impl Iterator<Item = (RoomKind, &RoomInventory)> + '_ {
        RoomKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
            .filter(|(_, room)| room.enabled)
    }
}

/// One picture in a hotel gallery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Hotel record as stored in the `hotels` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub country: String,
    pub state: String,
    pub city: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub category: Category,
    pub rating: f32,
    pub rooms: Rooms,
    #[serde(default)]
    pub gallery: Vec<GalleryImage>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    pub fn has_images(&self) -> bool {
        !self.gallery.is_empty()
    }

    /// "City, State, Country" as shown on cards and the detail page.
    pub fn location(&self) -> String {
        format!("{}, {}, {}", self.city, self.state, self.country)
    }

    /// Image shown first: the first gallery picture, else the logo.
    pub fn cover_image(&self) -> Option<&str> {
        self.gallery
            .first()
            .map(|image| image.url.as_str())
            .or_else(|| (!self.logo.is_empty()).then_some(self.logo.as_str()))
    }
}
