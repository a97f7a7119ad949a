use std::str::FromStr;

use crate::error::HotelError;
use crate::models::Hotel;

/// Category filter of the dashboard table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    /// 1 to 5 stars.
    Stars(u8),
}

impl CategoryFilter {
    pub fn stars(stars: u8) -> Result<Self, HotelError> {
        if (1..=5).contains(&stars) {
            Ok(CategoryFilter::Stars(stars))
        } else {
            Err(HotelError::validation(format!("Invalid star filter: {stars}")))
        }
    }

    fn matches(self, hotel: &Hotel) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Stars(stars) => hotel.category.stars() == stars,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CategoryFilter::All),
            other => other
                .parse::<u8>()
                .map_err(|_| HotelError::validation(format!("Invalid category filter: {other}")))
                .and_then(CategoryFilter::stars),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    fn matches(self, hotel: &Hotel) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => hotel.active,
            StatusFilter::Inactive => !hotel.active,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "true" => Ok(StatusFilter::Active),
            "false" => Ok(StatusFilter::Inactive),
            other => Err(HotelError::validation(format!("Invalid status filter: {other}"))),
        }
    }
}

/// In-memory filters over an already loaded hotel list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HotelFilters {
    pub category: CategoryFilter,
    pub status: StatusFilter,
    /// Exact city, compared case-insensitively.
    pub city: Option<String>,
    /// Case-insensitive substring of the hotel name.
    pub name: Option<String>,
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalized(term: &Option<String>) -> Option<String> {
    term.as_deref().map(fold).filter(|term| !term.is_empty())
}

impl HotelFilters {
    pub fn is_empty(&self) -> bool {
        *self == HotelFilters::default()
    }

    pub fn matches(&self, hotel: &Hotel) -> bool {
        let city_ok = normalized(&self.city)
            .map_or(true, |city| fold(&hotel.city) == city);
        let name_ok = normalized(&self.name)
            .map_or(true, |name| hotel.name.to_lowercase().contains(&name));
        self.category.matches(hotel) && self.status.matches(hotel) && city_ok && name_ok
    }

    /// Matching hotels, in their original order.
    pub fn apply(&self, hotels: &[Hotel]) -> Vec<Hotel> {
        hotels.iter().filter(|hotel| self.matches(hotel)).cloned().collect()
    }
}

/// Distinct cities of `hotels` in first-seen order, for the location select.
/// Two spellings are the same city exactly when the city filter treats them so.
pub fn cities(hotels: &[Hotel]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut folded: Vec<String> = Vec::new();
    for hotel in hotels {
        let key = fold(&hotel.city);
        if !folded.contains(&key) {
            folded.push(key);
            seen.push(hotel.city.clone());
        }
    }
    seen
}
