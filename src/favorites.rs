//! Favorites store: hotels this profile has marked as favorite
//!
//! Entries are full [`Hotel`] snapshots taken at the moment of favoriting,
//! unique by id. The list is read once from durable storage when the store is
//! built; afterwards the in-memory list is authoritative and every change is
//! mirrored back to storage as JSON under [`FAVORITES_KEY`]. Storage failures
//! are logged and never reach the caller.
//!
//! Views that need to re-render on change call [`FavoritesStore::subscribe`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::models::Hotel;
use crate::storage::KeyValueStore;

pub const FAVORITES_KEY: &str = "favorites";

#[derive(Clone)]
pub struct FavoritesStore {
    storage: Arc<dyn KeyValueStore>,
    favorites: Arc<watch::Sender<Vec<Hotel>>>,
}

impl FavoritesStore {
    /// Build the store and hydrate it from `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = hydrate(storage.as_ref());
        let (sender, _) = watch::channel(initial);
        Self {
            storage,
            favorites: Arc::new(sender),
        }
    }

    /// Add a snapshot of `hotel`. Does nothing if it is already a favorite.
    pub fn add_favorite(&self, hotel: &Hotel) {
        let added = self.favorites.send_if_modified(|list| {
            if list.iter().any(|fav| fav.id == hotel.id) {
                return false;
            }
            list.push(hotel.clone());
            true
        });
        if added {
            debug!("Added {} to favorites", hotel.id);
            self.persist();
        }
    }

    pub fn remove_favorite(&self, hotel_id: &str) {
        let removed = self.favorites.send_if_modified(|list| {
            let before = list.len();
            list.retain(|fav| fav.id != hotel_id);
            list.len() != before
        });
        if removed {
            debug!("Removed {} from favorites", hotel_id);
            self.persist();
        }
    }

    /// Flip the favorite state of `hotel`; returns whether it is now a favorite.
    pub fn toggle_favorite(&self, hotel: &Hotel) -> bool {
        if self.is_favorite(&hotel.id) {
            self.remove_favorite(&hotel.id);
            false
        } else {
            self.add_favorite(hotel);
            true
        }
    }

    pub fn is_favorite(&self, hotel_id: &str) -> bool {
        self.favorites.borrow().iter().any(|fav| fav.id == hotel_id)
    }

    pub fn favorites_count(&self) -> usize {
        self.favorites.borrow().len()
    }

    pub fn favorites(&self) -> Vec<Hotel> {
        self.favorites.borrow().clone()
    }

    /// Receiver that is notified after every effective change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Hotel>> {
        self.favorites.subscribe()
    }

    fn persist(&self) {
        let serialized = serde_json::to_string(&*self.favorites.borrow());
        match serialized {
            Ok(raw) => {
                if let Err(e) = self.storage.set(FAVORITES_KEY, &raw) {
                    error!("Error saving favorites: {:#}", e);
                }
            }
            Err(e) => error!("Error serializing favorites: {}", e),
        }
    }
}

fn hydrate(storage: &dyn KeyValueStore) -> Vec<Hotel> {
    match storage.get(FAVORITES_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<Hotel>>(&raw) {
            Ok(list) => {
                debug!("Loaded {} favorites", list.len());
                list
            }
            Err(e) => {
                warn!("Error loading favorites, starting empty: {}", e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Error reading favorites, starting empty: {:#}", e);
            Vec::new()
        }
    }
}
