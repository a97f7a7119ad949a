//! Confirm-then-delete dialog for a single hotel.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{HotelError, HotelResult};
use crate::hotels::form::RefreshCallback;
use crate::hotels::query::HotelQueryLayer;
use crate::hotels::repository::HotelRepository;
use crate::notice::Notices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePhase {
    Closed,
    Confirming { id: String, name: String },
    Deleting { id: String, name: String },
}

struct DeleteInner {
    phase: DeletePhase,
    error: Option<String>,
}

#[derive(Clone)]
pub struct DeleteFlow {
    repository: HotelRepository,
    queries: HotelQueryLayer,
    notices: Notices,
    on_refresh: Option<RefreshCallback>,
    inner: Arc<Mutex<DeleteInner>>,
}

impl DeleteFlow {
    pub fn new(repository: HotelRepository, queries: HotelQueryLayer, notices: Notices) -> Self {
        Self {
            repository,
            queries,
            notices,
            on_refresh: None,
            inner: Arc::new(Mutex::new(DeleteInner {
                phase: DeletePhase::Closed,
                error: None,
            })),
        }
    }

    pub fn with_refresh(mut self, on_refresh: RefreshCallback) -> Self {
        self.on_refresh = Some(on_refresh);
        self
    }

    fn guard(&self) -> MutexGuard<'_, DeleteInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> DeletePhase {
        self.guard().phase.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.guard().error.clone()
    }

    /// Ask for confirmation before deleting `id`. Ignored while a delete runs.
    pub fn request(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut inner = self.guard();
        if matches!(inner.phase, DeletePhase::Deleting { .. }) {
            return;
        }
        inner.phase = DeletePhase::Confirming {
            id: id.into(),
            name: name.into(),
        };
        inner.error = None;
    }

    pub fn cancel(&self) {
        let mut inner = self.guard();
        if matches!(inner.phase, DeletePhase::Confirming { .. }) {
            inner.phase = DeletePhase::Closed;
            inner.error = None;
        }
    }

    pub async fn confirm(&self) -> HotelResult<()> {
        let (id, name) = {
            let mut inner = self.guard();
            let DeletePhase::Confirming { id, name } = inner.phase.clone() else {
                return Err(HotelError::validation("No hotel selected for deletion"));
            };
            if id.trim().is_empty() {
                let err = HotelError::validation("A hotel id is required to delete a hotel");
                inner.error = Some(err.to_string());
                return Err(err);
            }
            inner.phase = DeletePhase::Deleting {
                id: id.clone(),
                name: name.clone(),
            };
            inner.error = None;
            (id, name)
        };

        let result = self.repository.delete(&id).await.map_err(HotelError::from);

        {
            let mut inner = self.guard();
            match &result {
                Ok(()) => inner.phase = DeletePhase::Closed,
                Err(err) => {
                    inner.phase = DeletePhase::Confirming {
                        id: id.clone(),
                        name: name.clone(),
                    };
                    inner.error = Some(err.to_string());
                }
            }
        }

        match &result {
            Ok(()) => {
                self.notices.success(format!("Hotel {name} deleted successfully"));
                self.queries.invalidate_all();
                if let Some(on_refresh) = &self.on_refresh {
                    on_refresh();
                }
                debug!("Delete of {} confirmed", id);
            }
            Err(err) => self.notices.error(format!("Error deleting hotel: {err}")),
        }
        result
    }
}
