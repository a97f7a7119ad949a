//! Hotel create/edit flow
//!
//! [`HotelForm`] holds the values of the modal; [`HotelFormFlow`] drives it:
//!
//! ```text
//! Closed ──open_create──────────────────────────▶ Editing
//! Closed ──open_edit──▶ LoadingExisting ──ok───▶ Editing
//!                                      └─err──▶ Closed
//! Editing ──submit──▶ Submitting ──ok──▶ Closed
//!                               └─err─▶ Editing (error shown)
//! ```
//!
//! Each open bumps an epoch. A load, description or submit result that comes
//! back after the flow was closed or reopened is dropped instead of being
//! written into the new form.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HotelError, HotelResult};
use crate::gateway::DescriptionGenerator;
use crate::hotels::query::{HotelQuery, HotelQueryLayer, QueryMode};
use crate::hotels::repository::{HotelRepository, StagedFile};
use crate::models::{Category, GalleryImage, Hotel, RoomKind, Rooms, User};
use crate::notice::Notices;
use crate::session::SessionStore;

pub const DEFAULT_DESCRIPTION_LANGUAGE: &str = "Spanish";

/// Values of the hotel modal
#[derive(Debug, Clone, PartialEq)]
pub struct HotelForm {
    pub name: String,
    pub description: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub active: bool,
    pub category: Option<Category>,
    pub rating: f32,
    rooms: Rooms,
    /// Logo URL already stored on the hotel.
    pub existing_logo: Option<String>,
    /// Gallery already stored on the hotel, in stored order.
    pub existing_gallery: Vec<GalleryImage>,
    staged_logo: Option<StagedFile>,
    staged_gallery: Vec<StagedFile>,
}

impl Default for HotelForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            country: String::new(),
            state: String::new(),
            city: String::new(),
            active: true,
            category: Some(Category::Three),
            rating: 4.0,
            rooms: Rooms::default(),
            existing_logo: None,
            existing_gallery: Vec::new(),
            staged_logo: None,
            staged_gallery: Vec::new(),
        }
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

impl HotelForm {
    pub fn from_hotel(hotel: &Hotel) -> Self {
        Self {
            name: hotel.name.clone(),
            description: hotel.description.clone(),
            country: hotel.country.clone(),
            state: hotel.state.clone(),
            city: hotel.city.clone(),
            active: hotel.active,
            category: Some(hotel.category),
            rating: hotel.rating,
            rooms: hotel.rooms,
            existing_logo: (!hotel.logo.is_empty()).then(|| hotel.logo.clone()),
            existing_gallery: hotel.gallery.clone(),
            staged_logo: None,
            staged_gallery: Vec::new(),
        }
    }

    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    /// Availability and price inputs follow the room's `enabled` flag.
    pub fn is_room_editable(&self, kind: RoomKind) -> bool {
        self.rooms.get(kind).enabled
    }

    /// Values entered for the room are kept when it is disabled.
    pub fn set_room_enabled(&mut self, kind: RoomKind, enabled: bool) {
        self.rooms.get_mut(kind).enabled = enabled;
    }

    pub fn set_room_available(&mut self, kind: RoomKind, available: u32) -> HotelResult<()> {
        self.editable_room(kind)?;
        self.rooms.get_mut(kind).available = available;
        Ok(())
    }

    pub fn set_room_price(&mut self, kind: RoomKind, price: f64) -> HotelResult<()> {
        self.editable_room(kind)?;
        if !price.is_finite() || price < 0.0 {
            return Err(HotelError::validation("Price must be zero or more"));
        }
        self.rooms.get_mut(kind).price = price;
        Ok(())
    }

    fn editable_room(&self, kind: RoomKind) -> HotelResult<()> {
        if self.is_room_editable(kind) {
            Ok(())
        } else {
            Err(HotelError::validation(format!("{} is not offered", kind.label())))
        }
    }

    /// Rooms as written to the hotel: disabled room types carry no inventory.
    pub fn submitted_rooms(&self) -> Rooms {
        let mut rooms = self.rooms;
        for kind in RoomKind::ALL {
            let room = rooms.get_mut(kind);
            if !room.enabled {
                room.available = 0;
                room.price = 0.0;
            }
        }
        rooms
    }

    pub fn stage_gallery_file(&mut self, file: StagedFile) {
        self.staged_gallery.push(file);
    }

    pub fn unstage_gallery_file(&mut self, index: usize) -> Option<StagedFile> {
        (index < self.staged_gallery.len()).then(|| self.staged_gallery.remove(index))
    }

    pub fn staged_gallery(&self) -> &[StagedFile] {
        &self.staged_gallery
    }

    pub fn stage_logo(&mut self, file: StagedFile) {
        self.staged_logo = Some(file);
    }

    pub fn clear_staged_logo(&mut self) {
        self.staged_logo = None;
    }

    pub fn staged_logo(&self) -> Option<&StagedFile> {
        self.staged_logo.as_ref()
    }

    pub fn can_generate_description(&self) -> bool {
        filled(&self.name)
            && filled(&self.country)
            && filled(&self.state)
            && filled(&self.city)
            && self.category.is_some()
    }

    pub fn description_prompt(&self, language: &str) -> String {
        let stars = self.category.map(Category::stars).unwrap_or_default();
        format!(
            "Describe this hotel in {language} using the following information: \
             name: {}, country: {}, state: {}, city: {}, category: {stars} stars",
            self.name.trim(),
            self.country.trim(),
            self.state.trim(),
            self.city.trim(),
        )
    }

    /// Checks run before any upload or write.
    pub fn validate(&self) -> HotelResult<Category> {
        if !filled(&self.name) {
            return Err(HotelError::validation("Hotel name is required"));
        }
        if !(filled(&self.country) && filled(&self.state) && filled(&self.city)) {
            return Err(HotelError::validation("Country, state and city are required"));
        }
        if !(1.0..=5.0).contains(&self.rating) {
            return Err(HotelError::validation("Rating must be between 1 and 5"));
        }
        self.category
            .ok_or_else(|| HotelError::validation("Select a hotel category"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Closed,
    LoadingExisting,
    Editing,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

/// Invoked after a successful write so listings can refetch.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

struct FormInner {
    phase: FormPhase,
    mode: FormMode,
    form: HotelForm,
    existing: Option<Hotel>,
    error: Option<String>,
    generating: bool,
    epoch: u64,
}

impl FormInner {
    fn reset(&mut self) {
        self.phase = FormPhase::Closed;
        self.mode = FormMode::Create;
        self.form = HotelForm::default();
        self.existing = None;
        self.error = None;
        self.generating = false;
        self.epoch += 1;
    }
}

#[derive(Clone)]
pub struct HotelFormFlow {
    queries: HotelQueryLayer,
    repository: HotelRepository,
    session: SessionStore,
    describer: Arc<dyn DescriptionGenerator>,
    notices: Notices,
    language: String,
    on_refresh: Option<RefreshCallback>,
    inner: Arc<Mutex<FormInner>>,
}

impl HotelFormFlow {
    pub fn new(
        queries: HotelQueryLayer,
        repository: HotelRepository,
        session: SessionStore,
        describer: Arc<dyn DescriptionGenerator>,
        notices: Notices,
    ) -> Self {
        Self {
            queries,
            repository,
            session,
            describer,
            notices,
            language: DEFAULT_DESCRIPTION_LANGUAGE.to_string(),
            on_refresh: None,
            inner: Arc::new(Mutex::new(FormInner {
                phase: FormPhase::Closed,
                mode: FormMode::Create,
                form: HotelForm::default(),
                existing: None,
                error: None,
                generating: false,
                epoch: 0,
            })),
        }
    }

    pub fn with_refresh(mut self, on_refresh: RefreshCallback) -> Self {
        self.on_refresh = Some(on_refresh);
        self
    }

    pub fn with_description_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn guard(&self) -> MutexGuard<'_, FormInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> FormPhase {
        self.guard().phase
    }

    pub fn mode(&self) -> FormMode {
        self.guard().mode.clone()
    }

    /// Inline error of the last failed load or submit.
    pub fn error(&self) -> Option<String> {
        self.guard().error.clone()
    }

    pub fn form(&self) -> HotelForm {
        self.guard().form.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.guard().generating
    }

    pub fn open_create(&self) {
        let mut inner = self.guard();
        inner.reset();
        inner.phase = FormPhase::Editing;
    }

    /// Open for an existing hotel and load it through the single-hotel query.
    pub async fn open_edit(&self, hotel_id: &str) -> HotelResult<()> {
        let query = HotelQuery::from_mode(QueryMode::Single, Some(hotel_id))?;
        let id = hotel_id.trim().to_string();

        let epoch = {
            let mut inner = self.guard();
            inner.reset();
            inner.phase = FormPhase::LoadingExisting;
            inner.mode = FormMode::Edit(id.clone());
            inner.epoch
        };

        let loaded = self.queries.fetch(&query).await.and_then(|hotels| {
            hotels
                .into_iter()
                .next()
                .ok_or_else(|| HotelError::Gateway("Hotel not found".to_string()))
        });

        let mut inner = self.guard();
        if inner.epoch != epoch {
            debug!("Dropping hotel {} loaded after the form closed", id);
            return Ok(());
        }
        match loaded {
            Ok(hotel) => {
                inner.form = HotelForm::from_hotel(&hotel);
                inner.existing = Some(hotel);
                inner.phase = FormPhase::Editing;
                Ok(())
            }
            Err(err) => {
                inner.phase = FormPhase::Closed;
                inner.error = Some(err.to_string());
                drop(inner);
                self.notices.error(format!("Error loading hotel: {err}"));
                Err(err)
            }
        }
    }

    pub fn close(&self) {
        self.guard().reset();
    }

    /// Change form values. Only possible while editing.
    pub fn edit<R>(&self, change: impl FnOnce(&mut HotelForm) -> R) -> HotelResult<R> {
        let mut inner = self.guard();
        if inner.phase != FormPhase::Editing {
            return Err(HotelError::validation("The form is not editable right now"));
        }
        Ok(change(&mut inner.form))
    }

    pub fn can_generate_description(&self) -> bool {
        let inner = self.guard();
        inner.phase == FormPhase::Editing && !inner.generating && inner.form.can_generate_description()
    }

    /// Ask the description service for a text and replace the description
    /// with it. On failure the current description stays. A text arriving
    /// after the form was closed or reopened is discarded with a validation
    /// error.
    pub async fn generate_description(&self) -> HotelResult<String> {
        let (epoch, prompt) = {
            let mut inner = self.guard();
            if inner.phase != FormPhase::Editing || inner.generating {
                return Err(HotelError::validation("The form is not editable right now"));
            }
            if !inner.form.can_generate_description() {
                return Err(HotelError::validation(
                    "Fill in name, country, state, city and category first",
                ));
            }
            inner.generating = true;
            (inner.epoch, inner.form.description_prompt(&self.language))
        };

        let result = self.describer.describe(&prompt).await;

        let mut inner = self.guard();
        if inner.epoch != epoch {
            debug!("Dropping description generated after the form closed");
            return Err(HotelError::validation(
                "The form was closed before the description arrived",
            ));
        }
        inner.generating = false;
        match result {
            Ok(description) => {
                let text = description.text().to_string();
                inner.form.description = text.clone();
                Ok(text)
            }
            Err(e) => {
                drop(inner);
                let err = HotelError::from(e);
                self.notices.error(format!("Error generating description: {err}"));
                Err(err)
            }
        }
    }

    /// Upload staged files and write the hotel.
    pub async fn submit(&self) -> HotelResult<Hotel> {
        self.session.load();
        let (epoch, mode, form, existing, user) = {
            let mut inner = self.guard();
            if inner.phase != FormPhase::Editing {
                return Err(HotelError::validation("The form is not ready to be saved"));
            }
            let Some(user) = self.session.current_user() else {
                let err = HotelError::validation("You must be signed in to save a hotel");
                inner.error = Some(err.to_string());
                return Err(err);
            };
            if let Err(err) = inner.form.validate() {
                inner.error = Some(err.to_string());
                return Err(err);
            }
            inner.phase = FormPhase::Submitting;
            inner.error = None;
            (
                inner.epoch,
                inner.mode.clone(),
                inner.form.clone(),
                inner.existing.clone(),
                user,
            )
        };

        let result = self.save(&mode, &form, existing.as_ref(), &user).await;

        {
            let mut inner = self.guard();
            if inner.epoch != epoch {
                debug!("Form closed while saving, result not shown");
                return result;
            }
            match &result {
                Ok(_) => inner.reset(),
                Err(err) => {
                    inner.phase = FormPhase::Editing;
                    inner.error = Some(err.to_string());
                }
            }
        }

        match &result {
            Ok(hotel) => {
                let verb = match mode {
                    FormMode::Create => "created",
                    FormMode::Edit(_) => "updated",
                };
                self.notices.success(format!("Hotel {verb} successfully"));
                self.queries.invalidate_all();
                if let Some(on_refresh) = &self.on_refresh {
                    on_refresh();
                }
                info!("Saved hotel {}", hotel.id);
            }
            Err(err) => self.notices.error(format!("Error saving hotel: {err}")),
        }
        result
    }

    async fn save(
        &self,
        mode: &FormMode,
        form: &HotelForm,
        existing: Option<&Hotel>,
        user: &User,
    ) -> HotelResult<Hotel> {
        let category = form.validate()?;
        let id = match mode {
            FormMode::Create => Uuid::new_v4().to_string(),
            FormMode::Edit(id) => id.clone(),
        };

        let logo = match form.staged_logo() {
            Some(file) => self.repository.upload_logo(file, &id).await?,
            None => form.existing_logo.clone().unwrap_or_default(),
        };

        // New uploads go after what is already stored, duplicates included
        let mut gallery = form.existing_gallery.clone();
        if !form.staged_gallery().is_empty() {
            gallery.extend(self.repository.upload_gallery(form.staged_gallery(), &id).await?);
        }

        let now = Utc::now();
        let hotel = Hotel {
            id,
            name: form.name.trim().to_string(),
            description: form.description.clone(),
            country: form.country.trim().to_string(),
            state: form.state.trim().to_string(),
            city: form.city.trim().to_string(),
            logo,
            active: form.active,
            category,
            rating: form.rating,
            rooms: form.submitted_rooms(),
            gallery,
            created_by: existing
                .map(|hotel| hotel.created_by.clone())
                .unwrap_or_else(|| user.id.clone()),
            created_at: existing.map(|hotel| hotel.created_at).unwrap_or(now),
            updated_at: now,
        };

        match mode {
            FormMode::Create => self.repository.create(&hotel).await?,
            FormMode::Edit(_) => self.repository.update(&hotel).await?,
        }
        Ok(hotel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use crate::storage::MemoryStore;
    use crate::testing::{sample_hotel, sample_user, FakeDescriber, FakeGateway};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        flow: HotelFormFlow,
        gateway: Arc<FakeGateway>,
        session: SessionStore,
        notices: Notices,
        refreshes: Arc<AtomicUsize>,
    }

    fn harness(gateway: Arc<FakeGateway>, describer: Arc<FakeDescriber>) -> Harness {
        let session = SessionStore::new(Arc::new(MemoryStore::new()), gateway.clone());
        let repository = HotelRepository::new(gateway.clone(), gateway.clone());
        let queries = HotelQueryLayer::new(repository.clone(), session.clone(), 0);
        let notices = Notices::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = refreshes.clone();
        let flow = HotelFormFlow::new(queries, repository, session.clone(), describer, notices.clone())
            .with_refresh(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        Harness {
            flow,
            gateway,
            session,
            notices,
            refreshes,
        }
    }

    fn fill(form: &mut HotelForm) {
        form.name = "Hotel Costa Azul".into();
        form.country = "Colombia".into();
        form.state = "Bolívar".into();
        form.city = "Cartagena".into();
    }

    #[test]
    fn test_create_defaults() {
        let form = HotelForm::default();
        assert!(form.active);
        assert_eq!(form.category, Some(Category::Three));
        assert_eq!(form.rating, 4.0);
        for kind in RoomKind::ALL {
            let room = form.rooms().get(kind);
            assert!(!room.enabled);
            assert_eq!(room.available, 0);
            assert_eq!(room.price, 0.0);
        }
    }

    #[test]
    fn test_room_toggle_keeps_values() {
        let mut form = HotelForm::default();
        assert!(form.set_room_price(RoomKind::Twin, 90.0).unwrap_err().is_validation());

        form.set_room_enabled(RoomKind::Twin, true);
        form.set_room_available(RoomKind::Twin, 4).unwrap();
        form.set_room_price(RoomKind::Twin, 90.0).unwrap();

        form.set_room_enabled(RoomKind::Twin, false);
        assert!(!form.is_room_editable(RoomKind::Twin));
        assert!(form.set_room_available(RoomKind::Twin, 9).is_err());

        form.set_room_enabled(RoomKind::Twin, true);
        assert_eq!(form.rooms().twin_room.available, 4);
        assert_eq!(form.rooms().twin_room.price, 90.0);
    }

    #[test]
    fn test_disabled_rooms_submit_no_inventory() {
        let mut form = HotelForm::default();
        form.set_room_enabled(RoomKind::Queen, true);
        form.set_room_available(RoomKind::Queen, 2).unwrap();
        form.set_room_price(RoomKind::Queen, 150.0).unwrap();
        form.set_room_enabled(RoomKind::Queen, false);

        let rooms = form.submitted_rooms();
        assert_eq!(rooms.queen_room.available, 0);
        assert_eq!(form.rooms().queen_room.available, 2);
    }

    #[test]
    fn test_generate_gating() {
        let mut form = HotelForm::default();
        assert!(!form.can_generate_description());
        fill(&mut form);
        assert!(form.can_generate_description());

        form.city = "   ".into();
        assert!(!form.can_generate_description());
        form.city = "Cartagena".into();
        form.category = None;
        assert!(!form.can_generate_description());
    }

    #[tokio::test]
    async fn test_generate_disabled_makes_no_call() {
        let describer = FakeDescriber::replying("Generated");
        let h = harness(FakeGateway::new(), describer.clone());
        h.flow.open_create();
        h.flow.edit(|f| f.name = "Only a name".into()).unwrap();

        assert!(!h.flow.can_generate_description());
        let err = h.flow.generate_description().await.unwrap_err();
        assert!(err.is_validation());
        assert!(describer.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generate_replaces_description() {
        let describer = FakeDescriber::replying("Un hotel frente al mar.");
        let h = harness(FakeGateway::new(), describer.clone());
        h.flow.open_create();
        h.flow
            .edit(|f| {
                fill(f);
                f.description = "My own draft".into();
            })
            .unwrap();

        let text = h.flow.generate_description().await.unwrap();
        assert_eq!(text, "Un hotel frente al mar.");
        assert_eq!(h.flow.form().description, "Un hotel frente al mar.");
        assert!(!h.flow.is_generating());

        let prompt = &describer.prompts()[0];
        assert!(prompt.contains("Spanish"));
        assert!(prompt.contains("Cartagena"));
        assert!(prompt.contains("3 stars"));
    }

    #[tokio::test]
    async fn test_generate_failure_keeps_description() {
        let h = harness(FakeGateway::new(), FakeDescriber::failing());
        h.flow.open_create();
        h.flow
            .edit(|f| {
                fill(f);
                f.description = "Keep me".into();
            })
            .unwrap();

        assert!(h.flow.generate_description().await.is_err());
        assert_eq!(h.flow.form().description, "Keep me");
        assert!(h.flow.can_generate_description());

        let notices = h.notices.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_description_after_close_is_rejected() {
        let describer = FakeDescriber::replying("Too late");
        let h = harness(FakeGateway::new(), describer.clone());
        h.flow.open_create();
        h.flow.edit(fill).unwrap();
        describer.hold();

        let (generated, _) = tokio::join!(h.flow.generate_description(), async {
            tokio::task::yield_now().await;
            assert!(h.flow.is_generating());
            h.flow.close();
            describer.release();
        });

        assert!(generated.unwrap_err().is_validation());
        assert_eq!(h.flow.phase(), FormPhase::Closed);
        assert_eq!(h.flow.form(), HotelForm::default());

        // A reopened form is not touched by the old request either
        h.flow.open_create();
        assert!(h.flow.form().description.is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_session_makes_no_calls() {
        let h = harness(FakeGateway::new(), FakeDescriber::failing());
        h.flow.open_create();
        h.flow
            .edit(|f| {
                fill(f);
                f.stage_gallery_file(StagedFile::new("pool.jpg", "image/jpeg", vec![1, 2]));
            })
            .unwrap();

        let err = h.flow.submit().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.gateway.calls(), 0);
        assert_eq!(h.flow.phase(), FormPhase::Editing);
        assert!(h.flow.error().unwrap().contains("signed in"));
        assert_eq!(h.flow.form().staged_gallery().len(), 1);
    }

    #[tokio::test]
    async fn test_create_uploads_and_closes() {
        let h = harness(FakeGateway::new(), FakeDescriber::failing());
        h.session.persist(sample_user("u1"));
        h.flow.open_create();
        h.flow
            .edit(|f| {
                fill(f);
                f.set_room_enabled(RoomKind::Single, true);
                f.set_room_available(RoomKind::Single, 5)?;
                f.set_room_price(RoomKind::Single, 80.0)?;
                f.stage_logo(StagedFile::new("logo.png", "image/png", vec![0]));
                f.stage_gallery_file(StagedFile::new("pool view.jpg", "image/jpeg", vec![1]));
                f.stage_gallery_file(StagedFile::new("lobby.jpg", "image/jpeg", vec![2]));
                Ok::<_, HotelError>(())
            })
            .unwrap()
            .unwrap();

        let hotel = h.flow.submit().await.unwrap();
        assert_eq!(h.flow.phase(), FormPhase::Closed);
        assert_eq!(h.flow.form(), HotelForm::default());
        assert_eq!(h.refreshes.load(Ordering::SeqCst), 1);

        let stored = h.gateway.hotel(&hotel.id).unwrap();
        assert_eq!(stored.created_by, "u1");
        assert_eq!(stored.rooms.single_room.available, 5);
        assert!(stored.logo.contains(&format!("hotels/{}/logo/", hotel.id)));
        let descriptions: Vec<_> = stored
            .gallery
            .iter()
            .map(|image| image.description.clone().unwrap())
            .collect();
        assert_eq!(descriptions, vec!["pool view.jpg", "lobby.jpg"]);
        assert!(stored.gallery[0].url.ends_with("_gallery_0_pool_view.jpg"));

        let notices = h.notices.drain();
        assert_eq!(notices[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_edit_appends_gallery_without_dedup() {
        let gateway = FakeGateway::with_hotels(&[sample_hotel("a", "u1", true)]);
        let h = harness(gateway, FakeDescriber::failing());
        h.session.persist(sample_user("u2"));

        h.flow.open_edit("a").await.unwrap();
        assert_eq!(h.flow.phase(), FormPhase::Editing);
        assert_eq!(h.flow.mode(), FormMode::Edit("a".into()));
        let form = h.flow.form();
        assert_eq!(form.name, "Hotel a");
        assert_eq!(form.existing_gallery.len(), 1);
        assert!(form.staged_gallery().is_empty());

        // Same picture again: kept twice
        h.flow
            .edit(|f| f.stage_gallery_file(StagedFile::new("lobby.jpg", "image/jpeg", vec![3])))
            .unwrap();
        let hotel = h.flow.submit().await.unwrap();

        assert_eq!(hotel.gallery.len(), 2);
        assert_eq!(hotel.gallery[0].url, "https://files.test/a/lobby.jpg");
        let stored = h.gateway.hotel("a").unwrap();
        assert_eq!(stored.gallery.len(), 2);
        assert_eq!(stored.created_by, "u1");
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_fields() {
        let gateway = FakeGateway::new();
        let h = harness(gateway.clone(), FakeDescriber::failing());
        h.session.persist(sample_user("u1"));
        h.flow.open_create();
        h.flow
            .edit(|f| {
                fill(f);
                f.stage_gallery_file(StagedFile::new("pool.jpg", "image/jpeg", vec![1]));
            })
            .unwrap();
        gateway.fail_next(1);

        let err = h.flow.submit().await.unwrap_err();
        assert!(matches!(err, HotelError::Gateway(_)));
        assert_eq!(h.flow.phase(), FormPhase::Editing);
        assert!(h.flow.error().unwrap().contains("network unreachable"));
        assert_eq!(h.flow.form().name, "Hotel Costa Azul");
        assert_eq!(h.flow.form().staged_gallery().len(), 1);
        assert_eq!(h.refreshes.load(Ordering::SeqCst), 0);

        // Retry succeeds from the same state
        h.flow.submit().await.unwrap();
        assert_eq!(h.flow.phase(), FormPhase::Closed);
    }

    #[tokio::test]
    async fn test_edit_load_failure_closes() {
        let h = harness(FakeGateway::new(), FakeDescriber::failing());
        let err = h.flow.open_edit("ghost").await.unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(h.flow.phase(), FormPhase::Closed);
        assert!(h.flow.error().is_some());

        let err = h.flow.open_edit("").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_late_load_after_close_is_dropped() {
        let gateway = FakeGateway::with_hotels(&[sample_hotel("a", "u1", true)]);
        let h = harness(gateway.clone(), FakeDescriber::failing());
        gateway.hold();

        let (loaded, _) = tokio::join!(h.flow.open_edit("a"), async {
            tokio::task::yield_now().await;
            assert_eq!(h.flow.phase(), FormPhase::LoadingExisting);
            h.flow.close();
            gateway.release();
        });

        assert!(loaded.is_ok());
        assert_eq!(h.flow.phase(), FormPhase::Closed);
        assert_eq!(h.flow.form(), HotelForm::default());
    }

    #[tokio::test]
    async fn test_edit_rejected_outside_editing() {
        let h = harness(FakeGateway::new(), FakeDescriber::failing());
        assert!(h.flow.edit(|f| f.name = "x".into()).is_err());
        assert!(h.flow.submit().await.unwrap_err().is_validation());
    }
}
