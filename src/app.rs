//! Application context, built once at startup and handed to every view.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth::AuthService;
use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::gateway::{AuthGateway, DescriptionGenerator, DocumentGateway, FileGateway, OpenAiDescriber, RestGateway};
use crate::hotels::{DeleteFlow, HotelFormFlow, HotelQueryLayer, HotelRepository};
use crate::notice::Notices;
use crate::session::SessionStore;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

#[derive(Clone)]
pub struct App {
    pub session: SessionStore,
    pub favorites: FavoritesStore,
    pub auth: AuthService,
    pub repository: HotelRepository,
    pub queries: HotelQueryLayer,
    pub form: HotelFormFlow,
    pub delete: DeleteFlow,
    pub notices: Notices,
}

impl App {
    /// Wire the REST backend and the description service from `config`.
    /// The session lives in memory; favorites are kept under `data_dir`.
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = Arc::new(RestGateway::new(&config.gateway_url, config.gateway_key.clone())?);
        let describer = Arc::new(OpenAiDescriber::new(
            &config.ai_url,
            config.ai_key.clone().unwrap_or_default(),
            config.ai_model.clone(),
        )?);
        info!("Backend at {}, favorites in {}", config.gateway_url, config.data_dir.display());

        Ok(Self::assemble(
            gateway,
            describer,
            Arc::new(MemoryStore::new()),
            Arc::new(FileStore::new(&config.data_dir)),
            config.query_retries,
            &config.description_language,
        ))
    }

    pub fn assemble<G>(
        gateway: Arc<G>,
        describer: Arc<dyn DescriptionGenerator>,
        session_storage: Arc<dyn KeyValueStore>,
        favorites_storage: Arc<dyn KeyValueStore>,
        query_retries: u32,
        description_language: &str,
    ) -> Self
    where
        G: DocumentGateway + FileGateway + AuthGateway + 'static,
    {
        let session = SessionStore::new(session_storage, gateway.clone());
        let favorites = FavoritesStore::new(favorites_storage);
        let auth = AuthService::new(gateway.clone(), gateway.clone(), session.clone());
        let repository = HotelRepository::new(gateway.clone(), gateway);
        let queries = HotelQueryLayer::new(repository.clone(), session.clone(), query_retries);
        let notices = Notices::new();
        let form = HotelFormFlow::new(
            queries.clone(),
            repository.clone(),
            session.clone(),
            describer,
            notices.clone(),
        )
        .with_description_language(description_language);
        let delete = DeleteFlow::new(repository.clone(), queries.clone(), notices.clone());

        Self {
            session,
            favorites,
            auth,
            repository,
            queries,
            form,
            delete,
            notices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotels::{HotelQuery, QueryState, StagedFile};
    use crate::testing::{FakeDescriber, FakeGateway};

    fn app(gateway: &Arc<FakeGateway>) -> App {
        App::assemble(
            gateway.clone(),
            FakeDescriber::replying("Un hotel tranquilo."),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            1,
            "Spanish",
        )
    }

    #[tokio::test]
    async fn test_owner_creates_hotel_and_sees_it_listed() {
        let gateway = FakeGateway::new();
        gateway.add_account("ana@example.com", "secret1", "u1");
        let app = app(&gateway);

        assert_eq!(app.queries.load(&HotelQuery::User).await, QueryState::Empty);
        app.auth.login("ana@example.com", "secret1").await.unwrap();

        app.form.open_create();
        app.form
            .edit(|f| {
                f.name = "Hotel Sol".into();
                f.country = "Colombia".into();
                f.state = "Magdalena".into();
                f.city = "Santa Marta".into();
                f.stage_gallery_file(StagedFile::new("beach.jpg", "image/jpeg", vec![1]));
            })
            .unwrap();
        app.form.generate_description().await.unwrap();
        let hotel = app.form.submit().await.unwrap();
        assert_eq!(hotel.description, "Un hotel tranquilo.");

        let mine = app.queries.fetch(&HotelQuery::User).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].created_by, "u1");

        app.favorites.add_favorite(&mine[0]);
        assert!(app.favorites.is_favorite(&hotel.id));

        app.auth.logout().await;
        assert_eq!(app.queries.load(&HotelQuery::User).await, QueryState::Empty);
    }
}
