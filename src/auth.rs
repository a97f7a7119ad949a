//! Sign-up, sign-in and sign-out on top of the auth gateway.
//!
//! Every successful sign-in builds a [`User`] from the provider credential
//! and the `users` document, then stores it in the [`SessionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{HotelError, HotelResult};
use crate::gateway::{AuthGateway, Credential, DocumentGateway, IdentityProvider, USERS_COLLECTION};
use crate::models::{Role, User};
use crate::session::{LogoutOutcome, SessionStore};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// `users` document fields, all optional so old or partial records still
/// merge over the credential.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Stored fields win; the credential fills the gaps.
fn merge_user(credential: &Credential, stored: Option<StoredUser>) -> User {
    let stored = stored.unwrap_or_default();
    let email = non_empty(stored.email)
        .or_else(|| credential.email.clone())
        .unwrap_or_default();
    let name = non_empty(stored.name)
        .or_else(|| non_empty(credential.display_name.clone()))
        .unwrap_or_else(|| email_local_part(&email));
    User {
        id: credential.uid.clone(),
        name,
        email,
        role: stored.role.unwrap_or_default(),
        avatar: non_empty(stored.avatar).or_else(|| credential.photo_url.clone()),
        created_at: stored.created_at.unwrap_or_else(Utc::now),
    }
}

#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthGateway>,
    documents: Arc<dyn DocumentGateway>,
    session: SessionStore,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthGateway>, documents: Arc<dyn DocumentGateway>, session: SessionStore) -> Self {
        Self {
            auth,
            documents,
            session,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> HotelResult<User> {
        let name = request.name.trim();
        let email = request.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(HotelError::validation("Name and email are required"));
        }
        if !email.contains('@') {
            return Err(HotelError::validation("Enter a valid email address"));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(HotelError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let credential = self.auth.sign_up_with_password(email, &request.password).await?;
        let user = User {
            id: credential.uid.clone(),
            name: name.to_string(),
            email: email.to_string(),
            role: request.role,
            avatar: None,
            created_at: Utc::now(),
        };
        self.write_user(&user).await?;
        info!("Registered {} as {:?}", user.id, user.role);

        self.session.persist(user.clone());
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> HotelResult<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(HotelError::validation("Email and password are required"));
        }

        let credential = self.auth.sign_in_with_password(email, password).await?;
        let stored = self.read_user(&credential.uid).await?;
        let user = merge_user(&credential, stored);

        self.session.persist(user.clone());
        Ok(user)
    }

    /// Sign in through Google. The first sign-in also creates the `users`
    /// document.
    pub async fn sign_in_with_google(&self) -> HotelResult<User> {
        let credential = self.auth.sign_in_with_provider(IdentityProvider::Google).await?;

        let user = match self.read_user(&credential.uid).await? {
            Some(stored) => merge_user(&credential, Some(stored)),
            None => {
                let user = merge_user(&credential, None);
                self.write_user(&user).await?;
                info!("Created user document for {}", user.id);
                user
            }
        };

        self.session.persist(user.clone());
        Ok(user)
    }

    pub async fn logout(&self) -> LogoutOutcome {
        self.session.clear_session().await
    }

    async fn read_user(&self, uid: &str) -> HotelResult<Option<StoredUser>> {
        let Some(document) = self.documents.get(USERS_COLLECTION, uid).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<StoredUser>(document) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Ignoring malformed user document {}: {}", uid, e);
                Ok(None)
            }
        }
    }

    async fn write_user(&self, user: &User) -> HotelResult<()> {
        let document = serde_json::to_value(user)?;
        self.documents.set(USERS_COLLECTION, &user.id, document).await?;
        Ok(())
    }
}
