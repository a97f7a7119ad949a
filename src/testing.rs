//! In-memory gateway doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::gateway::{
    AuthGateway, Credential, DescriptionGenerator, DocumentGateway, FileGateway,
    HotelDescription, IdentityProvider, HOTELS_COLLECTION,
};
use crate::models::{Category, GalleryImage, Hotel, Role, Rooms, User};

/// Gateway double keeping documents in insertion order and counting every call.
#[derive(Default)]
pub struct FakeGateway {
    collections: Mutex<HashMap<String, Vec<(String, Value)>>>,
    accounts: Mutex<HashMap<String, (String, Credential)>>,
    provider_credential: Mutex<Option<Credential>>,
    uploads: Mutex<Vec<String>>,
    calls: AtomicUsize,
    failures: AtomicUsize,
    fail_sign_out: AtomicBool,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_hotels(hotels: &[Hotel]) -> Arc<Self> {
        let gateway = Self::default();
        for hotel in hotels {
            gateway.insert(HOTELS_COLLECTION, &hotel.id, serde_json::to_value(hotel).unwrap());
        }
        Arc::new(gateway)
    }

    pub fn insert(&self, collection: &str, id: &str, document: Value) {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|(doc_id, _)| doc_id == id) {
            Some(entry) => entry.1 = document,
            None => docs.push((id.to_string(), document)),
        }
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.lock().unwrap();
        collections
            .get(collection)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, doc)| doc.clone())
    }

    pub fn hotel(&self, id: &str) -> Option<Hotel> {
        self.document(HOTELS_COLLECTION, id)
            .map(|doc| serde_json::from_value(doc).unwrap())
    }

    pub fn count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().unwrap();
        collections.get(collection).map(Vec::len).unwrap_or(0)
    }

    pub fn add_account(&self, email: &str, password: &str, uid: &str) {
        let credential = Credential {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            ..Credential::default()
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), credential));
    }

    pub fn set_provider_credential(&self, credential: Credential) {
        *self.provider_credential.lock().unwrap() = Some(credential);
    }

    /// Total number of gateway calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    /// Make the next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self) {
        self.fail_sign_out.store(true, Ordering::SeqCst);
    }

    /// Park every subsequent call until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn release(&self) {
        if let Some(notify) = self.hold.lock().unwrap().take() {
            notify.notify_waiters();
            notify.notify_one();
        }
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            bail!("network unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentGateway for FakeGateway {
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        self.enter().await?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_by(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        self.enter().await?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.enter().await?;
        Ok(self.document(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.enter().await?;
        self.insert(collection, id, document);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        self.enter().await?;
        let mut document = self
            .document(collection, id)
            .ok_or_else(|| anyhow!("document {collection}/{id} not found"))?;
        if let (Some(target), Value::Object(fields)) = (document.as_object_mut(), patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        self.insert(collection, id, document);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.enter().await?;
        let mut collections = self.collections.lock().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|(doc_id, _)| doc_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl FileGateway for FakeGateway {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        self.enter().await?;
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(format!("https://files.test/{path}"))
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential> {
        self.enter().await?;
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((stored, credential)) if stored == password => Ok(credential.clone()),
            _ => bail!("invalid credentials"),
        }
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Credential> {
        self.enter().await?;
        if self.accounts.lock().unwrap().contains_key(email) {
            bail!("email already in use");
        }
        let uid = format!("uid-{}", email.split('@').next().unwrap_or(email));
        self.add_account(email, password, &uid);
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts[email].1.clone())
    }

    async fn sign_in_with_provider(&self, _provider: IdentityProvider) -> Result<Credential> {
        self.enter().await?;
        self.provider_credential
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("popup closed by user"))
    }

    async fn sign_out(&self) -> Result<()> {
        self.enter().await?;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            bail!("sign-out failed");
        }
        Ok(())
    }
}

/// Description generator double recording every prompt.
#[derive(Default)]
pub struct FakeDescriber {
    reply: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeDescriber {
    pub fn replying(text: &str) -> Arc<Self> {
        let describer = Self::default();
        *describer.reply.lock().unwrap() = Some(text.to_string());
        Arc::new(describer)
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Park every subsequent request until [`FakeDescriber::release`].
    pub fn hold(&self) {
        *self.hold.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    pub fn release(&self) {
        if let Some(notify) = self.hold.lock().unwrap().take() {
            notify.notify_waiters();
            notify.notify_one();
        }
    }
}

#[async_trait]
impl DescriptionGenerator for FakeDescriber {
    async fn describe(&self, prompt: &str) -> Result<HotelDescription> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let hold = self.hold.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        let reply = self.reply.lock().unwrap().clone();
        reply
            .map(HotelDescription::new)
            .ok_or_else(|| anyhow!("model unavailable"))
    }
}

pub fn sample_user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("Owner {id}"),
        email: format!("{id}@example.com"),
        role: Role::Admin,
        avatar: None,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

pub fn sample_hotel(id: &str, owner: &str, with_image: bool) -> Hotel {
    let gallery = if with_image {
        vec![GalleryImage {
            url: format!("https://files.test/{id}/lobby.jpg"),
            description: Some("lobby.jpg".to_string()),
        }]
    } else {
        Vec::new()
    };
    let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Hotel {
        id: id.to_string(),
        name: format!("Hotel {id}"),
        description: String::new(),
        country: "Colombia".to_string(),
        state: "Antioquia".to_string(),
        city: "Medellín".to_string(),
        logo: String::new(),
        active: true,
        category: Category::Four,
        rating: 4.5,
        rooms: Rooms::default(),
        gallery,
        created_by: owner.to_string(),
        created_at: timestamp,
        updated_at: timestamp,
    }
}
