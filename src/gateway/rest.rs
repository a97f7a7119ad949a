use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::gateway::traits::{AuthGateway, DocumentGateway, FileGateway};
use crate::gateway::types::{Credential, IdentityProvider};
use crate::gateway::USER_AGENT;

/// REST/JSON client for the hosted backend
///
/// Routes, relative to the configured base URL:
///
/// | Call | Route |
/// |------|-------|
/// | documents | `GET/PUT/PATCH/DELETE collections/{collection}/documents[/{id}]` |
/// | files | `POST files/{path}` → `{ "url": … }` |
/// | auth | `POST auth/sign-in`, `auth/sign-up`, `auth/providers/{provider}/sign-in`, `auth/sign-out` |
pub struct RestGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    token: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct UploadReply {
    url: String,
}

impl RestGateway {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid gateway URL: {base_url}"))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            token: Mutex::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Gateway URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn documents_url(&self, collection: &str, id: Option<&str>) -> Result<Url> {
        match id {
            Some(id) => self.url(&["collections", collection, "documents", id]),
            None => self.url(&["collections", collection, "documents"]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }
        let token = self.token.lock().ok().and_then(|token| token.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to {what}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gateway returned status {} while trying to {}", status, what);
            bail!("Failed to {what}: {status} {}", body.trim());
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(builder, what).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode response to {what}"))
    }

    fn remember(&self, credential: &Credential) {
        if let Ok(mut token) = self.token.lock() {
            *token = credential.id_token.clone();
        }
    }
}

#[async_trait]
impl DocumentGateway for RestGateway {
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let url = self.documents_url(collection, None)?;
        debug!("Listing {}", url);
        self.send_json(self.request(Method::GET, url), &format!("list {collection}"))
            .await
    }

    async fn find_by(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>> {
        let url = self.documents_url(collection, None)?;
        let builder = self
            .request(Method::GET, url)
            .query(&[("field", field), ("value", value)]);
        self.send_json(builder, &format!("query {collection} by {field}"))
            .await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let url = self.documents_url(collection, Some(id))?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {collection}/{id}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            warn!("Gateway returned status {} for {}/{}", response.status(), collection, id);
            bail!("Failed to fetch {collection}/{id}: {}", response.status());
        }

        let document = response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to decode {collection}/{id}"))?;
        Ok(Some(document))
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let url = self.documents_url(collection, Some(id))?;
        self.send(self.request(Method::PUT, url).json(&document), &format!("write {collection}/{id}"))
            .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let url = self.documents_url(collection, Some(id))?;
        self.send(self.request(Method::PATCH, url).json(&patch), &format!("update {collection}/{id}"))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.documents_url(collection, Some(id))?;
        self.send(self.request(Method::DELETE, url), &format!("delete {collection}/{id}"))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FileGateway for RestGateway {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let mut segments = vec!["files"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let url = self.url(&segments)?;

        debug!("Uploading {} bytes to {}", bytes.len(), path);
        let builder = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        let reply: UploadReply = self.send_json(builder, &format!("upload {path}")).await?;
        Ok(reply.url)
    }
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential> {
        let url = self.url(&["auth", "sign-in"])?;
        let body = json!({ "email": email, "password": password });
        let credential: Credential = self
            .send_json(self.request(Method::POST, url).json(&body), "sign in")
            .await?;
        self.remember(&credential);
        Ok(credential)
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Credential> {
        let url = self.url(&["auth", "sign-up"])?;
        let body = json!({ "email": email, "password": password });
        let credential: Credential = self
            .send_json(self.request(Method::POST, url).json(&body), "sign up")
            .await?;
        self.remember(&credential);
        Ok(credential)
    }

    async fn sign_in_with_provider(&self, provider: IdentityProvider) -> Result<Credential> {
        let url = self.url(&["auth", "providers", provider.as_str(), "sign-in"])?;
        let credential: Credential = self
            .send_json(
                self.request(Method::POST, url),
                &format!("sign in with {}", provider.as_str()),
            )
            .await?;
        self.remember(&credential);
        Ok(credential)
    }

    async fn sign_out(&self) -> Result<()> {
        let url = self.url(&["auth", "sign-out"])?;
        let result = self.send(self.request(Method::POST, url), "sign out").await;
        // The local token is dropped even when the backend call fails
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
        result?;
        info!("Signed out from gateway");
        Ok(())
    }
}
