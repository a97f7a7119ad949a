use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::gateway::traits::DescriptionGenerator;
use crate::gateway::types::HotelDescription;
use crate::gateway::USER_AGENT;

const SYSTEM_PROMPT: &str = "You write short marketing descriptions for hotels. \
Reply only with JSON of the form {\"recipe\":{\"hotelDescription\":\"...\"}}.";

/// Description generator backed by an OpenAI-compatible chat completions API
pub struct OpenAiDescriber {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct CompletionReply {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAiDescriber {
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }
}

/// Pull the structured description out of the model's message content.
fn parse_content(content: &str) -> Result<HotelDescription> {
    let description: HotelDescription =
        serde_json::from_str(content.trim()).context("Model reply is not a hotel description")?;
    if description.text().trim().is_empty() {
        bail!("Model returned an empty description");
    }
    Ok(description)
}

#[async_trait]
impl DescriptionGenerator for OpenAiDescriber {
    async fn describe(&self, prompt: &str) -> Result<HotelDescription> {
        debug!("Requesting description from {} ({})", self.endpoint, self.model);

        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach description service")?;

        if !response.status().is_success() {
            warn!("Description service returned status: {}", response.status());
            bail!("Description service failed: {}", response.status());
        }

        let reply: CompletionReply = response
            .json()
            .await
            .context("Failed to read description service reply")?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Description service returned no content"))?;

        parse_content(&content)
    }
}
