use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CoachError, CoachResult};
use crate::services::{AuthService, FlashcardStore, LookupService, StoryService};
use crate::session::{Credentials, Session};
use crate::types::lookup::{Flashcard, FlashcardList, LookupRequest, LookupResult, NewFlashcard};
use crate::types::story::{LevelList, Story, StoryId, StoryList, StorySummary};

/// Client for the story coach REST backend.
pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        HttpApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if token.is_empty() {
            builder
        } else {
            builder.bearer_auth(token)
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> CoachResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "backend response");
        decode_body(status.is_success(), status.as_u16(), &body)
    }
}

/// Non-2xx answers carry `{"error": "..."}`; anything not JSON is a
/// transport error either way.
pub(crate) fn decode_body<T: DeserializeOwned>(success: bool, status: u16, body: &str) -> CoachResult<T> {
    let data: serde_json::Value = serde_json::from_str(body).map_err(|_| {
        CoachError::Transport(format!("Request failed ({}): response was not JSON", status))
    })?;
    if !success {
        let message = data
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("Request failed")
            .to_string();
        return Err(CoachError::Transport(message));
    }
    Ok(serde_json::from_value(data)?)
}

fn as_auth(e: CoachError) -> CoachError {
    match e {
        CoachError::Transport(m) => CoachError::Auth(m),
        other => other,
    }
}

fn as_lookup(e: CoachError) -> CoachError {
    match e {
        CoachError::Transport(m) => CoachError::Lookup(m),
        other => other,
    }
}

#[derive(Deserialize)]
struct AuthReply {
    token: String,
    username: String,
}

impl From<AuthReply> for Session {
    fn from(r: AuthReply) -> Self {
        Session { token: r.token, username: r.username }
    }
}

#[async_trait]
impl AuthService for HttpApi {
    async fn login(&self, credentials: &Credentials) -> CoachResult<Session> {
        let builder = self.request(Method::POST, "/api/auth/login", "").json(credentials);
        self.send::<AuthReply>(builder).await.map(Session::from).map_err(as_auth)
    }

    async fn register(&self, credentials: &Credentials) -> CoachResult<Session> {
        let builder = self.request(Method::POST, "/api/auth/register", "").json(credentials);
        self.send::<AuthReply>(builder).await.map(Session::from).map_err(as_auth)
    }
}

#[async_trait]
impl StoryService for HttpApi {
    async fn levels(&self, token: &str) -> CoachResult<Vec<String>> {
        let list: LevelList = self.send(self.request(Method::GET, "/api/levels", token)).await?;
        Ok(list.levels)
    }

    async fn stories(&self, token: &str, level: &str) -> CoachResult<Vec<StorySummary>> {
        let builder = self
            .request(Method::GET, "/api/stories", token)
            .query(&[("level", level)]);
        let list: StoryList = self.send(builder).await?;
        Ok(list.stories)
    }

    async fn story(&self, token: &str, id: StoryId) -> CoachResult<Story> {
        let path = format!("/api/stories/{}", id);
        self.send(self.request(Method::GET, &path, token)).await
    }
}

#[async_trait]
impl LookupService for HttpApi {
    async fn lookup(&self, token: &str, request: &LookupRequest) -> CoachResult<LookupResult> {
        let builder = self.request(Method::POST, "/api/lookup", token).json(request);
        self.send(builder).await.map_err(as_lookup)
    }
}

#[async_trait]
impl FlashcardStore for HttpApi {
    async fn flashcards(&self, token: &str) -> CoachResult<Vec<Flashcard>> {
        let list: FlashcardList = self.send(self.request(Method::GET, "/api/flashcards", token)).await?;
        Ok(list.flashcards)
    }

    async fn create_flashcard(&self, token: &str, card: &NewFlashcard) -> CoachResult<()> {
        let builder = self.request(Method::POST, "/api/flashcards", token).json(card);
        let _created: serde_json::Value = self.send(builder).await?;
        Ok(())
    }
}
