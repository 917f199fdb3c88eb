//! `DeckApi` over the deck service's JSON HTTP interface.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Card, CardId, Deck, DeckId},
    error::ApiError,
    protocol::{CardDraft, DeckDraft},
};
use tracing::debug;
use url::Url;

use crate::{api::DeckApi, cancel::CancellationToken, error::ClientError};

#[derive(Clone)]
pub struct HttpDeckApi {
    http: Client,
    base: Url,
}

impl HttpDeckApi {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let mut base =
            Url::parse(server_url).with_context(|| format!("invalid server url {server_url}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("server_url must start with http:// or https://"));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .with_context(|| format!("invalid request path {path}"))?;
        Ok(self.http.request(method, url))
    }

    /// Sends a read, resolving to `Cancelled` if `token` fires before the body is decoded.
    async fn read<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        token: CancellationToken,
    ) -> Result<T, ClientError> {
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let request = self
            .request(Method::GET, path)
            .map_err(|err| ClientError::read(operation, err))?;
        let exchange = async {
            let response = request.send().await?;
            decode(response).await
        };
        tokio::select! {
            _ = token.cancelled() => {
                debug!(operation, path, "http read abandoned");
                Err(ClientError::Cancelled)
            }
            result = exchange => result.map_err(|err| ClientError::read(operation, err)),
        }
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: anyhow::Result<RequestBuilder>,
    ) -> Result<T, ClientError> {
        let exchange = async {
            let response = request?.send().await?;
            decode(response).await
        };
        exchange
            .await
            .map_err(|err| ClientError::mutation(operation, err))
    }

    async fn delete(&self, operation: &'static str, path: &str) -> Result<(), ClientError> {
        let exchange = async {
            let response = self.request(Method::DELETE, path)?.send().await?;
            check_status(response).await.map(|_| ())
        };
        exchange
            .await
            .map_err(|err| ClientError::mutation(operation, err))
    }
}

async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => {
            Err(anyhow::Error::new(api_error).context(format!("server returned {status}")))
        }
        Err(_) => Err(anyhow!("server returned {status}: {body}")),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .context("failed to decode response body")
}

#[async_trait]
impl DeckApi for HttpDeckApi {
    async fn list_decks(&self, token: CancellationToken) -> Result<Vec<Deck>, ClientError> {
        self.read("list_decks", "decks", token).await
    }

    async fn read_deck(
        &self,
        deck_id: DeckId,
        token: CancellationToken,
    ) -> Result<Deck, ClientError> {
        self.read("read_deck", &format!("decks/{deck_id}"), token).await
    }

    async fn read_card(
        &self,
        card_id: CardId,
        token: CancellationToken,
    ) -> Result<Card, ClientError> {
        self.read("read_card", &format!("cards/{card_id}"), token).await
    }

    async fn create_deck(&self, draft: DeckDraft) -> Result<Deck, ClientError> {
        let request = self
            .request(Method::POST, "decks")
            .map(|builder| builder.json(&draft));
        self.mutate("create_deck", request).await
    }

    async fn update_deck(&self, deck: Deck) -> Result<Deck, ClientError> {
        let request = self
            .request(Method::PUT, &format!("decks/{}", deck.id))
            .map(|builder| builder.json(&deck));
        self.mutate("update_deck", request).await
    }

    async fn delete_deck(&self, deck_id: DeckId) -> Result<(), ClientError> {
        self.delete("delete_deck", &format!("decks/{deck_id}")).await
    }

    async fn create_card(&self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ClientError> {
        let request = self
            .request(Method::POST, &format!("decks/{deck_id}/cards"))
            .map(|builder| builder.json(&draft));
        self.mutate("create_card", request).await
    }

    async fn update_card(&self, card: Card) -> Result<Card, ClientError> {
        let request = self
            .request(Method::PUT, &format!("cards/{}", card.id))
            .map(|builder| builder.json(&card));
        self.mutate("update_card", request).await
    }

    async fn delete_card(&self, card_id: CardId) -> Result<(), ClientError> {
        self.delete("delete_card", &format!("cards/{card_id}")).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
