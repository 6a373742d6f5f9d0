use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::chat::message::ChatBatch;

use super::{ChatTransport, TransportError};

/// `GET /api/chat/?order_id=&offset=`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatGetRequest {
    pub order_id: u64,
    pub offset: u64,
}

impl ApiRequest for ChatGetRequest {
    type Response = ChatBatch;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("api/chat/")?;
        Ok(client.get(full_url).query(&self))
    }
}

/// `POST /api/chat/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPostRequest {
    #[serde(rename = "PGP_message")]
    pub pgp_message: String,
    pub order_id: u64,
    pub offset: u64,
}

impl ApiRequest for ChatPostRequest {
    type Response = ChatBatch;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("api/chat/")?;
        Ok(client.post(full_url).json(&self))
    }
}

/// Stateless HTTP chat against the coordinator.
///
/// The coordinator already knows our key from robot registration, so
/// announcing just fetches the conversation so far.
#[derive(Debug, Clone)]
pub struct PullTransport {
    client: ApiClient,
    order_id: u64,
}

impl PullTransport {
    /// `client` must carry the robot's auth header
    pub fn new(client: ApiClient, order_id: u64) -> Self {
        Self { client, order_id }
    }

    async fn fetch(&self, offset: f64) -> Result<ChatBatch, TransportError> {
        Ok(self
            .client
            .call(ChatGetRequest {
                order_id: self.order_id,
                offset: wire_offset(offset),
            })
            .await?)
    }
}

// plaintext messages carry fractional indices, the coordinator only knows
// integers
fn wire_offset(offset: f64) -> u64 {
    if offset.is_finite() && offset > 0.0 {
        offset.floor() as u64
    } else {
        0
    }
}

#[async_trait]
impl ChatTransport for PullTransport {
    async fn announce(
        &self,
        _public_key: &str,
        _nick: &str,
    ) -> Result<Option<ChatBatch>, TransportError> {
        Ok(Some(self.fetch(0.0).await?))
    }

    async fn send(
        &self,
        message: &str,
        _nick: &str,
        offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        let batch = self
            .client
            .call(ChatPostRequest {
                pgp_message: message.to_string(),
                order_id: self.order_id,
                offset: wire_offset(offset),
            })
            .await?;
        Ok(Some(batch))
    }

    async fn request_history(
        &self,
        _nick: &str,
        offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        Ok(Some(self.fetch(offset).await?))
    }

    async fn recv(&self, offset: f64) -> Result<ChatBatch, TransportError> {
        self.fetch(offset).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_requests() {
        let base = Url::parse("http://coordinator.onion").unwrap();
        let client = Client::new();

        let request = ChatGetRequest {
            order_id: 42,
            offset: 7,
        }
        .build_request(&base, &client)
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://coordinator.onion/api/chat/?order_id=42&offset=7"
        );

        let body = serde_json::to_value(ChatPostRequest {
            pgp_message: "#hello".into(),
            order_id: 42,
            offset: 7,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"PGP_message": "#hello", "order_id": 42, "offset": 7})
        );
    }

    #[test]
    fn test_wire_offset() {
        assert_eq!(wire_offset(0.0), 0);
        assert_eq!(wire_offset(3.001), 3);
        assert_eq!(wire_offset(12.0), 12);
        assert_eq!(wire_offset(f64::NAN), 0);
    }

    #[test]
    fn test_batch_decoding() {
        let batch: ChatBatch = serde_json::from_str(
            r##"{"peer_connected":true,"peer_pubkey":"-----BEGIN PGP PUBLIC KEY BLOCK-----\\abc","messages":[{"message":"#hi","time":"t","index":1,"nick":"Bob"}]}"##,
        )
        .unwrap();
        assert!(batch.peer_connected);
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.messages[0].nick, "Bob");
        assert_eq!(batch.messages[0].message, "#hi");
    }
}
