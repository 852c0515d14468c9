use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cache::ResponseSnapshot;

/// Failure to get any response from the network.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Network error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Network unreachable: {0}")]
  Unreachable(String),
}

/// An outgoing request as seen by the intercept layer.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub body: Option<Vec<u8>>,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      body: None,
    }
  }

  pub fn with_body(mut self, body: Vec<u8>) -> Self {
    self.body = Some(body);
    self
  }
}

/// Something that can perform a live fetch.
#[async_trait]
pub trait Network: Send + Sync {
  /// Perform the request. Any HTTP status is a response; only transport
  /// failures are errors.
  async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, FetchError>;
}

/// Live network access through reqwest.
#[derive(Clone)]
pub struct HttpNetwork {
  client: Client,
}

impl HttpNetwork {
  pub fn new(timeout: Duration) -> Result<Self, FetchError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, FetchError> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder.send().await.map_err(|e| {
      if e.is_connect() || e.is_timeout() {
        FetchError::Unreachable(e.to_string())
      } else {
        FetchError::Transport(e)
      }
    })?;
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response.bytes().await?.to_vec();

    Ok(ResponseSnapshot {
      status,
      headers,
      body,
    })
  }
}
