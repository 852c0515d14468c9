use thiserror::Error;

/// Failure talking to the remote dictionary.
#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("Missing credential: {0}")]
  MissingCredential(String),

  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("Remote returned status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Invalid response: {0}")]
  InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl RemoteError {
  pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    RemoteError::Status {
      status: status.as_u16(),
      body: truncate_body(body),
    }
  }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }
  let mut end = MAX_ERROR_BODY_LENGTH;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Failure of a dictionary write.
#[derive(Error, Debug)]
pub enum DictionaryError {
  #[error("Upsert of {key} failed: {source}")]
  Upsert {
    key: String,
    #[source]
    source: RemoteError,
  },

  #[error("Upsert of {key} succeeded remotely but the local cache was not updated: {reason}")]
  CacheWrite { key: String, reason: String },
}
