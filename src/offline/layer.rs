//! Request-caching middleware installed once at bootstrap.

use reqwest::Method;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use url::{Origin, Url};

use crate::cache::{CachedResponse, ResponseCache, ResponseSnapshot};

use super::network::{FetchError, Network, Request};

/// Body of the synthetic response served when offline with nothing cached.
const OFFLINE_BODY: &str = "Offline";

/// Status of the synthetic offline response.
const OFFLINE_STATUS: u16 = 503;

/// Lifecycle of an installed intercept layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// Installed but not yet intercepting
  Installed,
  /// Intercepting every in-scope request
  Active,
  /// Torn down; every request passes through
  Uninstalled,
}

/// Handle to an installed intercept layer.
///
/// Clones share the lifecycle, so uninstalling through any clone stops
/// interception for all of them.
pub struct InterceptHandle<N: Network> {
  network: Arc<N>,
  cache: ResponseCache,
  origin: Origin,
  state: Arc<Mutex<Lifecycle>>,
}

impl<N: Network> InterceptHandle<N> {
  /// Install the layer for the given application origin.
  ///
  /// There is no waiting phase: the layer activates immediately and governs
  /// every subsequent request made through this handle.
  pub fn install(network: N, cache: ResponseCache, app_origin: &Url) -> Self {
    let handle = Self {
      network: Arc::new(network),
      cache,
      origin: app_origin.origin(),
      state: Arc::new(Mutex::new(Lifecycle::Installed)),
    };
    info!(cache = %handle.cache.name(), origin = %app_origin, "offline layer installed");
    handle.activate();
    handle
  }

  fn activate(&self) {
    self.set_state(Lifecycle::Active);
    info!(cache = %self.cache.name(), "offline layer active");
  }

  /// Stop intercepting. Requests made afterwards go straight to the network.
  pub fn uninstall(&self) {
    self.set_state(Lifecycle::Uninstalled);
    info!(cache = %self.cache.name(), "offline layer uninstalled");
  }

  pub fn lifecycle(&self) -> Lifecycle {
    self
      .state
      .lock()
      .map(|state| *state)
      .unwrap_or(Lifecycle::Uninstalled)
  }

  fn set_state(&self, lifecycle: Lifecycle) {
    match self.state.lock() {
      Ok(mut state) => *state = lifecycle,
      Err(poisoned) => *poisoned.into_inner() = lifecycle,
    }
  }

  /// Whether a request is handled by the layer at all.
  pub fn intercepts(&self, request: &Request) -> bool {
    self.lifecycle() == Lifecycle::Active
      && request.method == Method::GET
      && request.url.origin() == self.origin
  }

  /// Perform a request through the layer.
  ///
  /// Intercepted requests always produce a response. Requests outside the
  /// layer's scope are forwarded untouched, so their transport errors are
  /// returned as-is.
  pub async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, FetchError> {
    if !self.intercepts(request) {
      debug!(method = %request.method, url = %request.url, "passing through");
      return self.network.fetch(request).await;
    }
    Ok(self.respond(request).await)
  }

  async fn respond(&self, request: &Request) -> ResponseSnapshot {
    let method = request.method.as_str();
    let url = request.url.as_str();

    if let Some(hit) = self.cached(method, url).await {
      debug!(url, cached_at = %hit.cached_at, "serving cached response");
      return hit.response;
    }

    match self.network.fetch(request).await {
      Ok(response) => {
        // Any response counts, including error statuses
        if let Err(e) = self.cache.put(method, url, &response).await {
          warn!(url, status = response.status, error = %e, "failed to cache response");
        }
        response
      }
      Err(e) => {
        warn!(url, error = %e, "network unavailable");
        // Another request may have stored a copy while this one was in flight
        match self.cached(method, url).await {
          Some(hit) => hit.response,
          None => ResponseSnapshot::text(OFFLINE_STATUS, OFFLINE_BODY),
        }
      }
    }
  }

  async fn cached(&self, method: &str, url: &str) -> Option<CachedResponse> {
    match self.cache.match_request(method, url).await {
      Ok(hit) => hit,
      Err(e) => {
        warn!(url, error = %e, "response cache read failed, treating as miss");
        None
      }
    }
  }
}

impl<N: Network> Clone for InterceptHandle<N> {
  fn clone(&self) -> Self {
    Self {
      network: Arc::clone(&self.network),
      cache: self.cache.clone(),
      origin: self.origin.clone(),
      state: Arc::clone(&self.state),
    }
  }
}
