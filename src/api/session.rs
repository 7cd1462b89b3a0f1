//! Cookie-backed session storage.
//!
//! The server identifies a signed-in user by cookie. The store keeps those
//! cookies between requests; nothing above the API client ever sees them.
//! [`SessionCookies`] plugs a store into reqwest's cookie hook, so every
//! response is offered to [`SessionStore::save`] and every request asks
//! [`SessionStore::attach`].

use cookie::Cookie;
use reqwest::header::HeaderValue;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

/// Capability the API client uses to carry the session across requests.
pub trait SessionStore: Send + Sync + Debug {
    /// Record the `Set-Cookie` header values of a response to `url`.
    fn save(&self, url: &Url, set_cookies: &mut dyn Iterator<Item = &HeaderValue>);

    /// `Cookie` header value for a request to `url`, if a session exists.
    fn attach(&self, url: &Url) -> Option<HeaderValue>;

    /// Forget every stored cookie.
    fn clear(&self);
}

/// In-memory cookie jar following RFC 6265 expiry and scoping rules.
#[derive(Debug, Default)]
pub struct CookieSession {
    store: RwLock<cookie_store::CookieStore>,
}

impl CookieSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether any live cookie would be sent to `url`.
    pub fn has_session(&self, url: &Url) -> bool {
        self.read().get_request_values(url).next().is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, cookie_store::CookieStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, cookie_store::CookieStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for CookieSession {
    fn save(&self, url: &Url, set_cookies: &mut dyn Iterator<Item = &HeaderValue>) {
        let cookies = set_cookies
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_owned()).ok());
        self.write().store_response_cookies(cookies, url);
    }

    fn attach(&self, url: &Url) -> Option<HeaderValue> {
        let line = self
            .read()
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if line.is_empty() {
            return None;
        }
        HeaderValue::from_str(&line).ok()
    }

    fn clear(&self) {
        self.write().clear();
    }
}

/// Adapter installed with `ClientBuilder::cookie_provider`.
#[derive(Debug)]
pub(crate) struct SessionCookies(pub(crate) Arc<dyn SessionStore>);

impl reqwest::cookie::CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0.save(url, cookie_headers);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0.attach(url)
    }
}
