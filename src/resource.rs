use std::fmt::{Debug, Formatter};

use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::RequestBuilder;
use url::Url;

use crate::error::Result;

/// Name of the cookie that carries a session token
pub const SESSION_COOKIE_NAME: &str = "next-auth.session-token";

/// How requests authenticate against the remote stores
#[derive(Clone, PartialEq)]
pub enum Credentials {
    None,
    Bearer(String),
    /// The value of the session cookie
    SessionCookie(String),
    Basic { username: String, password: String },
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Credentials::SessionCookie(_) => write!(f, "SessionCookie(<redacted>)"),
            Credentials::Basic{ username, .. } => write!(f, "Basic({}, <redacted>)", username),
        }
    }
}

/// Just a wrapper around a URL and credentials
#[derive(Clone, Debug)]
pub struct Resource {
    url: Url,
    credentials: Credentials,
}

impl Resource {
    pub fn new(url: Url, credentials: Credentials) -> Self {
        Self { url, credentials }
    }

    pub fn url(&self) -> &Url { &self.url }
    pub fn credentials(&self) -> &Credentials { &self.credentials }

    /// Build a new Resource by keeping the same credentials, and resolving `path` against the current URL
    pub fn combine(&self, path: &str) -> Result<Resource> {
        Ok(Resource {
            url: self.url.join(path)?,
            credentials: self.credentials.clone(),
        })
    }

    pub fn with_query(mut self, pairs: &[(&str, String)]) -> Self {
        {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }
        self
    }

    /// Adds the credentials to a request
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Credentials::SessionCookie(value) => request.header(COOKIE, format!("{}={}", SESSION_COOKIE_NAME, value)),
            Credentials::Basic{ username, password } => request.basic_auth(username, Some(password)),
        }
    }
}
