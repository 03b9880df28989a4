//! Caller context and the admin session artifact issued after rotation.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that may not appear raw in a cookie value.
const COOKIE_VALUE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b',').add(b';').add(b'\\').add(b'%');

/// What the transport layer knows about the caller.
///
/// `is_super_admin` is decided by the authentication middleware before the
/// update subsystem is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminContext {
    pub is_super_admin: bool,
    /// Request host (`Host` header), used as the cookie domain fallback.
    pub host: Option<String>,
}

impl AdminContext {
    pub fn super_admin() -> Self {
        Self {
            is_super_admin: true,
            host: None,
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }
}

/// Admin session cookie bound to the current admin secret hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCookie {
    pub name: String,
    /// Unencoded value (the admin secret hash).
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl AdminCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}",
            self.name,
            utf8_percent_encode(&self.value, COOKIE_VALUE),
            self.path
        );
        if let Some(domain) = &self.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.secure {
            header.push_str("; Secure; SameSite=None");
        } else {
            header.push_str("; SameSite=Lax");
        }
        header
    }
}

/// Issues the session artifact that keeps an admin signed in after the
/// secret is rotated.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, ctx: &AdminContext, secret_hash: &str) -> AdminCookie;
}

/// Default `SessionIssuer`: an HTTP-only admin cookie.
#[derive(Debug, Clone)]
pub struct AdminCookieIssuer {
    name: String,
    domain: Option<String>,
    secure: bool,
}

impl AdminCookieIssuer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: None,
            secure: true,
        }
    }

    /// Fixed cookie domain; otherwise the caller's host is used.
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

impl SessionIssuer for AdminCookieIssuer {
    fn issue(&self, ctx: &AdminContext, secret_hash: &str) -> AdminCookie {
        let domain = self.domain.clone().or_else(|| ctx.host.as_deref().map(host_without_port));
        AdminCookie {
            name: self.name.clone(),
            value: secret_hash.to_string(),
            domain,
            path: "/".to_string(),
            secure: self.secure,
            http_only: true,
        }
    }
}

fn host_without_port(host: &str) -> String {
    // Bracketed IPv6 literals keep their colons.
    if let Some(end) = host.find(']') {
        return host[..=end].to_string();
    }
    host.split(':').next().unwrap_or(host).to_string()
}
