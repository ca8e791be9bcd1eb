//! Cookie-based session handling.
//!
//! The cookie file maps a domain to the cookies exported from a logged-in
//! browser:
//!
//! ```json
//! { "facebook.com": [ { "name": "c_user", "value": "1000", "domain": ".facebook.com",
//!                       "path": "/", "secure": true, "httpOnly": false } ] }
//! ```

use crate::error::SessionError;
use crate::fetch::static_fetch::browser_headers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Domain key read from the cookie file.
pub const COOKIE_DOMAIN: &str = "facebook.com";

/// Cookies without which the platform serves the login wall.
pub const REQUIRED_COOKIES: [&str; 3] = ["c_user", "xs", "datr"];

const SUCCESS_MARKERS: [&str; 4] = ["notification", "fb-notifications", "\"viewer\"", "\"USER_ID\""];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

/// Cookies of one logged-in account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    cookies: Vec<Cookie>,
}

impl Session {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Parse a cookie file and keep the platform domain's cookies.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let mut by_domain: BTreeMap<String, Vec<Cookie>> = serde_json::from_str(json)?;
        match by_domain.remove(COOKIE_DOMAIN) {
            Some(cookies) if !cookies.is_empty() => Ok(Self { cookies }),
            _ => Err(SessionError::NoDomainCookies(COOKIE_DOMAIN.to_string())),
        }
    }

    /// Load and format-check the cookie file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(SessionError::MissingFile(path.display().to_string()));
        }
        let json = tokio::fs::read_to_string(path).await?;
        let session = Self::from_json(&json)?;
        session.validate_format()?;
        info!(cookies = session.cookies.len(), "Loaded session cookies");
        Ok(session)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Check that the required cookies are present and well formed.
    pub fn validate_format(&self) -> Result<(), SessionError> {
        for name in REQUIRED_COOKIES {
            match self.get(name) {
                None => return Err(SessionError::MissingCookie(name)),
                Some(v) if v.trim().is_empty() => return Err(SessionError::EmptyCookie(name)),
                Some(_) => {}
            }
        }
        let user = self.get("c_user").unwrap_or_default();
        if !user.chars().all(|c| c.is_ascii_digit()) {
            return Err(SessionError::NonNumericUser(user.to_string()));
        }
        Ok(())
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Fetch the notifications page and check that the session is live.
    #[instrument(level = "info", skip_all, fields(base_url = %base_url))]
    pub async fn verify(&self, client: &reqwest::Client, base_url: &str) -> Result<(), SessionError> {
        let url = format!("{}/notifications", base_url.trim_end_matches('/'));
        let resp = client
            .get(&url)
            .headers(browser_headers())
            .header(reqwest::header::COOKIE, self.cookie_header())
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        match classify_auth_response(status, &final_url, &body) {
            Ok(()) => {
                info!("Session verified");
                Ok(())
            }
            Err(e) => {
                warn!(status, final_url = %final_url, error = %e, "Session verification failed");
                Err(e)
            }
        }
    }

    /// Write the cookies back in the cookie-file format, owner-readable only.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let mut by_domain = BTreeMap::new();
        by_domain.insert(COOKIE_DOMAIN.to_string(), self.cookies.clone());
        let json = serde_json::to_string_pretty(&by_domain)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }
}

/// Decide what a notifications-page response says about the session.
///
/// Redirect targets are checked first, then the success markers of a
/// logged-in page, then the markers of a login wall or challenge.
pub fn classify_auth_response(status: u16, final_url: &str, body: &str) -> Result<(), SessionError> {
    if final_url.contains("/login") {
        return Err(SessionError::LoginRedirect);
    }
    if final_url.contains("/checkpoint") {
        return Err(SessionError::Checkpoint);
    }
    if status == 200 && SUCCESS_MARKERS.iter().any(|m| body.contains(m)) {
        return Ok(());
    }

    let lower = body.to_lowercase();
    if lower.contains("checkpoint") {
        return Err(SessionError::Checkpoint);
    }
    if lower.contains("captcha") {
        return Err(SessionError::Captcha);
    }
    if lower.contains("login") || body.contains("Log In") {
        return Err(SessionError::LoginRedirect);
    }

    match status {
        200 => Ok(()),
        code => Err(SessionError::Status(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "facebook.com": [
            {"name": "c_user", "value": "100004", "domain": ".facebook.com", "path": "/", "secure": true, "httpOnly": false},
            {"name": "xs", "value": "abc%3Adef", "domain": ".facebook.com", "path": "/", "secure": true, "httpOnly": true},
            {"name": "datr", "value": "xyz", "domain": ".facebook.com", "path": "/", "secure": true, "httpOnly": true, "expires": 1767225600.0}
        ]
    }"#;

    #[test]
    fn test_parse_and_header() {
        let session = Session::from_json(VALID).unwrap();
        session.validate_format().unwrap();
        assert_eq!(session.get("xs"), Some("abc%3Adef"));
        assert_eq!(session.cookie_header(), "c_user=100004; xs=abc%3Adef; datr=xyz");
        assert_eq!(session.cookies()[2].expires, Some(1767225600.0));
        assert!(session.cookies()[1].http_only);
    }

    #[test]
    fn test_fractional_expiry_compares_by_value() {
        let json = r#"{"facebook.com": [{"name": "xs", "value": "2", "expires": 1767225600.25}]}"#;
        let a = Session::from_json(json).unwrap();
        let b = Session::from_json(json).unwrap();
        assert_eq!(a.cookies()[0].expires, Some(1767225600.25));
        assert_eq!(a, b);
    }

    #[test]
    fn test_other_domain_only() {
        let json = r#"{"example.com": [{"name": "a", "value": "b"}]}"#;
        assert!(matches!(
            Session::from_json(json),
            Err(SessionError::NoDomainCookies(_))
        ));
    }

    #[test]
    fn test_validate_format_failures() {
        let cookie = |name: &str, value: &str| Cookie {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: String::new(),
            secure: false,
            http_only: false,
            expires: None,
        };

        let missing = Session::new(vec![cookie("c_user", "1"), cookie("xs", "x")]);
        assert!(matches!(missing.validate_format(), Err(SessionError::MissingCookie("datr"))));

        let empty = Session::new(vec![cookie("c_user", "1"), cookie("xs", " "), cookie("datr", "d")]);
        assert!(matches!(empty.validate_format(), Err(SessionError::EmptyCookie("xs"))));

        let named = Session::new(vec![cookie("c_user", "jane"), cookie("xs", "x"), cookie("datr", "d")]);
        assert!(matches!(named.validate_format(), Err(SessionError::NonNumericUser(_))));
    }

    #[test]
    fn test_classify_auth_response() {
        assert!(classify_auth_response(200, "https://www.facebook.com/notifications", "\"viewer\":{}").is_ok());
        assert!(matches!(
            classify_auth_response(200, "https://www.facebook.com/login/?next=x", ""),
            Err(SessionError::LoginRedirect)
        ));
        assert!(matches!(
            classify_auth_response(200, "https://www.facebook.com/checkpoint/1", ""),
            Err(SessionError::Checkpoint)
        ));
        assert!(matches!(
            classify_auth_response(200, "https://www.facebook.com/notifications", "solve this CAPTCHA"),
            Err(SessionError::Captcha)
        ));
        assert!(matches!(
            classify_auth_response(200, "https://www.facebook.com/notifications", "<button>Log In</button>"),
            Err(SessionError::LoginRedirect)
        ));
        assert!(matches!(
            classify_auth_response(500, "https://www.facebook.com/notifications", "oops"),
            Err(SessionError::Status(500))
        ));
        assert!(classify_auth_response(200, "https://www.facebook.com/notifications", "<html></html>").is_ok());
    }

    #[tokio::test]
    async fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        assert!(matches!(Session::load(&path).await, Err(SessionError::MissingFile(_))));

        tokio::fs::write(&path, VALID).await.unwrap();
        let session = Session::load(&path).await.unwrap();

        let out = dir.path().join("nested/saved.json");
        session.save(&out).await.unwrap();
        let reloaded = Session::load(&out).await.unwrap();
        assert_eq!(reloaded, session);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&out).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
