use crate::http::mash::Mash;
use crate::http::parse::escape;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

pub const SET_COOKIE: &str = "Set-Cookie";
pub const COOKIE_EXPIRATION_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

const NEWLINE: &str = "\n";

#[derive(Clone, Debug, Default)]
pub struct CookieConfig {
    pub default_domain: Option<String>,
}

impl CookieConfig {
    /// Defaults handed to [`CookieJar::extract_headers`] once a request is done.
    pub fn request_defaults(&self) -> CookieOptions {
        CookieOptions::new().domain(self.default_domain.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Time(DateTime<Utc>),
    Flag(bool),
}

impl AttrValue {
    pub fn is_blank(&self) -> bool {
        match self {
            AttrValue::Text(s) => s.trim().is_empty(),
            AttrValue::Time(_) => false,
            AttrValue::Flag(b) => !b,
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, AttrValue::Flag(false))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S UTC")),
            AttrValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for AttrValue {
    fn from(t: DateTime<Tz>) -> Self {
        AttrValue::Time(t.with_timezone(&Utc))
    }
}

impl From<SystemTime> for AttrValue {
    fn from(t: SystemTime) -> Self {
        AttrValue::Time(t.into())
    }
}

/// Attributes attached to a cookie (`path`, `domain`, `expires`, `secure`,
/// `http_only`, or anything else the caller wants rendered as `key=value`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    attrs: Mash<AttrValue>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn path(self, path: &str) -> Self {
        self.set("path", path)
    }

    pub fn domain(self, domain: &str) -> Self {
        self.set("domain", domain)
    }

    pub fn expires(self, expires: impl Into<AttrValue>) -> Self {
        self.set("expires", expires)
    }

    pub fn secure(self, secure: bool) -> Self {
        self.set("secure", secure)
    }

    pub fn http_only(self, http_only: bool) -> Self {
        self.set("http_only", http_only)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.attrs.insert(key, value.into())
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.attrs.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn merge(&self, other: &CookieOptions) -> CookieOptions {
        CookieOptions {
            attrs: self.attrs.merge(&other.attrs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CookieState {
    /// Came in with the request; not sent back.
    Hydrated,
    /// Marked for the `Set-Cookie` header.
    Transmit(CookieOptions),
}

#[derive(Debug, Clone)]
pub struct Cookie {
    pub value: String,
    pub state: CookieState,
}

/// The cookies of a single request/response cycle.
#[derive(Debug, Clone)]
pub struct CookieJar {
    cookies: Mash<Cookie>,
    defaults: CookieOptions,
}

impl CookieJar {
    pub fn new<I, K, V>(config: &CookieConfig, initial: I) -> CookieJar
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cookies = initial
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    Cookie {
                        value: v.into(),
                        state: CookieState::Hydrated,
                    },
                )
            })
            .collect();

        CookieJar {
            cookies,
            defaults: CookieOptions::new()
                .domain(config.default_domain.as_deref().unwrap_or(""))
                .path("/"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|c| c.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn is_transmittable(&self, name: &str) -> bool {
        matches!(
            self.cookies.get(name),
            Some(Cookie {
                state: CookieState::Transmit(_),
                ..
            })
        )
    }

    pub fn options(&self, name: &str) -> Option<&CookieOptions> {
        match &self.cookies.get(name)?.state {
            CookieState::Transmit(options) => Some(options),
            CookieState::Hydrated => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, c)| (k, c.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Sets a value and marks the cookie for the response, keeping any
    /// options it already carries.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        let cookie = self.cookies.get_or_insert_with(name, || Cookie {
            value: String::new(),
            state: CookieState::Hydrated,
        });
        if cookie.state == CookieState::Hydrated {
            cookie.state = CookieState::Transmit(CookieOptions::new());
        }
        cookie.value = value.into();
    }

    /// Sets a value with its options. Previous options are dropped, not merged.
    pub fn set_cookie(&mut self, name: &str, value: impl Into<String>, options: CookieOptions) {
        self.set_value(name, value);
        if let Some(cookie) = self.cookies.get_mut(name) {
            cookie.state = CookieState::Transmit(options);
        }
    }

    /// Clears the cookie on the client. `expires` is always forced to the epoch.
    pub fn delete(&mut self, name: &str, options: CookieOptions) {
        let options = options.expires(SystemTime::UNIX_EPOCH);
        self.set_cookie(name, "", options);
    }

    pub fn update<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in values {
            self.set_value(k.as_ref(), v);
        }
    }

    /// Renders every transmittable cookie. The result is empty or holds a
    /// single `Set-Cookie` entry with one cookie per line.
    pub fn extract_headers(&self, request_defaults: &CookieOptions) -> HashMap<String, String> {
        let defaults = self.defaults.merge(request_defaults);

        let cookies: Vec<String> = self
            .cookies
            .iter()
            .filter_map(|(name, cookie)| match &cookie.state {
                CookieState::Transmit(options) => {
                    Some(render_cookie(name, &cookie.value, defaults.merge(options)))
                }
                CookieState::Hydrated => None,
            })
            .collect();

        log::debug!(
            "{} of {} cookies marked for Set-Cookie",
            cookies.len(),
            self.cookies.len()
        );

        if cookies.is_empty() {
            HashMap::new()
        } else {
            HashMap::from([(SET_COOKIE.to_string(), cookies.join(NEWLINE))])
        }
    }
}

fn render_cookie(name: &str, value: &str, mut options: CookieOptions) -> String {
    let expires = match options.get("expires") {
        Some(AttrValue::Time(t)) => Some(t.format(COOKIE_EXPIRATION_FORMAT).to_string()),
        _ => None,
    };
    if let Some(expires) = expires {
        options.insert("expires", expires);
    }

    let secure = options.remove("secure").is_some_and(|v| v.is_truthy());
    let http_only = options.remove("http_only").is_some_and(|v| v.is_truthy());

    let mut kookie = format!("{}={}; ", name, escape(value));
    // some clients reject empty attributes
    for (k, v) in options.iter().filter(|(_, v)| !v.is_blank()) {
        kookie.push_str(&format!("{}={}; ", k, v));
    }
    if secure {
        kookie.push_str("secure; ");
    }
    if http_only {
        kookie.push_str("HttpOnly; ");
    }
    kookie.truncate(kookie.trim_end().len());

    log::trace!("rendered cookie: {}", kookie);
    kookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn jar() -> CookieJar {
        CookieJar::new(&CookieConfig::default(), [("incoming", "1")])
    }

    fn set_cookie(jar: &CookieJar, defaults: &CookieOptions) -> Option<String> {
        jar.extract_headers(defaults).remove(SET_COOKIE)
    }

    #[test]
    fn hydrated_cookies_are_not_sent() {
        let jar = jar();
        assert_eq!(jar.get("incoming"), Some("1"));
        assert!(!jar.is_transmittable("incoming"));
        assert!(jar.extract_headers(&CookieOptions::new()).is_empty());
    }

    #[test]
    fn implicit_assignment_is_sent() {
        let mut jar = jar();
        jar.set_value("foo", "bar");
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("foo=bar; path=/;")
        );
    }

    #[test]
    fn reassigning_hydrated_cookie_marks_it() {
        let mut jar = jar();
        jar.set_value("incoming", "2");
        assert!(jar.is_transmittable("incoming"));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("incoming=2; path=/;")
        );
    }

    #[test]
    fn implicit_assignment_keeps_options() {
        let mut jar = jar();
        jar.set_cookie("foo", "bar", CookieOptions::new().path("/app"));
        jar.set_value("foo", "baz");
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("foo=baz; path=/app;")
        );
    }

    #[test]
    fn set_cookie_replaces_options() {
        let mut jar = jar();
        jar.set_cookie("foo", "bar", CookieOptions::new().secure(true));
        jar.set_cookie("foo", "bar", CookieOptions::new().http_only(true));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("foo=bar; path=/; HttpOnly;")
        );
    }

    #[test]
    fn renders_all_attributes() {
        let mut jar = jar();
        let expires = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        jar.set_cookie(
            "session",
            "a b=c",
            CookieOptions::new()
                .domain("example.org")
                .expires(expires)
                .secure(true)
                .http_only(true),
        );
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some(
                "session=a+b%3Dc; domain=example.org; path=/; \
                 expires=Wed, 01-Jan-2025 00:00:00 GMT; secure; HttpOnly;"
            )
        );
    }

    #[test]
    fn expires_is_converted_to_utc() {
        let mut jar = jar();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let expires = offset.with_ymd_and_hms(2025, 1, 1, 1, 30, 0).unwrap();
        jar.set_cookie("a", "b", CookieOptions::new().expires(expires));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("a=b; path=/; expires=Tue, 31-Dec-2024 23:30:00 GMT;")
        );
    }

    #[test]
    fn string_expires_passes_through() {
        let mut jar = jar();
        jar.set_cookie("a", "b", CookieOptions::new().expires("whenever"));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("a=b; path=/; expires=whenever;")
        );
    }

    #[test]
    fn delete_forces_epoch_expiry() {
        let mut jar = jar();
        let later = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        jar.delete("incoming", CookieOptions::new().expires(later).path("/x"));

        assert!(jar.contains("incoming"));
        assert_eq!(jar.get("incoming"), Some(""));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("incoming=; path=/x; expires=Thu, 01-Jan-1970 00:00:00 GMT;")
        );
    }

    #[test]
    fn merge_precedence() {
        let config = CookieConfig {
            default_domain: Some("jar.example".to_string()),
        };
        let mut jar = CookieJar::new(&config, Vec::<(String, String)>::new());
        jar.set_value("plain", "1");
        jar.set_cookie("own", "2", CookieOptions::new().domain("own.example"));

        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("plain=1; domain=jar.example; path=/;\nown=2; domain=own.example; path=/;")
        );

        let request = CookieOptions::new().domain("req.example").path("/req");
        assert_eq!(
            set_cookie(&jar, &request).as_deref(),
            Some("plain=1; domain=req.example; path=/req;\nown=2; domain=own.example; path=/req;")
        );
    }

    #[test]
    fn blank_attributes_are_omitted() {
        let mut jar = jar();
        jar.set_cookie(
            "a",
            "b",
            CookieOptions::new()
                .path("")
                .set("comment", "  ")
                .set("max-age", "60")
                .secure(false),
        );
        let header = set_cookie(&jar, &CookieOptions::new().domain("")).unwrap();
        assert_eq!(header, "a=b; max-age=60;");
        assert!(!header.contains("=;"));
    }

    #[test]
    fn truthy_text_flags() {
        let mut jar = jar();
        jar.set_cookie("a", "b", CookieOptions::new().set("secure", "yes"));
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("a=b; path=/; secure;")
        );
    }

    #[test]
    fn cookies_keep_insertion_order() {
        let mut jar = jar();
        jar.set_value("z", "1");
        jar.set_value("incoming", "2");
        jar.set_value("a", "3");
        assert_eq!(
            set_cookie(&jar, &CookieOptions::new()).as_deref(),
            Some("incoming=2; path=/;\nz=1; path=/;\na=3; path=/;")
        );
    }

    #[test]
    fn update_marks_every_value() {
        let mut jar = jar();
        jar.update([("x", "1"), ("y", "2")]);
        assert!(jar.is_transmittable("x"));
        assert!(jar.is_transmittable("y"));
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.options("x"), Some(&CookieOptions::new()));
        assert_eq!(jar.options("incoming"), None);
    }

    #[test]
    fn config_request_defaults() {
        let config = CookieConfig {
            default_domain: Some("example.org".to_string()),
        };
        assert_eq!(
            config.request_defaults().get("domain"),
            Some(&AttrValue::Text("example.org".to_string()))
        );
        assert_eq!(
            CookieConfig::default().request_defaults().get("domain"),
            Some(&AttrValue::Text(String::new()))
        );
    }
}
