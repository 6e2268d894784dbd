use crate::http::cookies::{CookieConfig, CookieJar};
use crate::http::method::Method;
use crate::http::multipart::Post;
use crate::http::parse::parse_cookie_header;
use std::collections::HashMap;

/// An in-memory request, as handed to dispatch. Header names are stored lowercased.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub content: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Request {
        Request {
            method,
            url: url.to_string(),
            headers: HashMap::new(),
            content: Vec::new(),
        }
    }

    pub fn with_header(mut self, k: &str, v: &str) -> Request {
        self.headers.insert(k.to_lowercase(), v.to_string());
        self
    }

    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.headers.get(&k.to_lowercase()).map(|v| v.as_str())
    }

    /// Builds a request carrying `post` as its multipart body.
    pub fn multipart(method: Method, url: &str, post: &Post) -> Request {
        let (body, content_type) = post.render();
        log::debug!("{} {} with {} byte multipart body", method, url, body.len());

        let mut request = Request::new(method, url)
            .with_header("Content-Type", &content_type)
            .with_header("Content-Length", &body.len().to_string());
        request.content = body.to_vec();
        request
    }

    pub fn multipart_post(url: &str, post: &Post) -> Request {
        Request::multipart(Method::POST, url, post)
    }

    pub fn multipart_put(url: &str, post: &Post) -> Request {
        Request::multipart(Method::PUT, url, post)
    }

    /// The cookies sent with this request. None of them is marked for the response.
    pub fn cookies(&self, config: &CookieConfig) -> CookieJar {
        let values = self
            .get_header("cookie")
            .map(parse_cookie_header)
            .unwrap_or_default();
        CookieJar::new(config, values)
    }
}
