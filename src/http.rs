use crate::http::cookies::{CookieConfig, CookieJar};
use crate::http::status::Status;
use std::collections::HashMap;

pub mod cookies;
pub mod mash;
pub mod method;
pub mod multipart;
pub mod parse;
pub mod request;
pub mod status;

#[derive(Debug)]
pub struct Response {
    pub status: Status,
    pub headers: HashMap<String, String>,
    pub content: Option<Vec<u8>>,
}

impl Response {
    pub fn from_parts(
        status: Status,
        headers: HashMap<String, String>,
        content: Option<Vec<u8>>,
    ) -> Response {
        Response {
            status,
            headers,
            content,
        }
    }

    /// Adds the `Set-Cookie` header for every cookie the jar marks for sending.
    /// Meant to run once, after the request has been handled.
    pub fn apply_cookies(&mut self, jar: &CookieJar, config: &CookieConfig) {
        let headers = jar.extract_headers(&config.request_defaults());
        self.headers.extend(headers);
    }
}

pub fn ok() -> Response {
    Response::from_parts(Status::OK, HashMap::new(), None)
}

/// Writes the response in HTTP/1.1 form. A header value spanning several
/// lines goes out as one header line per value.
pub fn serialize_response(response: &Response) -> Vec<u8> {
    let content_len = response.content.as_ref().map(|c| c.len()).unwrap_or(0);
    let mut resp_bytes = Vec::with_capacity(content_len + response.headers.len() * 32);

    resp_bytes.extend(
        format!(
            "HTTP/1.1 {} {}\r\n",
            response.status.code_num, response.status.message
        )
        .as_bytes(),
    );

    for (key, value) in &response.headers {
        for line in value.split('\n') {
            resp_bytes.extend(format!("{}: {}\r\n", key, line).as_bytes());
        }
    }

    if let Some(c) = &response.content {
        resp_bytes.extend(format!("Content-Length: {}\r\n", c.len()).as_bytes());
        resp_bytes.extend("\r\n".as_bytes());
        resp_bytes.extend(c);
    } else {
        resp_bytes.extend("\r\n".as_bytes());
    }

    resp_bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cookies::CookieOptions;

    #[test]
    fn apply_cookies_uses_configured_domain() {
        let config = CookieConfig {
            default_domain: Some("example.org".to_string()),
        };
        let mut jar = CookieJar::new(&config, [("seen", "1")]);
        jar.set_value("a", "1");
        jar.set_cookie("b", "2", CookieOptions::new().http_only(true));

        let mut response = ok();
        response.apply_cookies(&jar, &config);

        assert_eq!(
            response.headers.get("Set-Cookie").map(String::as_str),
            Some("a=1; domain=example.org; path=/;\nb=2; domain=example.org; path=/; HttpOnly;")
        );
    }

    #[test]
    fn apply_cookies_without_cookies_adds_nothing() {
        let jar = CookieJar::new(&CookieConfig::default(), [("seen", "1")]);
        let mut response = ok();
        response.apply_cookies(&jar, &CookieConfig::default());
        assert!(response.headers.is_empty());
    }

    #[test]
    fn serialize_one_line_per_cookie() {
        let mut jar = CookieJar::new(&CookieConfig::default(), Vec::<(String, String)>::new());
        jar.set_value("a", "1");
        jar.set_value("b", "2");

        let mut response = Response::from_parts(Status::OK, HashMap::new(), Some(b"hi".to_vec()));
        response.apply_cookies(&jar, &CookieConfig::default());

        let raw = String::from_utf8(serialize_response(&response)).unwrap();
        assert_eq!(
            raw,
            "HTTP/1.1 200 OK\r\n\
             Set-Cookie: a=1; path=/;\r\n\
             Set-Cookie: b=2; path=/;\r\n\
             Content-Length: 2\r\n\
             \r\n\
             hi"
        );
    }

    #[test]
    fn serialize_without_content() {
        let raw = serialize_response(&ok());
        assert_eq!(raw, b"HTTP/1.1 200 OK\r\n\r\n".to_vec());
    }
}
