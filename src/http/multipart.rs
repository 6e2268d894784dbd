use bytes::{BufMut, Bytes, BytesMut};
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const BOUNDARY: &str = "----------0xKhTmLbOuNdArY";
pub const CONTENT_TYPE: &str = "multipart/form-data, boundary=----------0xKhTmLbOuNdArY";

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("Unable to read upload for field {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A scalar form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn render(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", self.name).as_bytes());
        buf.put(self.value.as_bytes());
        buf.put(CRLF);
    }
}

/// An uploaded file. Always sent as `text/plain`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileParam {
    pub name: String,
    pub filename: String,
    pub content: Bytes,
}

impl FileParam {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        FileParam {
            name: name.into(),
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn render(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                self.name, self.filename
            )
            .as_bytes(),
        );
        buf.put(&b"Content-Type: text/plain\r\n\r\n"[..]);
        buf.put(&self.content[..]);
        buf.put(CRLF);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Field(Param),
    File(FileParam),
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Field(p) => &p.name,
            Part::File(p) => &p.name,
        }
    }

    pub fn render(&self) -> Bytes {
        match self {
            Part::Field(p) => p.render(),
            Part::File(p) => p.render(),
        }
    }

    fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Part::Field(p) => p.write_to(buf),
            Part::File(p) => p.write_to(buf),
        }
    }
}

/// A file to upload: the path reported as filename and where to read it from.
pub struct Upload {
    path: String,
    source: Box<dyn Read>,
}

impl Upload {
    pub fn new(path: impl Into<String>, source: impl Read + 'static) -> Self {
        Upload {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Upload::new(path.to_string_lossy(), file))
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload").field("path", &self.path).finish()
    }
}

#[derive(Debug)]
pub enum FormValue {
    Text(String),
    File(Upload),
    /// Sub-fields, sent as `name[key]`.
    Nested(Vec<(String, FormValue)>),
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<Upload> for FormValue {
    fn from(u: Upload) -> Self {
        FormValue::File(u)
    }
}

/// A multipart/form-data body under construction.
///
/// Uploads are read in full while the post is built, so rendering can be
/// repeated without touching the sources again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    params: Vec<Part>,
}

impl Post {
    pub fn new<I, K>(params: I) -> Result<Post, MultipartError>
    where
        I: IntoIterator<Item = (K, FormValue)>,
        K: Into<String>,
    {
        let mut post = Post::default();
        post.push_params(params, None)?;
        log::debug!("Built multipart post with {} parts", post.params.len());
        Ok(post)
    }

    pub fn push_params<I, K>(&mut self, params: I, prefix: Option<&str>) -> Result<(), MultipartError>
    where
        I: IntoIterator<Item = (K, FormValue)>,
        K: Into<String>,
    {
        for (key, value) in params {
            let key = key.into();
            let name = match prefix {
                Some(prefix) => format!("{}[{}]", prefix, key),
                None => key,
            };

            match value {
                FormValue::Text(value) => {
                    log::trace!("Adding field {} ({} bytes)", name, value.len());
                    self.params.push(Part::Field(Param::new(name, value)));
                }
                FormValue::File(mut upload) => {
                    let mut content = Vec::new();
                    if let Err(source) = upload.source.read_to_end(&mut content) {
                        return Err(MultipartError::Read { name, source });
                    }
                    log::trace!("Read {} bytes for upload {} ({})", content.len(), name, upload.path);
                    self.params
                        .push(Part::File(FileParam::new(name, upload.path, content)));
                }
                FormValue::Nested(children) => self.push_params(children, Some(&name))?,
            }
        }
        Ok(())
    }

    pub fn parts(&self) -> &[Part] {
        &self.params
    }

    /// Returns the body and the matching `Content-Type` header value.
    pub fn render(&self) -> (Bytes, String) {
        let mut body = BytesMut::new();
        for part in &self.params {
            body.put(&b"--"[..]);
            body.put(BOUNDARY.as_bytes());
            body.put(CRLF);
            part.write_to(&mut body);
        }
        body.put(format!("--{}--", BOUNDARY).as_bytes());

        (body.freeze(), CONTENT_TYPE.to_string())
    }
}
