//! Message headers as the stream layer sees them: already decoded from
//! HPACK, order preserved, pseudo-headers first.

use std::str::FromStr;

use bytes::Bytes;

/// One header, regular or pseudo.
///
/// Names are kept the way HTTP/2 transmits them: lowercase, with
/// pseudo-headers starting with `:`. Values are opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: Bytes,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<Bytes>) -> Header {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Pseudo-headers (`:method`, `:path`, ...) sort before regular headers.
    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with(':')
    }
}

/// The headers of one HTTP/2 message (or its trailers).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<Header>,
    pseudo_count: usize,
}

impl Headers {
    pub fn new() -> Headers {
        Default::default()
    }

    pub fn from_vec(headers: Vec<Header>) -> Headers {
        let mut r = Headers::new();
        for header in headers {
            r.add_header(header);
        }
        r
    }

    /// Regular headers go to the back, pseudo-headers behind the last
    /// pseudo-header, preserving relative order of both groups.
    pub fn add_header(&mut self, header: Header) {
        if header.is_pseudo() {
            self.headers.insert(self.pseudo_count, header);
            self.pseudo_count += 1;
        } else {
            self.headers.push(header);
        }
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        self.add_header(Header::new(name, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// The value of the first header with the given name, if it is valid UTF-8.
    pub fn get_opt(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .and_then(|h| std::str::from_utf8(&h.value).ok())
    }

    pub fn get_opt_parse<I: FromStr>(&self, name: &str) -> Option<I> {
        self.get_opt(name).and_then(|v| v.parse().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get_opt_parse("content-length")
    }

    pub fn method(&self) -> Option<&str> {
        self.get_opt(":method")
    }

    pub fn new_get(path: &str) -> Headers {
        Headers::from_vec(vec![
            Header::new(":method", "GET"),
            Header::new(":path", path.to_owned().into_bytes()),
            Header::new(":scheme", "http"),
        ])
    }

    pub fn new_post(path: &str) -> Headers {
        Headers::from_vec(vec![
            Header::new(":method", "POST"),
            Header::new(":path", path.to_owned().into_bytes()),
            Header::new(":scheme", "http"),
        ])
    }

    pub fn new_status(code: u32) -> Headers {
        Headers::from_vec(vec![Header::new(
            ":status",
            code.to_string().into_bytes(),
        )])
    }

    pub fn ok_200() -> Headers {
        Headers::new_status(200)
    }
}
