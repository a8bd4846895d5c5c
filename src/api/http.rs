use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, Read, Write};

const MAX_BODY: usize = 1 << 20;
const MAX_HEADERS: usize = 100;
const MAX_LINE: u64 = 8192;

/// Parsed HTTP/1.1 request.
#[derive(Debug, Default, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// Reads one request. Returns `Ok(None)` when the peer closed before
    /// sending a request line.
    pub fn read_from<R: BufRead>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut request_line = String::new();
        if read_capped_line(reader, &mut request_line)? == 0 {
            return Ok(None);
        }

        // GET /api/alerts?limit=10 HTTP/1.1
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(invalid("malformed request line"));
        };

        let (raw_path, raw_query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            if read_capped_line(reader, &mut line)? == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(invalid("too many headers"));
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let length = match headers.get("content-length") {
            Some(v) => v.parse::<usize>().map_err(|_| invalid("bad content-length"))?,
            None => 0,
        };
        if length > MAX_BODY {
            return Err(invalid("body too large"));
        }
        let mut body = vec![0; length];
        reader.read_exact(&mut body)?;

        Ok(Some(Self {
            method: method.to_ascii_uppercase(),
            path: percent_decode(raw_path),
            query: parse_query_params(raw_query),
            headers,
            body,
        }))
    }

    /// Body as JSON; an empty body reads as an empty object.
    pub fn json(&self) -> serde_json::Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(json!({}));
        }
        serde_json::from_slice(&self.body)
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Reads one line of at most `MAX_LINE` bytes.
fn read_capped_line<R: BufRead>(reader: &mut R, buf: &mut String) -> io::Result<usize> {
    let n = reader.by_ref().take(MAX_LINE).read_line(buf)?;
    if n as u64 == MAX_LINE && !buf.ends_with('\n') {
        return Err(invalid("line too long"));
    }
    Ok(n)
}

fn invalid(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.to_string())
}

pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = percent_decode(&parts.next()?.replace('+', " "));
            let value = percent_decode(&parts.next().unwrap_or("").replace('+', " "));
            Some((key, value))
        })
        .collect()
}

/// Decodes `%XX` escapes; malformed escapes are kept verbatim.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|e| {
            log::error!("Failed to serialize response: {}", e);
            b"{\"error\":\"serialization failed\"}".to_vec()
        });
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    pub fn ok<T: Serialize>(value: &T) -> Self {
        Self::json(200, value)
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len()
        );
        writer.write_all(head.as_bytes())?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "",
    }
}
