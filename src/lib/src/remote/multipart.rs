//! Minimal `multipart/form-data` encoder for the single-file upload

use crate::error::WSError;
use std::io::{self, Read};

const BOUNDARY_PREFIX: &str = "----winsign-";
const CRLF: &str = "\r\n";

/// One file part of a form upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// File name announced in `Content-Disposition`
    pub file_name: String,
    /// MIME type of the content
    pub content_type: String,
    /// Raw file content
    pub content: Vec<u8>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: "application/octet-stream".to_string(),
            content,
        }
    }
}

/// An encoded multipart body together with its boundary
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    part: FilePart,
}

impl MultipartForm {
    /// Create a form around `part` with a random boundary
    pub fn new(part: FilePart) -> Result<Self, WSError> {
        let mut random = [0u8; 16];
        getrandom::fill(&mut random)
            .map_err(|e| WSError::InternalError(format!("Failed to generate boundary: {}", e)))?;
        Ok(Self::with_boundary(
            part,
            format!("{}{}", BOUNDARY_PREFIX, hex::encode(random)),
        ))
    }

    /// Create a form with a fixed boundary
    pub fn with_boundary(part: FilePart, boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            part,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn part(&self) -> &FilePart {
        &self.part
    }

    /// Value for the request `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Part headers, up to and including the blank line before the content
    fn head(&self) -> String {
        format!(
            "--{boundary}{crlf}\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"{crlf}\
             Content-Type: {content_type}{crlf}\
             Content-Transfer-Encoding: binary{crlf}{crlf}",
            boundary = self.boundary,
            field = escape_quoted(&self.part.field),
            file_name = escape_quoted(&self.part.file_name),
            content_type = self.part.content_type,
            crlf = CRLF,
        )
    }

    fn tail(&self) -> String {
        format!("{crlf}--{boundary}--{crlf}", boundary = self.boundary, crlf = CRLF)
    }

    /// Exact size of the encoded body, for the `Content-Length` header
    pub fn content_length(&self) -> u64 {
        (self.head().len() + self.part.content.len() + self.tail().len()) as u64
    }

    /// Stream the encoded body without copying the file content
    pub fn reader(&self) -> impl Read + '_ {
        io::Cursor::new(self.head().into_bytes())
            .chain(&self.part.content[..])
            .chain(io::Cursor::new(self.tail().into_bytes()))
    }

    /// Serialize the form into a request body
    pub fn to_body(&self) -> Vec<u8> {
        let head = self.head();
        let tail = self.tail();
        let mut body = Vec::with_capacity(head.len() + self.part.content.len() + tail.len());
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(&self.part.content);
        body.extend_from_slice(tail.as_bytes());
        body
    }
}

/// Percent-encode the characters that would break a quoted header parameter
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_layout() {
        let part = FilePart::new("file", "app.exe", b"MZ\x00\x01".to_vec());
        let form = MultipartForm::with_boundary(part, "XYZ");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");

        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\n\
              Content-Disposition: form-data; name=\"file\"; filename=\"app.exe\"\r\n\
              Content-Type: application/octet-stream\r\n\
              Content-Transfer-Encoding: binary\r\n\r\n",
        );
        expected.extend_from_slice(b"MZ\x00\x01");
        expected.extend_from_slice(b"\r\n--XYZ--\r\n");
        assert_eq!(form.to_body(), expected);
    }

    #[test]
    fn test_reader_matches_body() {
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 253) as u8).collect();
        let form = MultipartForm::new(FilePart::new("file", "big.exe", content)).unwrap();

        let mut streamed = Vec::new();
        form.reader().read_to_end(&mut streamed).unwrap();
        assert_eq!(streamed, form.to_body());
        assert_eq!(form.content_length(), streamed.len() as u64);
    }

    #[test]
    fn test_random_boundaries_differ() {
        let a = MultipartForm::new(FilePart::new("file", "a.exe", vec![1])).unwrap();
        let b = MultipartForm::new(FilePart::new("file", "a.exe", vec![1])).unwrap();
        assert!(a.boundary().starts_with(BOUNDARY_PREFIX));
        assert_eq!(a.boundary().len(), BOUNDARY_PREFIX.len() + 32);
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_file_name_escaping() {
        assert_eq!(escape_quoted("plain.exe"), "plain.exe");
        assert_eq!(escape_quoted("we\"ird\r\n.exe"), "we%22ird%0D%0A.exe");
    }

    #[test]
    fn test_empty_content() {
        let form = MultipartForm::with_boundary(FilePart::new("file", "e.exe", Vec::new()), "B");
        let body = form.to_body();
        assert!(body.ends_with(b"\r\n\r\n\r\n--B--\r\n"));
    }
}
