//! Fuzz target for multipart body encoding
//!
//! The announced file name comes from the build directory and must not be
//! able to break out of the `Content-Disposition` header, whatever it holds.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winsign::remote::{FilePart, MultipartForm};

fuzz_target!(|data: &[u8]| {
    let split = data.first().map(|b| *b as usize).unwrap_or(0).min(data.len());
    let name = String::from_utf8_lossy(&data[..split]).into_owned();
    let content = data[split..].to_vec();

    let form = MultipartForm::with_boundary(FilePart::new("file", name, content.clone()), "FUZZ");
    let body = form.to_body();

    let header_end = body
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    // Exactly three header lines after the boundary line
    let head = &body[..header_end];
    assert_eq!(head.windows(2).filter(|w| *w == b"\r\n").count(), 3);
    assert_eq!(&body[header_end + 4..header_end + 4 + content.len()], &content[..]);
    assert!(body.ends_with(b"\r\n--FUZZ--\r\n"));
});
