//! Fuzz target for file name extension parsing
//!
//! Build directories can contain arbitrary names. The extension split must
//! never panic on multi-byte characters, leading or trailing dots, or names
//! without any dot.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winsign::candidate::file_extension;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        match file_extension(name) {
            Some(ext) => {
                assert!(name.ends_with(ext));
                assert!(!ext.contains('.'));
                assert!(name.len() > ext.len());
            }
            None => assert!(!name.contains('.')),
        }
    }
});
