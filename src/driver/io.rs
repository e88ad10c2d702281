//! Artifact output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write the executable image as `<name>.exe` in `dir`.
pub fn write_image_file(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(format!("{name}.exe"));
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Write the human-readable listing as `<name>.il` in `dir`.
pub fn write_listing_file(dir: &Path, name: &str, text: &str) -> io::Result<PathBuf> {
    let path = dir.join(format!("{name}.il"));
    fs::write(&path, text)?;
    Ok(path)
}
