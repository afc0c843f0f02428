use std::fs;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

/// Compute the MD5 digest of a file as a lowercase hex string.
///
/// The build server publishes MD5 digests for its archives, so staleness
/// checks hash the local copy with the same algorithm.
pub fn md5_file(path: &Path) -> Result<String, String> {
    let mut file = fs::File::open(path).map_err(|e| format!("checksum open error: {e}"))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| format!("checksum read error: {e}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hashes_known_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        // md5("hello world")
        assert_eq!(
            md5_file(file.path()).unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn hashes_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            md5_file(file.path()).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = md5_file(Path::new("/nonexistent/archive.zip")).unwrap_err();
        assert!(err.contains("checksum open error"));
    }
}
