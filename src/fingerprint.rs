/// Content fingerprinting for duplicate detection.
///
/// Streams a file through MD5 in fixed-size chunks and returns the digest as
/// lowercase hex. The digest is only ever compared against digests computed
/// in the same run, so MD5's collision weaknesses are acceptable here.
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer size for fingerprinting.
const CHUNK_SIZE: usize = 4096;

/// Computes the content fingerprint of a file.
///
/// The file is read in 4096-byte chunks; it is never loaded into memory as a
/// whole. Fails with the underlying I/O error if the file cannot be opened
/// or a read fails mid-stream.
pub fn fingerprint(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identical_content_same_fingerprint() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        fs::write(&a, b"same bytes").expect("Failed to write file");
        fs::write(&b, b"same bytes").expect("Failed to write file");

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_different_content_different_fingerprint() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        fs::write(&a, b"first").expect("Failed to write file");
        fs::write(&b, b"second").expect("Failed to write file");

        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_known_digest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("empty.bin");
        fs::write(&path, b"").expect("Failed to write file");

        // MD5 of the empty input.
        assert_eq!(
            fingerprint(&path).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_large_file_spanning_chunks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("big_a.bin");
        let b = temp_dir.path().join("big_b.bin");
        let data = vec![0xabu8; CHUNK_SIZE * 3 + 17];
        fs::write(&a, &data).expect("Failed to write file");
        fs::write(&b, &data).expect("Failed to write file");

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(fingerprint(Path::new("/no/such/file.bin")).is_err());
    }
}
