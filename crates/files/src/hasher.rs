//! Streaming SHA-256 digests.

use crate::{io_context, FilesError, HASH_CHUNK_SIZE};
use patchlist_types::Sha256Hash;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Hashes everything `reader` yields, [`HASH_CHUNK_SIZE`] bytes at a time.
///
/// Nothing is returned unless the reader reaches EOF cleanly.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<Sha256Hash> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    let hash_array: [u8; 32] = hasher.finalize().into();
    Ok(Sha256Hash::from_bytes(&hash_array))
}

/// Computes the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`FilesError::Io`] if the file cannot be opened, or if a read fails part way
/// through (for example because the file was removed or truncated underneath us).
pub fn hash_file(path: &Path) -> Result<Sha256Hash, FilesError> {
    let file = fs::File::open(path)
        .map_err(|e| io_context(e, format!("Failed to open {} for hashing", path.display())))?;

    hash_reader(file).map_err(|e| io_context(e, format!("Failed to hash {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_hash_known_vectors() {
        assert_eq!(hash_reader(&b"hello"[..]).unwrap().as_str(), HELLO);
        assert_eq!(hash_reader(&b""[..]).unwrap().as_str(), EMPTY);
    }

    #[test]
    fn test_hash_file_matches_reader() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bin");
        fs::write(&path, b"hello").unwrap();

        let first = hash_file(&path).unwrap();
        let second = hash_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), HELLO);
    }

    #[test]
    fn test_hash_differs_with_content() {
        let a = hash_reader(&b"hello"[..]).unwrap();
        let b = hash_reader(&b"hellp"[..]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_spans_multiple_chunks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        let data: Vec<u8> = (0..HASH_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let expected: [u8; 32] = hasher.finalize().into();

        assert_eq!(hash_file(&path).unwrap(), Sha256Hash::from_bytes(&expected));
    }

    #[test]
    fn test_hash_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = hash_file(&temp.path().join("gone.bin"));

        match result {
            Err(FilesError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
