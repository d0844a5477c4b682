use sha2::{digest::Digest, Sha256};
use std::io::{BufReader, Read};

/// Lowercase hex SHA-256 of a byte buffer. This is the content-identity
/// proxy recorded in the audit trail, not a cryptographic signature.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Streaming variant for callers holding a reader instead of a buffer.
pub fn fingerprint_reader<R: Read>(reader: R) -> std::io::Result<String> {
    let mut reader = BufReader::new(reader);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let bytes = b"the same bytes";
        assert_eq!(fingerprint(bytes), fingerprint(bytes));
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn distinct_content_distinct_digest() {
        assert_ne!(fingerprint(b"document v1"), fingerprint(b"document v2"));
    }

    #[test]
    fn reader_matches_buffer() {
        let bytes = vec![0xA5u8; 20_000];
        let streamed = fingerprint_reader(&bytes[..]).unwrap();
        assert_eq!(streamed, fingerprint(&bytes));
    }
}
