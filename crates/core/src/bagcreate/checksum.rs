use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha1::Digest as _;
use sha2::Digest as _;

use crate::config::ChecksumAlgorithm;

const BUF_SIZE: usize = 64 * 1024;

enum Hasher {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            ChecksumAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Sha512 => Self::Sha512(sha2::Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Hex digest of the file at `path`.
pub fn file_digest(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_known_digests() {
        let f = file_with(b"hello");
        assert_eq!(
            file_digest(f.path(), ChecksumAlgorithm::Md5).unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            file_digest(f.path(), ChecksumAlgorithm::Sha1).unwrap(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            file_digest(f.path(), ChecksumAlgorithm::Sha256).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            file_digest(f.path(), ChecksumAlgorithm::Sha512).unwrap().len(),
            128
        );
    }

    #[test]
    fn test_large_file_spans_buffers() {
        let content = vec![7u8; BUF_SIZE * 2 + 13];
        let f = file_with(&content);
        let expected = format!("{:x}", sha2::Sha256::digest(&content));
        assert_eq!(
            file_digest(f.path(), ChecksumAlgorithm::Sha256).unwrap(),
            expected
        );
    }

    #[test]
    fn test_missing_file_errors() {
        let result = file_digest(Path::new("/nonexistent/file"), ChecksumAlgorithm::Md5);
        assert!(result.is_err());
    }
}
