// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content checksums of final models.

use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::{fs::File, io};

/// The checksum recorded for test cases whose cross-machine bit-exactness is waived.
pub const WAIVED_CHECKSUM: &str = "0000000000000000";

/// Computes the lowercase hex SHA-256 digest of the file at `path`.
pub fn file_checksum(path: &Utf8Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;

    #[test]
    fn checksum_of_known_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final.mod");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            file_checksum(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = file_checksum(&dir.path().join("final.mod")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
