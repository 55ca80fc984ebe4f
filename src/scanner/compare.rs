//! Byte-for-byte file comparison.
//!
//! Used to confirm a digest match before a duplicate is relinked. Both files
//! are streamed side by side, so memory use is two chunks regardless of size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::hasher::CHUNK_SIZE;
use super::HashError;

/// Compare two files byte for byte.
///
/// Returns `Ok(false)` as soon as lengths or any chunk differ.
///
/// # Errors
///
/// Returns [`HashError`] naming whichever file could not be opened or read.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool, HashError> {
    let file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
    let file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

    let len_a = file_a.metadata().map_err(|e| HashError::from_io(a, e))?.len();
    let len_b = file_b.metadata().map_err(|e| HashError::from_io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    readers_identical(file_a, file_b).map_err(|(first, e)| {
        if first {
            HashError::from_io(a, e)
        } else {
            HashError::from_io(b, e)
        }
    })
}

/// Compare two readers to EOF. The error carries `true` when the first
/// reader failed.
fn readers_identical<A: Read, B: Read>(mut a: A, mut b: B) -> Result<bool, (bool, io::Error)> {
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    loop {
        let n = fill(&mut a, &mut buf_a).map_err(|e| (true, e))?;
        let m = fill(&mut b, &mut buf_b).map_err(|e| (false, e))?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Read until the buffer is full or EOF, so short reads on one side do not
/// misalign the comparison.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
