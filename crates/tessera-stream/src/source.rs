#![forbid(unsafe_code)]

use std::io::{Read, Seek, SeekFrom};

use crate::error::{FetchError, SourceError, SourceResult};

/// Seekable, readable view of a remote resource of known length.
///
/// Every instance owns its cursor. [`duplicate`](ByteSource::duplicate)
/// yields an independent instance over the same resource, so concurrent
/// requests never share a read position.
pub trait ByteSource: Read + Seek + Send {
    /// Total resource length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current cursor.
    fn position(&self) -> u64;

    /// Issue one range request for `[position, position + want)` where
    /// `want = min(buf.len(), len - position)` and copy the body into `buf`.
    ///
    /// Returns `Ok(0)` at end of data. The cursor advances by the bytes that
    /// actually arrived, also when the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or when fewer than `want`
    /// bytes arrive ([`SourceError::Incomplete`]).
    fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, FetchError>;

    /// Independent instance over the same resource with its cursor at 0.
    #[must_use]
    fn duplicate(&self) -> Self
    where
        Self: Sized;
}

/// Resolve a seek against a cursor and length.
///
/// Positions past `len` clamp to `len`.
///
/// # Errors
///
/// Returns [`SourceError::InvalidSeek`] if the result would be negative.
pub fn resolve_seek(current: u64, len: u64, pos: SeekFrom) -> SourceResult<u64> {
    let target: i128 = match pos {
        SeekFrom::Start(p) => i128::from(p),
        SeekFrom::Current(delta) => i128::from(current) + i128::from(delta),
        SeekFrom::End(delta) => i128::from(len) + i128::from(delta),
    };

    if target < 0 {
        return Err(SourceError::InvalidSeek);
    }

    Ok(u64::try_from(target).map_or(len, |t| t.min(len)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::start(0, SeekFrom::Start(40), 40)]
    #[case::start_clamped(0, SeekFrom::Start(500), 100)]
    #[case::current_forward(10, SeekFrom::Current(5), 15)]
    #[case::current_back(10, SeekFrom::Current(-10), 0)]
    #[case::current_zero(37, SeekFrom::Current(0), 37)]
    #[case::end(0, SeekFrom::End(0), 100)]
    #[case::end_back(0, SeekFrom::End(-30), 70)]
    #[case::end_forward_clamped(0, SeekFrom::End(30), 100)]
    #[case::huge_clamped(0, SeekFrom::Current(i64::MAX), 100)]
    fn test_resolve_seek(#[case] current: u64, #[case] pos: SeekFrom, #[case] expected: u64) {
        assert_eq!(resolve_seek(current, 100, pos).unwrap(), expected);
    }

    #[rstest]
    #[case::current(10, SeekFrom::Current(-11))]
    #[case::end(0, SeekFrom::End(-101))]
    #[case::min(0, SeekFrom::Current(i64::MIN))]
    fn test_resolve_seek_negative(#[case] current: u64, #[case] pos: SeekFrom) {
        assert!(matches!(
            resolve_seek(current, 100, pos),
            Err(SourceError::InvalidSeek)
        ));
    }
}
