//! Byte-rate limiting for [`std::io`] readers and writers.
//!
//! One token is one byte. Several readers and writers may share one bucket to
//! cap their combined throughput.

use std::io::{self, Read, Write};

use crate::{Clock, StdClock, TokenBucket};

/// A reader that is rate limited by a token bucket.
///
/// Each read returns as soon as the inner reader does and then waits until
/// the bucket has paid for the bytes just read.
///
/// # Examples
///
/// ```rust
/// use std::io::Read;
/// use std::num::NonZeroU64;
/// use tickbucket::{Limit, TokenBucket};
/// use tickbucket::io::Reader;
///
/// let bucket = TokenBucket::new(Limit::per_second(NonZeroU64::new(1024).unwrap())).unwrap();
/// let mut reader = Reader::new(&b"hello"[..], &bucket);
/// let mut out = String::new();
/// reader.read_to_string(&mut out).unwrap();
/// assert_eq!("hello", out);
/// ```
pub struct Reader<'a, R, C = StdClock> {
    inner: R,
    bucket: &'a TokenBucket<C>,
}

impl<'a, R: Read, C: Clock> Reader<'a, R, C> {
    pub fn new(inner: R, bucket: &'a TokenBucket<C>) -> Self {
        Self { inner, bucket }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read, C: Clock> Read for Reader<'_, R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.bucket.wait(n as u64);
        }
        Ok(n)
    }
}

/// A writer that is rate limited by a token bucket.
///
/// Each write returns as soon as the inner writer does and then waits until
/// the bucket has paid for the bytes it accepted. Bytes the inner writer
/// leaves behind are not charged.
pub struct Writer<'a, W, C = StdClock> {
    inner: W,
    bucket: &'a TokenBucket<C>,
}

impl<'a, W: Write, C: Clock> Writer<'a, W, C> {
    pub fn new(inner: W, bucket: &'a TokenBucket<C>) -> Self {
        Self { inner, bucket }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write, C: Clock> Write for Writer<'_, W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.bucket.wait(n as u64);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
