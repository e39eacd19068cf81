//! Read side of a file handle: a read-ahead window over the remote file and
//! the fetch loop that turns short transport reads into full ones.

use bytes::{Bytes, BytesMut};

use crate::conn::Session;
use crate::error::Result;

/// Bytes of the file starting at `start`, kept from the last fetch.
#[derive(Debug, Default)]
struct Window {
    start: u64,
    data: Bytes,
}

impl Window {
    /// Bytes cached at `offset`, at most `max`.
    fn slice(&self, offset: u64, max: usize) -> Option<Bytes> {
        let end = self.start + self.data.len() as u64;
        if offset < self.start || offset >= end {
            return None;
        }
        let from = (offset - self.start) as usize;
        let to = from + max.min(self.data.len() - from);
        Some(self.data.slice(from..to))
    }
}

#[derive(Debug)]
pub(crate) struct StreamReader {
    /// Visible length, fixed when the handle was opened.
    len: u64,
    buffer_size: usize,
    /// Upper bound on one transport read.
    max_request: usize,
    window: Window,
}

impl StreamReader {
    pub(crate) fn new(len: u64, buffer_size: usize, max_request: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            len,
            buffer_size,
            max_request: max_request.max(buffer_size),
            window: Window::default(),
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Reads up to `want` bytes at `offset`. Returns fewer only when the
    /// visible end of the file is reached. Requests at least one buffer long
    /// bypass the window and go out in pieces of at most `max_request`.
    pub(crate) async fn read_at(
        &mut self,
        session: &Session,
        path: &str,
        offset: u64,
        want: usize,
    ) -> Result<Bytes> {
        let want = want.min(self.len.saturating_sub(offset) as usize);
        if want == 0 {
            return Ok(Bytes::new());
        }
        let mut out = BytesMut::with_capacity(want);
        let mut pos = offset;

        while out.len() < want {
            let remaining = want - out.len();
            if let Some(hit) = self.window.slice(pos, remaining) {
                pos += hit.len() as u64;
                out.extend_from_slice(&hit);
                continue;
            }

            let direct = remaining >= self.buffer_size;
            let ask = if direct {
                remaining.min(self.max_request)
            } else {
                self.buffer_size
                    .min(self.len.saturating_sub(pos) as usize)
            };
            let chunk = fetch(session, path, pos, ask).await?;
            if chunk.is_empty() {
                // the file shrank under us
                break;
            }
            if direct {
                pos += chunk.len() as u64;
                out.extend_from_slice(&chunk);
            } else {
                self.window = Window {
                    start: pos,
                    data: chunk,
                };
            }
        }
        Ok(out.freeze())
    }
}

async fn fetch(session: &Session, path: &str, offset: u64, len: usize) -> Result<Bytes> {
    let svc = session.service()?;
    session
        .timed("read", path, svc.read(path, offset, len))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_slice() {
        let w = Window {
            start: 10,
            data: Bytes::from_static(b"abcdef"),
        };
        assert_eq!(w.slice(9, 4), None);
        assert_eq!(w.slice(16, 4), None);
        assert_eq!(&w.slice(10, 2).unwrap()[..], b"ab");
        assert_eq!(&w.slice(13, 100).unwrap()[..], b"def");
    }
}
