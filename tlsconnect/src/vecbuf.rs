use std::cmp;
use std::collections::VecDeque;
use std::io;
use std::io::Read;

/// A BufferQueue manages a sequence of buffers.
///
/// It holds TLS records waiting for the transport, and decrypted
/// application data waiting for the caller.  Partial transport writes
/// leave the unsent tail at the front, so a suspended flush resumes
/// exactly where it stopped.
pub(crate) struct BufferQueue {
    // ring buffer
    buffers: VecDeque<Vec<u8>>,
}

impl BufferQueue {
    pub(crate) fn new() -> Self {
        Self {
            buffers: VecDeque::new(),
        }
    }

    /// If we're empty
    pub(crate) fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// How many bytes we're storing
    pub(crate) fn len(&self) -> usize {
        self.buffers
            .iter()
            .map(Vec::len)
            .sum()
    }

    /// Place the buffer in line if it is not empty.
    pub(crate) fn enqueue(&mut self, buf: Vec<u8>) -> usize {
        let len = buf.len();

        if !buf.is_empty() {
            self.buffers.push_back(buf);
        }

        len
    }

    /// Read data out of this object, writing it into `buf`
    /// and returning how many bytes were written there.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut offs = 0;

        while offs < buf.len() && !self.is_empty() {
            let used = self.buffers[0]
                .as_slice()
                .read(&mut buf[offs..])?;

            self.consume(used);
            offs += used;
        }

        Ok(offs)
    }

    fn consume(&mut self, mut used: usize) {
        while let Some(mut buf) = self.buffers.pop_front() {
            if used < buf.len() {
                buf.drain(..used);
                self.buffers.push_front(buf);
                break;
            } else {
                used -= buf.len();
            }
        }
    }

    /// Read data out of this object, passing it `wr`
    pub(crate) fn write_to(&mut self, wr: &mut dyn io::Write) -> io::Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        let mut bufs = [io::IoSlice::new(&[]); 64];
        for (iov, buf) in bufs.iter_mut().zip(self.buffers.iter()) {
            *iov = io::IoSlice::new(buf);
        }
        let len = cmp::min(bufs.len(), self.buffers.len());
        let used = wr.write_vectored(&bufs[..len])?;
        self.consume(used);
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::BufferQueue;
    use std::io;

    /// Accepts at most `limit` bytes per call.
    struct Trickle {
        limit: usize,
        written: Vec<u8>,
    }

    impl io::Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.written
                .extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_spans_buffers() {
        let mut q = BufferQueue::new();
        assert_eq!(q.enqueue(b"hello".to_vec()), 5);
        assert_eq!(q.enqueue(Vec::new()), 0);
        q.enqueue(b"world".to_vec());
        assert_eq!(q.len(), 10);

        let mut buf = [0u8; 7];
        assert_eq!(q.read(&mut buf).unwrap(), 7);
        assert_eq!(&buf, b"hellowo");
        assert_eq!(q.len(), 3);

        assert_eq!(q.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"rld");
        assert!(q.is_empty());
    }

    #[test]
    fn partial_writes_resume_in_place() {
        let mut q = BufferQueue::new();
        q.enqueue(b"abc".to_vec());
        q.enqueue(b"defg".to_vec());

        let mut wr = Trickle {
            limit: 2,
            written: Vec::new(),
        };
        while !q.is_empty() {
            assert!(q.write_to(&mut wr).unwrap() <= 2);
        }
        assert_eq!(wr.written, b"abcdefg");
        assert_eq!(q.write_to(&mut wr).unwrap(), 0);
    }
}
