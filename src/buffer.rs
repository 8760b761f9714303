use crate::error::BufferError;
use std::io::{self, Read};

/// Default growth increment, in bytes.
pub const READ_UNIT: usize = 1024;

/// Growable byte container whose capacity advances in fixed `unit` steps
/// rather than doubling, so it stays at most one unit ahead of its contents.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    capacity: usize,
    unit: usize,
}

impl Buffer {
    /// Create a buffer with one unit of capacity already reserved.
    pub fn new(unit: usize) -> Result<Self, BufferError> {
        let mut buffer = Self {
            data: Vec::new(),
            capacity: 0,
            unit: unit.max(1),
        };
        buffer.ensure_capacity(buffer.unit)?;
        Ok(buffer)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Grow capacity to at least `n` bytes. Never shrinks and never touches
    /// the contents.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<(), BufferError> {
        if n <= self.capacity {
            return Ok(());
        }
        self.data
            .try_reserve_exact(n - self.data.len())
            .map_err(|source| BufferError {
                requested: n,
                source,
            })?;
        self.capacity = n;
        Ok(())
    }

    /// Copy `input` onto the end of the buffer.
    ///
    /// Whenever the input fills the remaining room, exactly that much is
    /// copied and capacity grows by one unit before continuing with the rest.
    pub fn append(&mut self, mut input: &[u8]) -> Result<(), BufferError> {
        while !input.is_empty() {
            let room = self.capacity - self.data.len();
            if input.len() >= room {
                let (head, rest) = input.split_at(room);
                self.data.extend_from_slice(head);
                self.ensure_capacity(self.capacity + self.unit)?;
                input = rest;
            } else {
                self.data.extend_from_slice(input);
                break;
            }
        }
        Ok(())
    }

    /// Read `reader` to end of input in unit-sized chunks, growing capacity
    /// after every read so one more unit always fits.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let mut chunk = vec![0u8; self.unit];
        let mut total = 0;
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            self.append(&chunk[..read])?;
            self.ensure_capacity(self.data.len() + self.unit)?;
            total += read;
        }
        Ok(total)
    }

    /// Release the backing storage.
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_unit() {
        let buffer = Buffer::new(16).unwrap();
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn zero_unit_is_clamped() {
        let buffer = Buffer::new(0).unwrap();
        assert_eq!(buffer.unit(), 1);
    }

    #[test]
    fn empty_append_is_noop() {
        let mut buffer = Buffer::new(8).unwrap();
        buffer.append(b"abc").unwrap();
        let capacity = buffer.capacity();

        buffer.append(b"").unwrap();

        assert_eq!(buffer.as_bytes(), b"abc");
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn appends_accumulate_and_capacity_stays_ahead() {
        let mut buffer = Buffer::new(4).unwrap();
        let mut expected = Vec::new();

        for piece in [&b"ab"[..], b"cdefghij", b"k", b"", b"lmnopqrstuvwxyz"] {
            let before = buffer.len();
            buffer.append(piece).unwrap();
            expected.extend_from_slice(piece);

            assert_eq!(buffer.len(), before + piece.len());
            assert!(buffer.capacity() >= buffer.len());
            assert!(buffer.capacity() <= buffer.len() + buffer.unit());
        }

        assert_eq!(buffer.as_bytes(), &expected[..]);
    }

    #[test]
    fn exact_fill_grows_by_one_unit() {
        let mut buffer = Buffer::new(4).unwrap();
        buffer.append(b"abcd").unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.capacity(), 8);
    }

    #[test]
    fn ensure_capacity_does_not_shrink_or_change_size() {
        let mut buffer = Buffer::new(4).unwrap();
        buffer.append(b"ab").unwrap();

        buffer.ensure_capacity(32).unwrap();
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(buffer.len(), 2);

        buffer.ensure_capacity(8).unwrap();
        assert_eq!(buffer.capacity(), 32);
    }

    #[test]
    fn reads_everything_from_reader() {
        let source: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let mut buffer = Buffer::new(64).unwrap();

        let read = buffer.read_from(&mut &source[..]).unwrap();

        assert_eq!(read, source.len());
        assert_eq!(buffer.as_bytes(), &source[..]);
        assert!(buffer.capacity() >= buffer.len() + buffer.unit());
    }
}
