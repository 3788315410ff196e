//! Fan one byte stream out to several writers

use std::io::{self, Write};

/// Forwards every chunk to each sink in turn before accepting the next one,
/// so a file is read once no matter how many digests are computed.
pub struct Broadcast<'a, W: Write> {
    sinks: &'a mut [W],
}

impl<'a, W: Write> Broadcast<'a, W> {
    pub fn new(sinks: &'a mut [W]) -> Self {
        Self { sinks }
    }
}

impl<W: Write> Write for Broadcast<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in self.sinks.iter_mut() {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sink_sees_every_chunk() {
        let mut sinks = vec![Vec::new(), Vec::new(), Vec::new()];
        {
            let mut broadcast = Broadcast::new(&mut sinks);
            broadcast.write_all(b"hello ").unwrap();
            broadcast.write_all(b"world").unwrap();
            broadcast.flush().unwrap();
        }

        for sink in &sinks {
            assert_eq!(sink.as_slice(), b"hello world");
        }
    }

    #[test]
    fn test_copy_through_broadcast() {
        let mut sinks = vec![Vec::new(), Vec::new()];
        let data = vec![7u8; 100_000];

        let copied = io::copy(&mut data.as_slice(), &mut Broadcast::new(&mut sinks)).unwrap();

        assert_eq!(copied, 100_000);
        assert!(sinks.iter().all(|s| *s == data));
    }

    #[test]
    fn test_no_sinks() {
        let mut sinks: Vec<Vec<u8>> = Vec::new();
        let mut broadcast = Broadcast::new(&mut sinks);
        assert_eq!(broadcast.write(b"abc").unwrap(), 3);
    }
}
