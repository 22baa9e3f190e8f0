use crate::Result;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};

/// The byte stream the driver talks over.
///
/// The driver never blocks on a read: it asks how much is waiting, takes exactly that,
/// and keeps its own deadline. Implementations only need to be non-blocking for
/// `read_available` calls that stay within the reported count.
pub trait Transport {
    /// Write all of `bytes` and push them out.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// How many bytes can be read right now without waiting.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `count` bytes that `bytes_available` reported.
    fn read_available(&mut self, count: usize) -> Result<Vec<u8>>;

    /// Throw away everything received but not yet read.
    fn discard_input(&mut self) -> Result<()>;
}

impl Transport for Box<dyn SerialPort> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(self, bytes)?;
        self.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; count];
        let read = match self.read(&mut buf) {
            Ok(read) => read,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        buf.truncate(read);
        Ok(buf)
    }

    fn discard_input(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
