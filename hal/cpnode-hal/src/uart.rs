//! Serial byte channel abstractions
//!
//! The bus is half duplex and polled by the host, so the node only ever
//! needs three primitives: "is a byte waiting", "read one byte" and
//! "write one byte".

use embedded_io::{Read, ReadExactError, ReadReady, Write};

/// Byte channel to the CMRI bus
///
/// `read_byte` may block until a byte arrives. Callers that must not
/// block check [`SerialPort::available`] first.
pub trait SerialPort {
    /// Error type for channel operations
    type Error;

    /// Number of bytes that can be read without blocking
    ///
    /// Implementations that cannot count pending bytes return 1 when at
    /// least one byte is waiting.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Read a single byte, blocking until one arrives
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Write every byte of `data` in order
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T: SerialPort + ?Sized> SerialPort for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        T::available(self)
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        T::read_byte(self)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::write_byte(self, byte)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write_all(self, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}

/// Errors from [`EmbeddedIoPort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError<E> {
    /// The underlying driver reported an error
    Io(E),
    /// The stream ended while a byte was expected
    EndOfStream,
}

/// [`SerialPort`] over any blocking `embedded-io` driver
///
/// Works with the blocking UARTs of the common embedded HALs as long as
/// they implement `ReadReady`.
#[derive(Debug)]
pub struct EmbeddedIoPort<T> {
    inner: T,
}

impl<T> EmbeddedIoPort<T> {
    /// Wrap an `embedded-io` driver
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Access the wrapped driver
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Release the wrapped driver
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> SerialPort for EmbeddedIoPort<T>
where
    T: Read + Write + ReadReady,
{
    type Error = PortError<T::Error>;

    fn available(&mut self) -> Result<usize, Self::Error> {
        let ready = self.inner.read_ready().map_err(PortError::Io)?;
        Ok(usize::from(ready))
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).map_err(|e| match e {
            ReadExactError::UnexpectedEof => PortError::EndOfStream,
            ReadExactError::Other(e) => PortError::Io(e),
        })?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.inner.write_all(&[byte]).map_err(PortError::Io)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data).map_err(PortError::Io)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().map_err(PortError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{ErrorKind, ErrorType};

    /// Loopback-style mock: reads from a fixed script, records writes
    struct MockUart {
        rx: &'static [u8],
        tx: [u8; 16],
        tx_len: usize,
        flushed: bool,
    }

    impl MockUart {
        fn new(rx: &'static [u8]) -> Self {
            Self {
                rx,
                tx: [0; 16],
                tx_len: 0,
                flushed: false,
            }
        }
    }

    impl ErrorType for MockUart {
        type Error = ErrorKind;
    }

    impl Read for MockUart {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.rx.len());
            buf[..n].copy_from_slice(&self.rx[..n]);
            self.rx = &self.rx[n..];
            Ok(n)
        }
    }

    impl ReadReady for MockUart {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Write for MockUart {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            let room = self.tx.len() - self.tx_len;
            if room == 0 {
                return Err(ErrorKind::OutOfMemory);
            }
            let n = buf.len().min(room);
            self.tx[self.tx_len..self.tx_len + n].copy_from_slice(&buf[..n]);
            self.tx_len += n;
            Ok(n)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushed = true;
            Ok(())
        }
    }

    #[test]
    fn test_available_tracks_pending_bytes() {
        let mut port = EmbeddedIoPort::new(MockUart::new(&[0x41]));
        assert_eq!(port.available(), Ok(1));
        assert_eq!(port.read_byte(), Ok(0x41));
        assert_eq!(port.available(), Ok(0));
    }

    #[test]
    fn test_read_past_end_reports_end_of_stream() {
        let mut port = EmbeddedIoPort::new(MockUart::new(&[]));
        assert_eq!(port.read_byte(), Err(PortError::EndOfStream));
    }

    #[test]
    fn test_writes_reach_driver() {
        let mut port = EmbeddedIoPort::new(MockUart::new(&[]));
        port.write_byte(0xFF).unwrap();
        port.write_all(&[0x02, 0x41]).unwrap();
        port.flush().unwrap();

        let uart = port.into_inner();
        assert_eq!(&uart.tx[..uart.tx_len], &[0xFF, 0x02, 0x41]);
        assert!(uart.flushed);
    }
}
