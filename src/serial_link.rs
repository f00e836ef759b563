//! Owns the byte-level reader and writer, exposing framed-write and
//! framed-read primitives.
//!
//! The physical serial device itself is out of scope (spec.md §1 treats it
//! as an external collaborator); what's modeled here is the bridge between
//! its inherently blocking I/O and the embassy async world the rest of the
//! driver runs in — a dedicated OS thread does the blocking `read`, handing
//! off complete frames through a leaked, 'static channel, the same pattern
//! this codebase already uses to bridge a simulator device into its async
//! tasks (`Box::leak` for channels shared across a spawn boundary).

use crate::codec;
use crate::error::DriverError;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use std::io::{self, Read, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Minimal blocking byte transport a serial link is built on. The production
/// implementation wraps a `serialport::SerialPort`; tests substitute an
/// in-memory duplex so the framing/bridging logic can be exercised without
/// real hardware.
pub trait SerialTransport: Send {
    fn read_byte(&mut self) -> io::Result<u8>;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()>;
}

struct PortTransport(Box<dyn serialport::SerialPort>);

impl SerialTransport for PortTransport {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.0.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.0, buf)
    }

    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        self.0
            .set_baud_rate(baud)
            .map_err(io::Error::other)
    }
}

const FRAME_QUEUE_SIZE: usize = 64;
type FrameQueue = Channel<CriticalSectionRawMutex, Vec<u8>, FRAME_QUEUE_SIZE>;

pub struct SerialLink {
    writer: Mutex<Box<dyn SerialTransport>>,
    frames: &'static FrameQueue,
    down: Signal<CriticalSectionRawMutex, ()>,
    destroyed: AtomicBool,
}

impl SerialLink {
    /// Open the port at `url`/`baudrate` with parity=None, 2 stop bits, 8
    /// data bits, and start the background reader thread.
    pub fn open(url: &str, baudrate: u32) -> Result<&'static SerialLink, DriverError> {
        let port = serialport::new(url, baudrate)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::Two)
            .data_bits(serialport::DataBits::Eight)
            .timeout(std::time::Duration::from_secs(3600))
            .open()
            .map_err(|e| DriverError::DeviceNotFound(format!("failed to open {url}: {e}")))?;
        let reader = port
            .try_clone()
            .map_err(|e| DriverError::DeviceNotFound(format!("failed to clone port handle: {e}")))?;
        Ok(Self::from_transports(
            Box::new(PortTransport(port)),
            Box::new(PortTransport(reader)),
        ))
    }

    /// Build a link from an already-open pair of transport handles (one
    /// kept for writing, one moved into the reader thread). Used directly
    /// by tests to substitute an in-memory duplex for real hardware.
    pub fn from_transports(
        writer: Box<dyn SerialTransport>,
        reader: Box<dyn SerialTransport>,
    ) -> &'static SerialLink {
        let frames: &'static FrameQueue = Box::leak(Box::new(Channel::new()));
        let link: &'static SerialLink = Box::leak(Box::new(SerialLink {
            writer: Mutex::new(writer),
            frames,
            down: Signal::new(),
            destroyed: AtomicBool::new(false),
        }));
        spawn_reader(reader, frames, link);
        link
    }

    /// Try to upgrade the local port's baud rate after the radio has been
    /// told (via `SetBaudrate`) to switch.
    pub fn set_baud_rate(&self, baud: u32) -> Result<(), DriverError> {
        self.writer
            .lock()
            .unwrap()
            .set_baud_rate(baud)
            .map_err(|e| DriverError::DeviceNotFound(format!("failed to set baud rate: {e}")))
    }

    /// Frame and write a command body. Synchronous: real writes to a serial
    /// port complete essentially instantly, so no yielding is needed here.
    pub fn write(&self, body: &[u8]) -> Result<(), DriverError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(DriverError::DeviceNotFound("link destroyed".into()));
        }
        let framed = codec::frame(body);
        self.writer
            .lock()
            .unwrap()
            .write_all(&framed)
            .map_err(|e| {
                self.destroyed.store(true, Ordering::Release);
                self.down.signal(());
                DriverError::DeviceNotFound(format!("write failed: {e}"))
            })
    }

    /// Await the next complete frame (START..STOP inclusive), or a
    /// `DeviceNotFound` if the link has been torn down.
    pub async fn next_frame(&self) -> Result<Vec<u8>, DriverError> {
        match select(self.frames.receive(), self.down.wait()).await {
            Either::First(frame) => Ok(frame),
            Either::Second(()) => Err(DriverError::DeviceNotFound("link destroyed".into())),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Tear down the link: future writes and reads fail fast.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.down.signal(());
    }
}

fn spawn_reader(mut reader: Box<dyn SerialTransport>, frames: &'static FrameQueue, link: &'static SerialLink) {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        loop {
            match reader.read_byte() {
                Ok(byte) => {
                    buf.push(byte);
                    if byte == codec::STOP {
                        embassy_futures::block_on(frames.send(std::mem::take(&mut buf)));
                    }
                }
                Err(e) => {
                    log::error!("serial reader thread stopping: {e}");
                    link.destroy();
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    /// In-memory transport pair: `inbound` feeds bytes as if arriving from
    /// the radio, `outbound` captures everything written to the port.
    pub struct MockReader {
        rx: mpsc::Receiver<u8>,
    }

    pub struct MockWriter {
        pub outbound: Arc<Mutex<Vec<u8>>>,
    }

    impl SerialTransport for MockReader {
        fn read_byte(&mut self) -> io::Result<u8> {
            self.rx
                .recv()
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "mock reader closed"))
        }
        fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn set_baud_rate(&mut self, _baud: u32) -> io::Result<()> {
            Ok(())
        }
    }

    impl SerialTransport for MockWriter {
        fn read_byte(&mut self) -> io::Result<u8> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "mock writer can't read"))
        }
        fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            self.outbound.lock().unwrap().extend_from_slice(buf);
            Ok(())
        }
        fn set_baud_rate(&mut self, _baud: u32) -> io::Result<()> {
            Ok(())
        }
    }

    /// Build a link plus a byte-feeder and the captured-outbound buffer.
    pub fn mock_link() -> (&'static SerialLink, mpsc::Sender<u8>, Arc<Mutex<Vec<u8>>>) {
        let (tx, rx) = mpsc::channel();
        let outbound = Arc::new(Mutex::new(Vec::new()));
        let link = SerialLink::from_transports(
            Box::new(MockWriter { outbound: outbound.clone() }),
            Box::new(MockReader { rx }),
        );
        (link, tx, outbound)
    }

    pub fn inject_frame(tx: &mpsc::Sender<u8>, body: &[u8]) {
        for byte in codec::frame(body) {
            tx.send(byte).unwrap();
        }
    }
}
