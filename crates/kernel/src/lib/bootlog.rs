//! Early boot byte-ring logger, readable back before the console driver
//! or any filesystem exists. Keeps a small circular buffer of raw bytes
//! written by the printk path during the earliest boot phases.

use super::ringbuf::RingBuffer;
use spin::Mutex;

const BOOTLOG_CAP: usize = 16 * 1024;

struct ByteRing {
    inner: RingBuffer<u8, BOOTLOG_CAP>,
}

impl ByteRing {
    const fn new() -> Self {
        Self { inner: RingBuffer::new() }
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let _ = self.inner.push(b);
        }
    }

    fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.inner.pop() {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

static BOOTLOG: Mutex<ByteRing> = Mutex::new(ByteRing::new());

pub fn write(bytes: &[u8]) {
    BOOTLOG.lock().write(bytes);
}

/// Drains up to `buf.len()` bytes into `buf`, returning how many were written.
pub fn drain(buf: &mut [u8]) -> usize {
    BOOTLOG.lock().drain_into(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_writes() {
        write(b"hello");
        let mut buf = [0u8; 5];
        let n = drain(&mut buf);
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }
}
