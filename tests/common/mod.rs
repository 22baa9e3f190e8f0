#![allow(dead_code)]

use smw_sx1262m0::{Result, SmwSx1262m0, Timeouts, Transport};
use std::collections::VecDeque;
use std::time::Duration;

/// An in-memory stand-in for the serial port.
///
/// Each queued reply is released into the input stream when the next line is written.
/// The input stream hands out one chunk per poll; an empty chunk is a poll that finds
/// nothing.
#[derive(Default)]
pub struct MockTransport {
    replies: VecDeque<Vec<Vec<u8>>>,
    incoming: VecDeque<Vec<u8>>,
    pub writes: Vec<String>,
    pub discards: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Queue the chunks the module prints after the next written line.
    pub fn reply(mut self, chunks: &[&str]) -> Self {
        self.replies
            .push_back(chunks.iter().map(|c| c.as_bytes().to_vec()).collect());
        self
    }

    /// Make chunks available right away, as if the module printed them unprompted.
    pub fn feed(&mut self, chunks: &[&str]) {
        self.incoming
            .extend(chunks.iter().map(|c| c.as_bytes().to_vec()));
    }

    pub fn feed_bytes(&mut self, chunk: &[u8]) {
        self.incoming.push_back(chunk.to_vec());
    }

    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writes.push(String::from_utf8_lossy(bytes).into_owned());
        if let Some(chunks) = self.replies.pop_front() {
            self.incoming.extend(chunks);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        match self.incoming.front().map(Vec::len) {
            Some(0) => {
                self.incoming.pop_front();
                Ok(0)
            }
            Some(len) => Ok(len),
            None => Ok(0),
        }
    }

    fn read_available(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut chunk = self.incoming.pop_front().unwrap_or_default();
        assert!(chunk.len() <= count, "read fewer bytes than were available");
        chunk.truncate(count);
        Ok(chunk)
    }

    fn discard_input(&mut self) -> Result<()> {
        self.discards += 1;
        self.incoming.clear();
        Ok(())
    }
}

pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        read: Duration::from_millis(200),
        write: Duration::from_millis(200),
        reset: Duration::from_millis(50),
        poll_interval: Duration::from_millis(1),
    }
}

pub fn device(transport: MockTransport) -> SmwSx1262m0<MockTransport> {
    SmwSx1262m0::new_unverified(transport).with_timeouts(fast_timeouts())
}
