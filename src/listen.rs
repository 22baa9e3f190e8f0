// The P2P receive stream.
//
// Once `AT+RXLRA` is running the module prints each received packet as free text, for
// example `RSSI=-40 SNR=7 Text-> Hi\n\r`, with no status token and no length field. A
// packet is considered complete once the stream goes quiet with either `\n\r` or the
// `Test Stop` banner somewhere in the buffer.

const LINE_END: &str = "\n\r";
const STOP_BANNER: &str = "Test Stop";
const TEXT_MARKER: &str = "Text-> ";

/// One packet received in P2P mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P2pMessage {
    pub message: String,
    pub rssi: i32,
    pub snr: i32,
}

/// How a listen window ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    Received(P2pMessage),
    /// Nothing complete arrived before the deadline.
    Timeout,
    /// Something complete arrived but could not be decoded. Holds the raw text.
    Malformed(String),
}

impl ListenOutcome {
    pub fn is_received(&self) -> bool {
        matches!(self, ListenOutcome::Received(_))
    }

    /// Collapse timeouts and undecodable packets into "nothing received".
    pub fn into_message(self) -> Option<P2pMessage> {
        match self {
            ListenOutcome::Received(message) => Some(message),
            ListenOutcome::Timeout | ListenOutcome::Malformed(_) => None,
        }
    }
}

/// Whether the buffer holds something that can be treated as a finished packet.
pub(crate) fn is_complete(buffer: &str) -> bool {
    buffer.contains(LINE_END) || buffer.contains(STOP_BANNER)
}

/// Decode a finished packet. The text after the last `Text-> ` marker is the message;
/// `RSSI=` and `SNR=` are picked out of the whitespace-delimited tokens, the last
/// occurrence winning. All three must be present.
pub fn extract_message(buffer: &str) -> Option<P2pMessage> {
    let text = buffer.replace(STOP_BANNER, "");
    let (_, message) = text.rsplit_once(TEXT_MARKER)?;

    let mut rssi = None;
    let mut snr = None;
    for word in text.split_whitespace() {
        if let Some((_, value)) = word.rsplit_once("RSSI=") {
            rssi = Some(value);
        } else if let Some((_, value)) = word.rsplit_once("SNR=") {
            snr = Some(value);
        }
    }

    Some(P2pMessage {
        message: message.trim().to_owned(),
        rssi: rssi?.parse().ok()?,
        snr: snr?.parse().ok()?,
    })
}
