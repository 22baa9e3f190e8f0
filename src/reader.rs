use crate::status::StatusCode;
use crate::transport::Transport;
use crate::Result;
use log::{trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Append `bytes` to `out` as UTF-8, silently dropping anything that does not decode.
///
/// A multi-byte character split across two reads is lost; the module only prints ASCII
/// outside of user payloads, so this never affects the protocol text itself.
pub fn decode_tolerant(mut bytes: &[u8], out: &mut String) {
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                match err.error_len() {
                    Some(skip) => bytes = &rest[skip..],
                    None => return,
                }
            }
        }
    }
}

/// Move everything the transport has waiting into `buffer`. Returns whether anything arrived.
pub(crate) fn drain_into<T: Transport>(transport: &mut T, buffer: &mut String) -> Result<bool> {
    let available = transport.bytes_available()?;
    if available == 0 {
        return Ok(false);
    }
    let bytes = transport.read_available(available)?;
    trace!("drained {} bytes: {:?}", bytes.len(), String::from_utf8_lossy(&bytes));
    decode_tolerant(&bytes, buffer);
    Ok(!bytes.is_empty())
}

/// The instant `timeout` from now, or `None` when it lies beyond what `Instant` can
/// represent, in which case the window never closes.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

pub(crate) fn before(deadline: Option<Instant>) -> bool {
    deadline.map_or(true, |deadline| Instant::now() < deadline)
}

/// Sleep for `interval`, but never past `deadline`.
pub(crate) fn idle_until(deadline: Option<Instant>, interval: Duration) {
    let nap = match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(interval),
        None => interval,
    };
    if nap > Duration::from_secs(0) {
        thread::sleep(nap);
    }
}

/// Gather the module's answer to one command.
///
/// Polls the transport until the text gathered so far contains a status token or
/// `timeout` runs out, whichever comes first, then discards whatever is left in the
/// transport's input buffer. The text is returned as-is; a window that expired without
/// a status token yields whatever partial text arrived, possibly nothing.
pub fn read_response<T: Transport>(
    transport: &mut T,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let deadline = deadline_after(timeout);
    let mut pending = String::new();
    let mut matched = false;

    while before(deadline) {
        let arrived = drain_into(transport, &mut pending)?;
        if StatusCode::appears_in(&pending) {
            matched = true;
            break;
        }
        if !arrived {
            idle_until(deadline, poll_interval);
        }
    }

    if !matched {
        warn!(
            "no status token within {} ms, got {:?}",
            timeout.as_millis(),
            pending
        );
    }
    transport.discard_input()?;
    Ok(pending)
}
