// One of the critical aspects of this library is error handling. Because it is intended
// to communicate with an external device, any operation could discover a disconnection
// from the SMW-SX1262M0 serial link, so everything which does such communication will
// return a `Result<T, smw_sx1262m0::Error>`.
//
// Note that the module itself reporting an error (`AT_ERROR`, `AT_BUSY_ERROR`, ...) is
// *not* an `Error`: those come back as a `StatusCode` inside the `Ok` variant, alongside
// whatever payload the command produced.
#[macro_use]
extern crate quick_error;
use std::io;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The connection to the module was impossible for some reason. Perhaps an
        /// invalid port was specified, or this program does not have permission to
        /// access the specified port.
        ConnectionFailed(err: serialport::Error) {
            cause(err)
            display("Could not open the serial port: {}", err)
            from()
        }
        /// The device to which the serial link is connected does not appear to be
        /// an SMW-SX1262M0, because it did not answer a bare `AT` with `OK`.
        WrongDevice(response: String) {
            display("Could not verify connected module. Expected 'OK' in answer to 'AT', got '{}'",
                response)
        }
        /// The program has become disconnected from the module due to an I/O error.
        /// It is possible the device was physically disconnected, or that the host
        /// operating system closed the serial port for some reason.
        Disconnected(err: io::Error) {
            cause(err)
            display("Lost the serial link to the module: {}", err)
            from()
        }
        /// The module's answer did not end in any known status token, so it cannot
        /// be interpreted at all.
        UnknownStatus(response: String) {
            display("Response does not end in a known status token: '{}'", response)
        }
        /// The module's answer ended in a valid status token, but the text before it
        /// did not have the shape the command is documented to return.
        MalformedPayload { shape: Shape, payload: String } {
            display("Expected a {:?} payload, got '{}'", shape, payload)
        }
    }
}

/// Universal `Result` wrapper for the SMW-SX1262M0 interface.
pub type Result<T> = std::result::Result<T, Error>;

// It's first necessary to actually connect to the module. To this end, the library
// exports all the configuration information needed to configure a serial port to
// communicate correctly with an SMW-SX1262M0.

use core::time::Duration;
use serialport::prelude::*;

/// Returns a `serialport::SerialPortSettings` corresponding to the fixed link settings
/// of the SMW-SX1262M0. Use this to configure your serial port.
///
/// The port timeout is short: the driver only ever asks for bytes the port has already
/// reported as available, and does its own deadline bookkeeping on top.
pub fn serial_config() -> SerialPortSettings {
    SerialPortSettings {
        baud_rate: 9600,
        data_bits: DataBits::Eight,
        flow_control: FlowControl::None,
        parity: Parity::None,
        stop_bits: StopBits::One,
        timeout: Duration::from_millis(10),
    }
}

/// How long the driver waits for the module in each kind of exchange.
///
/// Every window is an upper bound: a read stops as soon as a status token shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Queries, join, receive, P2P start/stop and ping.
    pub read: Duration,
    /// Setters, save and uplink sends.
    pub write: Duration,
    /// The reboot banner after `ATZ`.
    pub reset: Duration,
    /// Sleep between two polls that found nothing to read.
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            read: Duration::from_millis(100),
            write: Duration::from_millis(500),
            reset: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(1),
        }
    }
}

// The rest of the library is split by layer: the command codec turns operations into
// AT lines, the reader gathers the module's answer off the wire, the response parser
// turns that answer into a status and payload, and the listen machinery handles the
// P2P receive stream, which has no status tokens at all. The device handle ties them
// together over a `Transport`.

mod command;
mod device;
mod listen;
mod reader;
mod response;
mod status;
mod transport;

pub use command::{encode, Action, Command, FormattedKey, KeyKind, RESET_COMMAND};
pub use device::{SmwSx1262m0, DEFAULT_P2P_FREQUENCY};
pub use listen::{extract_message, ListenOutcome, P2pMessage};
pub use reader::{decode_tolerant, read_response};
pub use response::{parse, Payload, PortMessage, Response, Shape};
pub use status::StatusCode;
pub use transport::Transport;
