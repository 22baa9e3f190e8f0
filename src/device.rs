// Once connected to a serial port, the library needs to verify that it is actually
// connected to an SMW-SX1262M0 and not some other serial device. The module has no
// version string in a fixed format, so `::new()` settles for the bare `AT` ping, which
// must be answered with `OK`.

use crate::command::{encode, Action, Command, FormattedKey, KeyKind, RESET_COMMAND};
use crate::listen::{self, ListenOutcome};
use crate::reader::{before, deadline_after, drain_into, idle_until, read_response};
use crate::response::{parse, PortMessage, Response, Shape};
use crate::status::StatusCode;
use crate::transport::Transport;
use crate::{serial_config, Error, Result, Timeouts};
use log::{debug, warn};
use serialport::SerialPort;
use std::ffi::OsStr;
use std::time::Duration;

/// Frequency, in kHz, used for P2P tests when the caller has no preference.
pub const DEFAULT_P2P_FREQUENCY: u32 = 915_200;

/// A handle to a serial link connected to an SMW-SX1262M0 module.
///
/// All exchanges are synchronous: each method writes one command and blocks until the
/// module answers or the relevant timeout expires. The handle owns its transport, so
/// exchanges on one link are serialized by `&mut self`.
pub struct SmwSx1262m0<T: Transport = Box<dyn SerialPort>> {
    port: T,
    timeouts: Timeouts,
    listen_buffer: String,
}

impl SmwSx1262m0 {
    /// Open a new connection to a module at the given path or port name, with the
    /// default settings.
    pub fn new_at<S: AsRef<OsStr>>(port_name: S) -> Result<Self> {
        let sp = serialport::open_with_settings(&port_name, &serial_config())?;
        Self::new(sp)
    }
}

impl<T: Transport> SmwSx1262m0<T> {
    /// Open a new connection to a module over the given transport, checking that it
    /// answers `AT` with `OK`.
    pub fn new(port: T) -> Result<Self> {
        let mut device = Self::new_unverified(port);
        device.port.discard_input()?;
        device.write_line(&encode(None, Action::Run, ""))?;
        let raw = device.read(device.timeouts.read)?;
        match parse(&raw, Shape::None) {
            Ok(response) if response.status.is_ok() => Ok(device),
            _ => Err(Error::WrongDevice(raw.trim().to_owned())),
        }
    }

    /// Wrap a transport without talking to the module.
    pub fn new_unverified(port: T) -> Self {
        SmwSx1262m0 {
            port,
            timeouts: Timeouts::default(),
            listen_buffer: String::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn transport(&self) -> &T {
        &self.port
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.port
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    /// Discard anything the module sent that has not been read yet.
    pub fn flush(&mut self) -> Result<()> {
        self.port.discard_input()
    }

    fn write_line(&mut self, command: &str) -> Result<()> {
        debug!("-> {}", command);
        let mut line = String::with_capacity(command.len() + 1);
        line.push_str(command);
        line.push('\n');
        self.port.write_all(line.as_bytes())
    }

    fn read(&mut self, timeout: Duration) -> Result<String> {
        let raw = read_response(&mut self.port, timeout, self.timeouts.poll_interval)?;
        debug!("<- {:?}", raw);
        Ok(raw)
    }

    /// Write a raw command line (without terminator) and return the raw answer.
    ///
    /// Stale input is discarded first, so the answer only contains what the module
    /// printed after the command.
    pub fn transact(&mut self, command: &str, timeout: Duration) -> Result<String> {
        self.port.discard_input()?;
        self.write_line(command)?;
        self.read(timeout)
    }

    fn exchange(
        &mut self,
        command: Command,
        action: Action,
        parameter: &str,
        timeout: Duration,
        shape: Shape,
    ) -> Result<Response> {
        let raw = self.transact(&encode(Some(command), action, parameter), timeout)?;
        parse(&raw, shape)
    }

    fn run(&mut self, command: Command, timeout: Duration) -> Result<StatusCode> {
        Ok(self
            .exchange(command, Action::Run, "", timeout, Shape::None)?
            .status)
    }

    fn get_integer(&mut self, command: Command) -> Result<(StatusCode, Option<i32>)> {
        let timeout = self.timeouts.read;
        let response = self.exchange(command, Action::Get, "", timeout, Shape::Integer)?;
        Ok((response.status, response.integer()))
    }

    fn get_text(&mut self, command: Command) -> Result<(StatusCode, Option<String>)> {
        let timeout = self.timeouts.read;
        let response = self.exchange(command, Action::Get, "", timeout, Shape::Text)?;
        Ok((response.status, response.into_text()))
    }

    fn get_port_message(&mut self, command: Command) -> Result<(StatusCode, Option<PortMessage>)> {
        let timeout = self.timeouts.read;
        let response = self.exchange(command, Action::Get, "", timeout, Shape::PortMessage)?;
        Ok((response.status, response.into_port_message()))
    }

    fn set(&mut self, command: Command, parameter: &str) -> Result<StatusCode> {
        let timeout = self.timeouts.write;
        Ok(self
            .exchange(command, Action::Set, parameter, timeout, Shape::None)?
            .status)
    }

    /// Setter for a small integer domain; values above `max` never reach the module.
    fn set_bounded(&mut self, command: Command, value: u8, max: u8) -> Result<StatusCode> {
        if value > max {
            debug!("refusing {}={}, maximum is {}", command.keyword(), value, max);
            return Ok(StatusCode::LocalParamError);
        }
        self.set(command, &value.to_string())
    }

    fn set_key(&mut self, command: Command, kind: KeyKind, key: &str) -> Result<StatusCode> {
        match FormattedKey::normalize(kind, key) {
            Some(key) => self.set(command, key.as_str()),
            None => {
                debug!("refusing {} key of length {}", command.keyword(), key.len());
                Ok(StatusCode::BadParameter)
            }
        }
    }

    // Configuration queries and setters.

    /// Adaptive data rate, 0 or 1.
    pub fn get_adr(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::Adr)
    }

    pub fn set_adr(&mut self, adr: u8) -> Result<StatusCode> {
        self.set_bounded(Command::Adr, adr, 1)
    }

    /// Automatic join at power-up, 0 or 1.
    pub fn get_auto_join(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::AutoJoin)
    }

    pub fn set_auto_join(&mut self, mode: u8) -> Result<StatusCode> {
        self.set_bounded(Command::AutoJoin, mode, 1)
    }

    pub fn get_app_eui(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::AppEui)
    }

    /// Accepts `xx:xx:...` or 16 bare hex digits.
    pub fn set_app_eui(&mut self, app_eui: &str) -> Result<StatusCode> {
        self.set_key(Command::AppEui, KeyKind::Eui, app_eui)
    }

    pub fn get_app_key(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::AppKey)
    }

    pub fn set_app_key(&mut self, key: &str) -> Result<StatusCode> {
        self.set_key(Command::AppKey, KeyKind::Key, key)
    }

    pub fn get_app_s_key(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::AppSKey)
    }

    pub fn set_app_s_key(&mut self, key: &str) -> Result<StatusCode> {
        self.set_key(Command::AppSKey, KeyKind::Key, key)
    }

    pub fn get_dev_addr(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::DevAddr)
    }

    pub fn set_dev_addr(&mut self, dev_addr: &str) -> Result<StatusCode> {
        self.set_key(Command::DevAddr, KeyKind::DevAddr, dev_addr)
    }

    /// The device EUI is burned in and cannot be set.
    pub fn get_dev_eui(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::DevEui)
    }

    pub fn get_nwk_s_key(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::NwkSKey)
    }

    pub fn set_nwk_s_key(&mut self, key: &str) -> Result<StatusCode> {
        self.set_key(Command::NwkSKey, KeyKind::Key, key)
    }

    /// Data rate, 0 to 6 for DR_0 to DR_6.
    pub fn get_data_rate(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::DataRate)
    }

    pub fn set_data_rate(&mut self, data_rate: u8) -> Result<StatusCode> {
        self.set_bounded(Command::DataRate, data_rate, 6)
    }

    /// 0 for ABP, 1 for OTAA.
    pub fn get_join_mode(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::JoinMode)
    }

    pub fn set_join_mode(&mut self, mode: u8) -> Result<StatusCode> {
        self.set_bounded(Command::JoinMode, mode, 1)
    }

    /// 1 once the module has joined a network.
    pub fn get_join_status(&mut self) -> Result<(StatusCode, Option<i32>)> {
        let timeout = self.timeouts.read;
        let response = self.exchange(
            Command::JoinStatus,
            Action::Get,
            "",
            timeout,
            Shape::JoinStatusBit,
        )?;
        Ok((response.status, response.integer()))
    }

    /// Whether the module reports having joined. Any failure to find out counts as no.
    pub fn is_connected(&mut self) -> bool {
        match self.get_join_status() {
            Ok((_, Some(1))) => true,
            Ok(_) => false,
            Err(e) => {
                warn!("could not read join status: {}", e);
                false
            }
        }
    }

    /// Confirmed uplinks, 0 or 1.
    pub fn get_confirm_mode(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::ConfirmMode)
    }

    pub fn set_confirm_mode(&mut self, mode: u8) -> Result<StatusCode> {
        self.set_bounded(Command::ConfirmMode, mode, 1)
    }

    /// Whether the last confirmed uplink was acknowledged.
    pub fn get_confirm_status(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::ConfirmStatus)
    }

    /// LoRaWAN class, e.g. `A`.
    pub fn get_class(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::Class)
    }

    pub fn get_network_id(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::NetworkId)
    }

    pub fn get_tx_power(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::TxPower)
    }

    /// RSSI of the last received packet.
    pub fn get_rssi(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::Rssi)
    }

    /// SNR of the last received packet.
    pub fn get_snr(&mut self) -> Result<(StatusCode, Option<i32>)> {
        self.get_integer(Command::Snr)
    }

    /// Firmware version string.
    pub fn get_version(&mut self) -> Result<(StatusCode, Option<String>)> {
        self.get_text(Command::Version)
    }

    // Actions.

    /// Start joining the network. Completion is reported later; poll `is_connected`.
    pub fn join(&mut self) -> Result<StatusCode> {
        let timeout = self.timeouts.read;
        self.run(Command::Join, timeout)
    }

    /// Reboot the module. Its start-up banner is read for the reset window and thrown
    /// away, since it carries no status.
    pub fn reset(&mut self) -> Result<()> {
        self.port.discard_input()?;
        self.write_line(RESET_COMMAND)?;
        let timeout = self.timeouts.reset;
        self.read(timeout)?;
        Ok(())
    }

    /// Persist the current configuration.
    pub fn save(&mut self) -> Result<StatusCode> {
        let timeout = self.timeouts.write;
        self.run(Command::Save, timeout)
    }

    /// Check that the module is alive with a bare `AT`.
    pub fn ping(&mut self) -> Result<StatusCode> {
        let raw = self.transact(&encode(None, Action::Run, ""), self.timeouts.read)?;
        Ok(parse(&raw, Shape::None)?.status)
    }

    // Uplink and downlink.

    /// Send a text uplink on `port`.
    pub fn send_text(&mut self, port: u8, message: &str) -> Result<StatusCode> {
        self.set(Command::Send, &format!("{}:{}", port, message))
    }

    /// Send a hex uplink on `port`. Spaces are removed first; anything else that is not
    /// a hex digit is refused without touching the link.
    pub fn send_hex(&mut self, port: u8, message: &str) -> Result<StatusCode> {
        let message: String = message.chars().filter(|&c| c != ' ').collect();
        if !message.chars().all(|c| c.is_ascii_hexdigit()) {
            debug!("refusing non-hex payload {:?}", message);
            return Ok(StatusCode::LocalParamError);
        }
        self.set(Command::SendHex, &format!("{}:{}", port, message))
    }

    /// Send raw bytes as a hex uplink.
    pub fn send_bytes(&mut self, port: u8, payload: &[u8]) -> Result<StatusCode> {
        self.send_hex(port, &hex::encode_upper(payload))
    }

    /// Read the last text downlink.
    pub fn read_text(&mut self) -> Result<(StatusCode, Option<PortMessage>)> {
        self.get_port_message(Command::Receive)
    }

    /// Read the last downlink as hex.
    pub fn read_hex(&mut self) -> Result<(StatusCode, Option<PortMessage>)> {
        self.get_port_message(Command::ReceiveHex)
    }

    /// Read the last downlink and decode its hex into bytes.
    pub fn read_bytes(&mut self) -> Result<(StatusCode, Option<(u8, Vec<u8>)>)> {
        let (status, message) = self.read_hex()?;
        let message = match message {
            Some(message) => message,
            None => return Ok((status, None)),
        };
        match hex::decode(&message.message) {
            Ok(bytes) => Ok((status, Some((message.port, bytes)))),
            Err(_) => Err(Error::MalformedPayload {
                shape: Shape::PortMessage,
                payload: format!("{}:{}", message.port, message.message),
            }),
        }
    }

    // Point-to-point tests.

    /// Put the module in P2P mode on `frequency` (kHz). With a `message` it transmits
    /// it, otherwise it listens; `continuous` keeps it doing so until `p2p_stop`.
    pub fn p2p_start(
        &mut self,
        frequency: u32,
        continuous: bool,
        message: Option<&str>,
    ) -> Result<StatusCode> {
        let mode = if continuous { 1 } else { 0 };
        let (command, parameter) = match message {
            None => (Command::LoraRx, format!("{}:{}", frequency, mode)),
            Some(message) => (Command::LoraTx, format!("{}:{}:{}", frequency, mode, message)),
        };
        let timeout = self.timeouts.read;
        Ok(self
            .exchange(command, Action::Set, &parameter, timeout, Shape::None)?
            .status)
    }

    /// Wait up to `timeout` for one P2P packet.
    ///
    /// The buffer is cleared on entry. A packet is taken as complete once a poll finds
    /// nothing new and the buffer holds `\n\r` or `Test Stop`. On success the buffer is
    /// cleared and the transport's leftover input discarded; a packet that cannot be
    /// decoded is returned as `Malformed` and left in the buffer.
    pub fn p2p_listen(&mut self, timeout: Duration) -> Result<ListenOutcome> {
        self.listen_buffer.clear();
        let deadline = deadline_after(timeout);
        let mut complete = false;

        while before(deadline) {
            if drain_into(&mut self.port, &mut self.listen_buffer)? {
                continue;
            }
            if listen::is_complete(&self.listen_buffer) {
                complete = true;
                break;
            }
            idle_until(deadline, self.timeouts.poll_interval);
        }

        if !complete {
            return Ok(ListenOutcome::Timeout);
        }
        match listen::extract_message(&self.listen_buffer) {
            Some(message) => {
                debug!("P2P packet {:?}", message);
                self.listen_buffer.clear();
                self.port.discard_input()?;
                Ok(ListenOutcome::Received(message))
            }
            None => {
                warn!("could not decode P2P packet {:?}", self.listen_buffer);
                Ok(ListenOutcome::Malformed(self.listen_buffer.clone()))
            }
        }
    }

    /// Leave P2P mode.
    pub fn p2p_stop(&mut self) -> Result<StatusCode> {
        let timeout = self.timeouts.read;
        self.run(Command::LoraOff, timeout)
    }
}
