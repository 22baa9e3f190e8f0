use std::fmt;

/// The outcome of one exchange with the module.
///
/// Every variant except `LocalParamError` corresponds to a token the module prints at
/// the end of its answer. `LocalParamError` is produced by this library when an argument
/// is rejected before anything is written to the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// `OK`
    Ok,
    /// `AT_ERROR`
    GenericError,
    /// `AT_BUSY_ERROR`: the LoRa network is busy and the command was not completed.
    NetworkBusy,
    /// `AT_PARAM_ERROR`
    BadParameter,
    /// `AT_TEST_PARAM_OVERFLOW`: a parameter was too long.
    ParameterOverflow,
    /// `AT_NO_NETWORK_JOINED`
    NotJoined,
    /// An argument was out of range and the command was never sent.
    LocalParamError,
}

impl StatusCode {
    /// Every status the module can put on the wire, in the order the reader scans for them.
    pub const WIRE: [StatusCode; 6] = [
        StatusCode::Ok,
        StatusCode::GenericError,
        StatusCode::NetworkBusy,
        StatusCode::BadParameter,
        StatusCode::ParameterOverflow,
        StatusCode::NotJoined,
    ];

    /// The token the module prints for this status, if it has one.
    pub fn token(self) -> Option<&'static str> {
        match self {
            StatusCode::Ok => Some("OK"),
            StatusCode::GenericError => Some("AT_ERROR"),
            StatusCode::NetworkBusy => Some("AT_BUSY_ERROR"),
            StatusCode::BadParameter => Some("AT_PARAM_ERROR"),
            StatusCode::ParameterOverflow => Some("AT_TEST_PARAM_OVERFLOW"),
            StatusCode::NotJoined => Some("AT_NO_NETWORK_JOINED"),
            StatusCode::LocalParamError => None,
        }
    }

    /// Resolve a whole whitespace-delimited token to a status.
    pub fn from_token(token: &str) -> Option<StatusCode> {
        StatusCode::WIRE
            .iter()
            .copied()
            .find(|status| status.token() == Some(token))
    }

    /// Whether `text` contains any wire status token anywhere in it.
    pub fn appears_in(text: &str) -> bool {
        StatusCode::WIRE
            .iter()
            .filter_map(|status| status.token())
            .any(|token| text.contains(token))
    }

    /// Numeric code used by the vendor's AT command documentation.
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::GenericError => 101,
            StatusCode::NetworkBusy => 102,
            StatusCode::BadParameter => 103,
            StatusCode::ParameterOverflow => 104,
            StatusCode::NotJoined => 105,
            StatusCode::LocalParamError => 200,
        }
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token().unwrap_or("PARAM_ERROR"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_resolve_back_to_their_status() {
        for status in StatusCode::WIRE.iter().copied() {
            let token = status.token().unwrap();
            assert_eq!(StatusCode::from_token(token), Some(status));
        }
        assert_eq!(StatusCode::from_token("PARAM_ERROR"), None);
        assert_eq!(StatusCode::from_token("ok"), None);
    }

    #[test]
    fn substring_scan_finds_tokens_mid_stream() {
        assert!(StatusCode::appears_in("+EVT:JOINED\r\nOK\r\n"));
        assert!(StatusCode::appears_in("garbage AT_BUSY_ERROR"));
        assert!(!StatusCode::appears_in("01:02:03"));
        assert!(!StatusCode::appears_in(""));
    }

    #[test]
    fn local_error_has_no_wire_token() {
        assert_eq!(StatusCode::LocalParamError.token(), None);
        assert_eq!(StatusCode::LocalParamError.code(), 200);
        assert_eq!(StatusCode::LocalParamError.to_string(), "PARAM_ERROR");
        assert_eq!(StatusCode::NotJoined.to_string(), "AT_NO_NETWORK_JOINED");
    }
}
