// Turning the module's answer into a status and a typed payload.
//
// Every answer ends with a status token. Whatever precedes it is the payload region,
// which may also carry asynchronous event lines (`+EVT:...`) printed by the module
// while the command was running.

use crate::status::StatusCode;
use crate::{Error, Result};

/// What a command is expected to print before its status token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Nothing of interest; only the status matters.
    None,
    /// A decimal integer.
    Integer,
    /// Free text, such as a key or a version string.
    Text,
    /// `<port>:<message>`, as printed by `AT+RECV` and `AT+RECVB`.
    PortMessage,
    /// Join status, a single trailing `0` or `1` even when wrapped in longer text.
    JoinStatusBit,
}

/// A downlink message and the port it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMessage {
    pub port: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Integer(i32),
    Text(String),
    PortMessage(PortMessage),
}

/// A decoded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub payload: Option<Payload>,
}

impl Response {
    pub fn integer(&self) -> Option<i32> {
        match self.payload {
            Some(Payload::Integer(value)) => Some(value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self.payload {
            Some(Payload::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn into_port_message(self) -> Option<PortMessage> {
        match self.payload {
            Some(Payload::PortMessage(message)) => Some(message),
            _ => None,
        }
    }
}

/// Decode `raw` according to `shape`.
///
/// The last whitespace-delimited token must be a status token, otherwise the answer is
/// rejected with `Error::UnknownStatus`. An empty payload region means no payload for any
/// shape; a non-empty one that does not fit `shape` is `Error::MalformedPayload`.
pub fn parse(raw: &str, shape: Shape) -> Result<Response> {
    let token = raw
        .split_whitespace()
        .last()
        .ok_or_else(|| Error::UnknownStatus(raw.to_owned()))?;
    let status =
        StatusCode::from_token(token).ok_or_else(|| Error::UnknownStatus(raw.to_owned()))?;

    let trimmed = raw.trim_end();
    let region = trimmed[..trimmed.len() - token.len()].trim();
    if region.is_empty() {
        return Ok(Response {
            status,
            payload: None,
        });
    }

    let malformed = || Error::MalformedPayload {
        shape,
        payload: region.to_owned(),
    };
    let payload = match shape {
        Shape::None => None,
        Shape::Integer => Some(Payload::Integer(region.parse().map_err(|_| malformed())?)),
        Shape::Text => Some(Payload::Text(region.to_owned())),
        Shape::JoinStatusBit => match region.chars().last() {
            Some('0') => Some(Payload::Integer(0)),
            Some('1') => Some(Payload::Integer(1)),
            _ => return Err(malformed()),
        },
        Shape::PortMessage => Some(Payload::PortMessage(
            port_message(region).ok_or_else(malformed)?,
        )),
    };

    Ok(Response { status, payload })
}

/// Find `<port>:<message>` at the end of the payload region.
///
/// Event lines come first, so only the last line is considered. Within it the message
/// starts at the last token that begins with `<digits>:`, which lets a text message
/// contain spaces.
fn port_message(region: &str) -> Option<PortMessage> {
    let line = region.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;

    let start = line
        .split_whitespace()
        .filter(|token| {
            token.split_once(':').map_or(false, |(port, _)| {
                !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
            })
        })
        .last()
        .map(|token| token.as_ptr() as usize - line.as_ptr() as usize)?;

    let (port, message) = line[start..].split_once(':')?;
    Some(PortMessage {
        port: port.parse().ok()?,
        message: message.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_payload() {
        let response = parse("5 OK", Shape::Integer).unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.integer(), Some(5));

        let response = parse("\r\n-87\r\n\r\nOK\r\n", Shape::Integer).unwrap();
        assert_eq!(response.integer(), Some(-87));
    }

    #[test]
    fn bare_error_has_no_payload() {
        let response = parse("AT_ERROR", Shape::None).unwrap();
        assert_eq!(response.status, StatusCode::GenericError);
        assert_eq!(response.payload, None);

        let response = parse("\r\nAT_NO_NETWORK_JOINED\r\n", Shape::PortMessage).unwrap();
        assert_eq!(response.status, StatusCode::NotJoined);
        assert_eq!(response.payload, None);
    }

    #[test]
    fn empty_integer_is_absent() {
        let response = parse("OK", Shape::Integer).unwrap();
        assert_eq!(response.integer(), None);
    }

    #[test]
    fn text_payload_is_trimmed() {
        let response = parse("\r\n00:80:E1:15:00:0A:9B:C4\r\nOK\r\n", Shape::Text).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("00:80:E1:15:00:0A:9B:C4"));
    }

    #[test]
    fn port_message_with_spaces() {
        let response = parse("12:Hello World OK", Shape::PortMessage).unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            response.into_port_message(),
            Some(PortMessage {
                port: 12,
                message: "Hello World".to_owned()
            })
        );
    }

    #[test]
    fn port_message_after_event_lines() {
        let raw = "+EVT:RX_1, DR 0, RSSI -50, SNR 9\r\n+EVT:3:CAFE\r\n3:CAFE\r\nOK\r\n";
        let message = parse(raw, Shape::PortMessage).unwrap().into_port_message().unwrap();
        assert_eq!(message.port, 3);
        assert_eq!(message.message, "CAFE");

        let raw = "+EVT:JOINED 7:0102 OK";
        let message = parse(raw, Shape::PortMessage).unwrap().into_port_message().unwrap();
        assert_eq!(message.port, 7);
        assert_eq!(message.message, "0102");
    }

    #[test]
    fn port_message_needs_a_port() {
        match parse("Hello OK", Shape::PortMessage) {
            Err(Error::MalformedPayload { shape, payload }) => {
                assert_eq!(shape, Shape::PortMessage);
                assert_eq!(payload, "Hello");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("999:too big OK", Shape::PortMessage).is_err());
    }

    #[test]
    fn join_status_takes_the_last_digit() {
        let response = parse("NJS: 1\r\nOK", Shape::JoinStatusBit).unwrap();
        assert_eq!(response.integer(), Some(1));
        let response = parse("0 OK", Shape::JoinStatusBit).unwrap();
        assert_eq!(response.integer(), Some(0));
        assert!(parse("joined OK", Shape::JoinStatusBit).is_err());
    }

    #[test]
    fn unknown_status_is_fatal() {
        assert!(matches!(parse("", Shape::None), Err(Error::UnknownStatus(_))));
        assert!(matches!(parse("5 OKAY", Shape::Integer), Err(Error::UnknownStatus(_))));
        assert!(matches!(parse("OK 5", Shape::Integer), Err(Error::UnknownStatus(_))));
    }

    #[test]
    fn non_numeric_integer_is_malformed() {
        assert!(matches!(
            parse("five OK", Shape::Integer),
            Err(Error::MalformedPayload { .. })
        ));
    }

    #[test]
    fn payload_may_contain_the_status_text() {
        let message = parse("1:OK then OK", Shape::PortMessage)
            .unwrap()
            .into_port_message()
            .unwrap();
        assert_eq!(message.message, "OK then");
    }
}
