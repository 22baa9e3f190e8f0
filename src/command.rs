// Building AT command lines.
//
// A request is `AT<SUFFIX>` or `AT+<KEYWORD><SUFFIX><PARAM>`, written with a single
// trailing `\n`. The module misbehaves if `\r\n` is used. `encode` leaves the
// terminator off; the device handle adds it when writing.

/// Reboots the module. Unlike every other command it has no `+` and no suffix.
pub const RESET_COMMAND: &str = "ATZ";

/// The logical commands of the AT command set, each with its wire keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    AppEui,
    AppKey,
    AppSKey,
    DevAddr,
    DevEui,
    NetworkId,
    NwkSKey,
    ConfirmMode,
    ConfirmStatus,
    Join,
    JoinMode,
    JoinStatus,
    Receive,
    ReceiveHex,
    Send,
    SendHex,
    Adr,
    Class,
    DataRate,
    TxPower,
    Rssi,
    Snr,
    Version,
    LoraTx,
    LoraRx,
    LoraConfig,
    LoraOff,
    Save,
    AutoJoin,
}

impl Command {
    pub fn keyword(self) -> &'static str {
        match self {
            Command::AppEui => "APPEUI",
            Command::AppKey => "APPKEY",
            Command::AppSKey => "APPSKEY",
            Command::DevAddr => "DADDR",
            Command::DevEui => "DEUI",
            Command::NetworkId => "NWKID",
            Command::NwkSKey => "NWKSKEY",
            Command::ConfirmMode => "CFM",
            Command::ConfirmStatus => "CFS",
            Command::Join => "JOIN",
            Command::JoinMode => "NJM",
            Command::JoinStatus => "NJS",
            Command::Receive => "RECV",
            Command::ReceiveHex => "RECVB",
            Command::Send => "SEND",
            Command::SendHex => "SENDB",
            Command::Adr => "ADR",
            Command::Class => "CLASS",
            Command::DataRate => "DR",
            Command::TxPower => "TXP",
            Command::Rssi => "RSSI",
            Command::Snr => "SNR",
            Command::Version => "VER",
            Command::LoraTx => "TXLRA",
            Command::LoraRx => "RXLRA",
            Command::LoraConfig => "TCONF",
            Command::LoraOff => "TOFF",
            Command::Save => "SAVE",
            Command::AutoJoin => "AJOIN",
        }
    }
}

/// What to do with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Run,
    Get,
    Set,
    Help,
}

impl Action {
    pub fn suffix(self) -> &'static str {
        match self {
            Action::Run => "",
            Action::Get => "=?",
            Action::Set => "=",
            Action::Help => "?",
        }
    }
}

/// Build the command string for `command`, without the line terminator.
///
/// `None` addresses the module itself (`AT`, `AT?`). The parameter is appended verbatim;
/// nothing is escaped, so callers are responsible for not passing line breaks.
pub fn encode(command: Option<Command>, action: Action, parameter: &str) -> String {
    match command {
        None => format!("AT{}", action.suffix()),
        Some(command) => format!("AT+{}{}{}", command.keyword(), action.suffix(), parameter),
    }
}

/// The kinds of byte key the module accepts as colon-separated hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// 8-byte EUI (AppEUI).
    Eui,
    /// 16-byte AES key (AppKey, AppSKey, NwkSKey).
    Key,
    /// 4-byte device address.
    DevAddr,
}

impl KeyKind {
    pub fn byte_len(self) -> usize {
        match self {
            KeyKind::Eui => 8,
            KeyKind::Key => 16,
            KeyKind::DevAddr => 4,
        }
    }

    /// Length of the key as bare hex, e.g. 16 for an EUI.
    pub fn compact_len(self) -> usize {
        self.byte_len() * 2
    }

    /// Length of the key as `xx:xx:...`, e.g. 23 for an EUI.
    pub fn separated_len(self) -> usize {
        self.byte_len() * 3 - 1
    }
}

/// A key in the `xx:xx:...:xx` form the module expects on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormattedKey {
    kind: KeyKind,
    separated: String,
}

impl FormattedKey {
    /// Accept a key either already separated or as compact hex.
    ///
    /// Separated input of the right length is taken as-is. Compact input must be hex and
    /// gets a colon after every pair but the last; the original letter case is kept.
    /// Anything else is refused.
    pub fn normalize(kind: KeyKind, input: &str) -> Option<FormattedKey> {
        if input.contains(':') && input.len() == kind.separated_len() {
            return Some(FormattedKey {
                kind,
                separated: input.to_owned(),
            });
        }
        if input.len() != kind.compact_len() || hex::decode(input).is_err() {
            return None;
        }

        // hex::decode passed, so the input is pure ASCII and every index is a char boundary.
        let pairs: Vec<&str> = (0..input.len())
            .step_by(2)
            .map(|i| &input[i..i + 2])
            .collect();
        Some(FormattedKey {
            kind,
            separated: pairs.join(":"),
        })
    }

    /// Build a key from raw bytes, rendered as upper-case hex.
    pub fn from_bytes(kind: KeyKind, bytes: &[u8]) -> Option<FormattedKey> {
        if bytes.len() != kind.byte_len() {
            return None;
        }
        FormattedKey::normalize(kind, &hex::encode_upper(bytes))
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// The wire form, `xx:xx:...`.
    pub fn as_str(&self) -> &str {
        &self.separated
    }

    /// The key as bare hex.
    pub fn compact(&self) -> String {
        self.separated.chars().filter(|&c| c != ':').collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(self.compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_at_and_queries() {
        assert_eq!(encode(None, Action::Run, ""), "AT");
        assert_eq!(encode(None, Action::Help, ""), "AT?");
        assert_eq!(encode(Some(Command::AppEui), Action::Get, ""), "AT+APPEUI=?");
        assert_eq!(encode(Some(Command::DevEui), Action::Get, ""), "AT+DEUI=?");
        assert_eq!(encode(Some(Command::Join), Action::Run, ""), "AT+JOIN");
    }

    #[test]
    fn setters_append_parameter_verbatim() {
        assert_eq!(encode(Some(Command::JoinMode), Action::Set, "1"), "AT+NJM=1");
        assert_eq!(
            encode(Some(Command::Send), Action::Set, "2:Hello World"),
            "AT+SEND=2:Hello World"
        );
        assert_eq!(
            encode(Some(Command::LoraRx), Action::Set, "915200:0"),
            "AT+RXLRA=915200:0"
        );
    }

    #[test]
    fn compact_and_separated_keys_agree() {
        let compact = FormattedKey::normalize(KeyKind::Eui, "70B3D57ED0012345").unwrap();
        let separated =
            FormattedKey::normalize(KeyKind::Eui, "70:B3:D5:7E:D0:01:23:45").unwrap();
        assert_eq!(compact, separated);
        assert_eq!(compact.as_str(), "70:B3:D5:7E:D0:01:23:45");
        assert_eq!(compact.compact(), "70B3D57ED0012345");

        let key =
            FormattedKey::normalize(KeyKind::Key, "2B7E151628AED2A6ABF7158809CF4F3C").unwrap();
        let separated = FormattedKey::normalize(
            KeyKind::Key,
            "2B:7E:15:16:28:AE:D2:A6:AB:F7:15:88:09:CF:4F:3C",
        )
        .unwrap();
        assert_eq!(key, separated);
        assert_eq!(key.as_str().len(), 47);
        assert_eq!(separated.compact(), "2B7E151628AED2A6ABF7158809CF4F3C");

        let addr = FormattedKey::normalize(KeyKind::DevAddr, "26011bda").unwrap();
        assert_eq!(addr, FormattedKey::normalize(KeyKind::DevAddr, "26:01:1b:da").unwrap());
        assert_eq!(addr.as_str(), "26:01:1b:da");
        assert_eq!(addr.to_bytes().unwrap(), vec![0x26, 0x01, 0x1b, 0xda]);
    }

    #[test]
    fn keys_of_other_lengths_are_refused() {
        for kind in [KeyKind::Eui, KeyKind::Key, KeyKind::DevAddr].iter().copied() {
            for len in 0..60 {
                if len == kind.compact_len() || len == kind.separated_len() {
                    continue;
                }
                let input = "A".repeat(len);
                assert_eq!(FormattedKey::normalize(kind, &input), None, "{:?} {}", kind, len);
            }
        }
        assert_eq!(FormattedKey::normalize(KeyKind::DevAddr, "0102030G"), None);
        assert_eq!(FormattedKey::normalize(KeyKind::DevAddr, "01:02:03"), None);
    }

    #[test]
    fn keys_from_bytes() {
        let key = FormattedKey::from_bytes(KeyKind::Key, &[0xAB; 16]).unwrap();
        assert_eq!(key.as_str().len(), KeyKind::Key.separated_len());
        assert!(key.as_str().starts_with("AB:AB:"));
        assert_eq!(FormattedKey::from_bytes(KeyKind::Key, &[0; 8]), None);
    }
}
