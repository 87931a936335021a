//! APDU command definitions
//!
//! Only short APDUs are supported: a one byte Lc and a one byte Le, which is
//! all a passive document read ever needs.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Expected length type for APDU commands (short Le, `0` meaning "up to 256 bytes")
pub type ExpectedLength = u8;

/// Maximum length of the data field of a short APDU
pub const MAX_SHORT_DATA_LENGTH: usize = 255;

/// Error for APDU command construction and parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Command shorter than the four header bytes
    #[error("Invalid command length: {0}")]
    InvalidLength(usize),

    /// Data too long for a short APDU
    #[error("Data too long: {0} bytes (max {1})")]
    DataTooLong(usize, usize),

    /// Lc disagrees with the bytes that follow it
    #[error("Lc inconsistent with command body: Lc={lc}, body={body}")]
    InconsistentLc {
        /// Declared data length
        lc: usize,
        /// Bytes actually present after the header
        body: usize,
    },

    /// A command parameter is out of range
    #[error("Invalid command data: {0}")]
    InvalidData(&'static str),
}

/// Generic short APDU command
///
/// Commands are immutable once built: the builder methods consume `self`.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
    ) -> Result<Self, CommandError> {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Result<Self, CommandError> {
        let data = data.into();
        if data.len() > MAX_SHORT_DATA_LENGTH {
            return Err(CommandError::DataTooLong(data.len(), MAX_SHORT_DATA_LENGTH));
        }
        self.data = Some(data);
        Ok(self)
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Length of the serialised command
    pub fn command_length(&self) -> usize {
        4 + self.data.as_ref().map_or(0, |d| 1 + d.len()) + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            // with_data guarantees the length fits in one byte
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    ///
    /// Handles the four short APDU cases: header only, header + Le,
    /// header + Lc + data, header + Lc + data + Le.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CommandError> {
        if data.len() < 4 {
            return Err(CommandError::InvalidLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);
        let body = &data[4..];

        match body.len() {
            0 => {}
            1 => command.le = Some(body[0]),
            _ => {
                let lc = body[0] as usize;
                let rest = &body[1..];
                if rest.len() == lc {
                    command.data = Some(Bytes::copy_from_slice(rest));
                } else if rest.len() == lc + 1 {
                    command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                    command.le = Some(rest[lc]);
                } else {
                    return Err(CommandError::InconsistentLc {
                        lc,
                        body: rest.len(),
                    });
                }
            }
        }

        Ok(command)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("cla", &format_args!("{:#04x}", self.cla))
            .field("ins", &format_args!("{:#04x}", self.ins))
            .field("p1", &format_args!("{:#04x}", self.p1))
            .field("p2", &format_args!("{:#04x}", self.p2))
            .field("data", &self.data.as_ref().map(hex::encode_upper))
            .field("le", &self.le)
            .finish()
    }
}

impl From<&Command> for Bytes {
    fn from(command: &Command) -> Self {
        command.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_command_serialisation() {
        let cmd = Command::new_with_data(0x00, 0xA4, 0x00, 0x0C, vec![0x01, 0x02]).unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), &hex!("00A4000C020102"));
        assert_eq!(cmd.command_length(), 7);

        let cmd = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0x00);
        assert_eq!(cmd.to_bytes().as_ref(), &hex!("00B0000000"));

        let cmd = Command::new(0x80, 0xCA, 0x9F, 0x7F);
        assert_eq!(cmd.to_bytes().as_ref(), &hex!("80CA9F7F"));
    }

    #[test]
    fn test_command_from_bytes() {
        let cmd = Command::from_bytes(&hex!("00A4000C020102")).unwrap();
        assert_eq!(cmd.ins, 0xA4);
        assert_eq!(cmd.data.as_deref(), Some(&[0x01, 0x02][..]));
        assert_eq!(cmd.le, None);

        let cmd = Command::from_bytes(&hex!("00B0000000")).unwrap();
        assert_eq!(cmd.data, None);
        assert_eq!(cmd.le, Some(0));

        let cmd = Command::from_bytes(&hex!("00A4040002A0B100")).unwrap();
        assert_eq!(cmd.data.as_deref(), Some(&[0xA0, 0xB1][..]));
        assert_eq!(cmd.le, Some(0));

        assert_eq!(
            Command::from_bytes(&[0x00, 0xA4]),
            Err(CommandError::InvalidLength(2))
        );
        assert!(matches!(
            Command::from_bytes(&hex!("00A4000C0501")),
            Err(CommandError::InconsistentLc { lc: 5, body: 1 })
        ));
    }

    #[test]
    fn test_data_too_long() {
        let result = Command::new(0x00, 0xD6, 0x00, 0x00).with_data(vec![0u8; 256]);
        assert_eq!(result, Err(CommandError::DataTooLong(256, 255)));
    }
}
