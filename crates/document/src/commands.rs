//! Commands sent to the document chip
//!
//! Both commands use the inter-industry class `00`. Layouts:
//!
//! - SELECT: `00 A4 00 0C 02 <group> <file>` (select by file identifier, no FCI returned)
//! - READ BINARY: `00 B0 <offset hi> <offset lo> <length>` (length `00` reads everything)

use idcheck_apdu_core::{Command, CommandError};

use crate::files::FileId;

/// Inter-industry class byte
pub const CLA: u8 = 0x00;

/// SELECT instruction
pub const INS_SELECT: u8 = 0xA4;

/// READ BINARY instruction
pub const INS_READ_BINARY: u8 = 0xB0;

/// SELECT P1: select by file identifier
const P1_SELECT_BY_FILE_ID: u8 = 0x00;

/// SELECT P2: first occurrence, no response data
const P2_NO_RESPONSE_DATA: u8 = 0x0C;

/// Highest offset expressible in P1-P2 when bit 8 of P1 is clear
pub const MAX_READ_OFFSET: u16 = 0x7FFF;

/// Build a SELECT command addressing `file`
pub fn select_file(file: FileId) -> Command {
    Command {
        cla: CLA,
        ins: INS_SELECT,
        p1: P1_SELECT_BY_FILE_ID,
        p2: P2_NO_RESPONSE_DATA,
        data: Some(file.to_bytes().to_vec().into()),
        le: None,
    }
}

/// Build a READ BINARY command for the currently selected file
///
/// `length == 0` asks the chip for everything available from `offset`.
pub fn read_binary(offset: u16, length: u8) -> Result<Command, CommandError> {
    if offset > MAX_READ_OFFSET {
        return Err(CommandError::InvalidData("READ BINARY offset above 0x7FFF"));
    }

    let [p1, p2] = offset.to_be_bytes();
    Ok(Command::new_with_le(CLA, INS_READ_BINARY, p1, p2, length))
}
