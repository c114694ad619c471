//! Wire format of the amplifier's RS-232 protocol
//!
//! Commands are short ASCII frames such as `<12VO20\r\n` (zone 2, volume 20).
//! A status query `?12\n\r` is answered with a fixed-width record:
//!
//! ```text
//! #>  1  2  00  01  00  00  20  07  07  10  03  01
//! ^   ^  ^  ^   ^   ^   ^   ^   ^   ^   ^   ^   ^
//! |   |  |  PA  pwr mute DND vol treb bass bal src keypad
//! |   |  zone
//! |   unit
//! marker
//! ```
//!
//! Everything in this module is pure; I/O lives in [`crate::connection`].

use crate::error::{AmpError, Result};
use crate::types::{ZoneId, ZoneState, MAX_BALANCE, MAX_TONE, MAX_VOLUME, SOURCE_COUNT};

/// Length of the marker preceding every status record
pub const STATUS_MARKER_LEN: usize = 2;

/// Total width of a status record, marker included
pub const STATUS_RECORD_LEN: usize = STATUS_MARKER_LEN + 22;

const STATUS_MARKER: &str = "#>";

// Signed values travel shifted into an unsigned range.
const TONE_OFFSET: i8 = MAX_TONE;
const BALANCE_OFFSET: i8 = MAX_BALANCE;

/// A control or query command addressed to one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPower { zone: ZoneId, on: bool },
    SetMute { zone: ZoneId, on: bool },
    /// Clamped to `0..=38` on encode
    SetVolume { zone: ZoneId, volume: i32 },
    /// Must be within `1..=6`; encode fails otherwise
    SetSource { zone: ZoneId, source: i32 },
    /// Clamped to `-7..=7` on encode
    SetBass { zone: ZoneId, bass: i32 },
    /// Clamped to `-7..=7` on encode
    SetTreble { zone: ZoneId, treble: i32 },
    QueryStatus { zone: ZoneId },
}

impl Command {
    /// The zone this command is addressed to
    pub fn zone(&self) -> ZoneId {
        match *self {
            Command::SetPower { zone, .. }
            | Command::SetMute { zone, .. }
            | Command::SetVolume { zone, .. }
            | Command::SetSource { zone, .. }
            | Command::SetBass { zone, .. }
            | Command::SetTreble { zone, .. }
            | Command::QueryStatus { zone } => zone,
        }
    }

    /// Whether the amplifier answers this command
    pub fn expects_reply(&self) -> bool {
        matches!(self, Command::QueryStatus { .. })
    }
}

/// Encode a command into its wire frame
///
/// Volume, bass and treble are clamped silently. The source selector has no
/// hardware clamp, so an out-of-range source is rejected instead.
pub fn encode(command: &Command) -> Result<Vec<u8>> {
    let frame = match *command {
        Command::SetPower { zone, on } => format!("<1{}PR0{}\r\n", zone, u8::from(on)),
        Command::SetMute { zone, on } => format!("<1{}MU0{}\r\n", zone, u8::from(on)),
        Command::SetVolume { zone, volume } => {
            format!("<1{}VO{:02}\r\n", zone, volume.clamp(0, i32::from(MAX_VOLUME)))
        }
        Command::SetSource { zone, source } => {
            validate_source(source)?;
            format!("<1{}CH0{}\r\n", zone, source)
        }
        Command::SetBass { zone, bass } => format!("<1{}BS{:02}\r\n", zone, tone_to_wire(bass)),
        Command::SetTreble { zone, treble } => {
            format!("<1{}TR{:02}\r\n", zone, tone_to_wire(treble))
        }
        Command::QueryStatus { zone } => format!("?1{}\n\r", zone),
    };

    Ok(frame.into_bytes())
}

/// Check a source number without encoding anything
pub fn validate_source(source: i32) -> Result<()> {
    if (1..=i32::from(SOURCE_COUNT)).contains(&source) {
        Ok(())
    } else {
        Err(AmpError::InvalidArgument(format!(
            "source must be between 1 and {}, got {}",
            SOURCE_COUNT, source
        )))
    }
}

fn tone_to_wire(value: i32) -> i32 {
    let max = i32::from(MAX_TONE);
    value.clamp(-max, max) + i32::from(TONE_OFFSET)
}

/// Decode one fixed-width status record
///
/// `record` starts at the two-byte marker. Bytes past the record width are
/// ignored.
pub fn decode_status(record: &[u8]) -> Result<ZoneState> {
    if record.len() < STATUS_RECORD_LEN {
        return Err(AmpError::MalformedFrame(format!(
            "status record is {} bytes, expected {}",
            record.len(),
            STATUS_RECORD_LEN
        )));
    }

    let mut fields = Fields::new(&record[STATUS_MARKER_LEN..STATUS_RECORD_LEN]);

    let unit = fields.number("unit", 1, 9)?;
    let zone = fields.number("zone", 1, 9)?;
    let zone = ZoneId::new(zone)
        .map_err(|_| AmpError::MalformedFrame(format!("zone {} out of range", zone)))?;
    let pa_control = fields.flag("PA")?;
    let power = fields.flag("power")?;
    let mute = fields.flag("mute")?;
    let do_not_disturb = fields.flag("do-not-disturb")?;
    let volume = fields.number("volume", 2, MAX_VOLUME)?;
    let treble = fields.offset("treble", MAX_TONE, TONE_OFFSET)?;
    let bass = fields.offset("bass", MAX_TONE, TONE_OFFSET)?;
    let balance = fields.offset("balance", MAX_BALANCE, BALANCE_OFFSET)?;
    let source = fields.number("source", 2, SOURCE_COUNT)?;
    if source == 0 {
        return Err(AmpError::MalformedFrame("source 0 out of range".to_string()));
    }
    let keypad_connected = fields.flag("keypad")?;

    Ok(ZoneState {
        zone,
        unit,
        power,
        pa_control,
        mute,
        do_not_disturb,
        volume,
        treble,
        bass,
        balance,
        source,
        keypad_connected,
    })
}

/// Find and decode the status record in a raw query reply
///
/// The amplifier echoes the query line before answering, and may append a
/// prompt. Echo lines (starting with `?`) and short lines are skipped.
pub fn decode_reply(raw: &[u8]) -> Result<ZoneState> {
    let record = raw
        .split(|b| *b == b'\r' || *b == b'\n')
        .filter(|line| !line.starts_with(b"?"))
        .find(|line| line.len() >= STATUS_RECORD_LEN)
        .ok_or_else(|| {
            AmpError::MalformedFrame(format!(
                "no status record in reply {:?}",
                String::from_utf8_lossy(raw)
            ))
        })?;

    decode_status(record)
}

/// Encode a zone state as the amplifier would report it, terminator included
pub fn encode_status(state: &ZoneState) -> Vec<u8> {
    format!(
        "{}{}{}{:02}{:02}{:02}{:02}{:02}{:02}{:02}{:02}{:02}{:02}\r\n",
        STATUS_MARKER,
        state.unit,
        state.zone,
        u8::from(state.pa_control),
        u8::from(state.power),
        u8::from(state.mute),
        u8::from(state.do_not_disturb),
        state.volume,
        state.treble + TONE_OFFSET,
        state.bass + TONE_OFFSET,
        state.balance + BALANCE_OFFSET,
        state.source,
        u8::from(state.keypad_connected),
    )
    .into_bytes()
}

/// Parse a command frame back into a [`Command`]
///
/// This is the amplifier's side of [`encode`]. Values are taken as sent, so a
/// frame produced by `encode` always parses back to an in-range command.
pub fn decode_command(frame: &[u8]) -> Result<Command> {
    let text = std::str::from_utf8(frame)
        .map_err(|_| AmpError::MalformedFrame("command frame is not ASCII".to_string()))?
        .trim_end_matches(['\r', '\n']);
    let malformed = || AmpError::MalformedFrame(format!("unrecognised command {:?}", text));

    if let Some(rest) = text.strip_prefix("?1") {
        let zone = single_digit(rest).ok_or_else(malformed)?;
        return Ok(Command::QueryStatus { zone: ZoneId::new(zone).map_err(|_| malformed())? });
    }

    let rest = text.strip_prefix("<1").ok_or_else(malformed)?;
    if rest.len() != 5 || !rest.is_ascii() {
        return Err(malformed());
    }
    let zone = single_digit(&rest[0..1]).ok_or_else(malformed)?;
    let zone = ZoneId::new(zone).map_err(|_| malformed())?;
    let code = &rest[1..3];
    let value = two_digits(&rest[3..5]).ok_or_else(malformed)?;
    let tone = i32::from(value) - i32::from(TONE_OFFSET);

    let command = match code {
        "PR" if value <= 1 => Command::SetPower { zone, on: value == 1 },
        "MU" if value <= 1 => Command::SetMute { zone, on: value == 1 },
        "VO" => Command::SetVolume { zone, volume: i32::from(value) },
        "CH" => Command::SetSource { zone, source: i32::from(value) },
        "BS" => Command::SetBass { zone, bass: tone },
        "TR" => Command::SetTreble { zone, treble: tone },
        _ => return Err(malformed()),
    };

    Ok(command)
}

fn single_digit(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [d] if d.is_ascii_digit() => Some(d - b'0'),
        _ => None,
    }
}

fn two_digits(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some((a - b'0') * 10 + (b - b'0')),
        _ => None,
    }
}

/// Sequential reader over the fixed-width fields of a status record
struct Fields<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(body: &'a [u8]) -> Self {
        Self { body, pos: 0 }
    }

    /// Read a `width`-digit decimal field no greater than `max`
    fn number(&mut self, name: &str, width: usize, max: u8) -> Result<u8> {
        let raw = &self.body[self.pos..self.pos + width];
        self.pos += width;

        if !raw.iter().all(u8::is_ascii_digit) {
            return Err(AmpError::MalformedFrame(format!(
                "{} field {:?} is not numeric",
                name,
                String::from_utf8_lossy(raw)
            )));
        }

        let value = raw.iter().fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));
        if value > u32::from(max) {
            return Err(AmpError::MalformedFrame(format!(
                "{} {} out of range (max {})",
                name, value, max
            )));
        }

        // value <= max <= u8::MAX
        Ok(value as u8)
    }

    /// Read a two-digit boolean field: `00` or `01`
    fn flag(&mut self, name: &str) -> Result<bool> {
        match self.number(name, 2, 99)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(AmpError::MalformedFrame(format!(
                "{} flag must be 00 or 01, got {:02}",
                name, other
            ))),
        }
    }

    /// Read a two-digit field stored shifted by `offset`, range `-max..=max`
    fn offset(&mut self, name: &str, max: i8, offset: i8) -> Result<i8> {
        let raw = self.number(name, 2, max.unsigned_abs() * 2)?;
        // raw <= 2 * max, so it fits in i8
        Ok(raw as i8 - offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    fn frame(command: Command) -> String {
        String::from_utf8(encode(&command).unwrap()).unwrap()
    }

    #[test]
    fn encodes_command_templates() {
        assert_eq!(frame(Command::SetPower { zone: zone(1), on: true }), "<11PR01\r\n");
        assert_eq!(frame(Command::SetPower { zone: zone(4), on: false }), "<14PR00\r\n");
        assert_eq!(frame(Command::SetMute { zone: zone(2), on: true }), "<12MU01\r\n");
        assert_eq!(frame(Command::SetVolume { zone: zone(3), volume: 7 }), "<13VO07\r\n");
        assert_eq!(frame(Command::SetSource { zone: zone(6), source: 4 }), "<16CH04\r\n");
        assert_eq!(frame(Command::SetBass { zone: zone(5), bass: -7 }), "<15BS00\r\n");
        assert_eq!(frame(Command::SetTreble { zone: zone(5), treble: 3 }), "<15TR10\r\n");
        assert_eq!(frame(Command::QueryStatus { zone: zone(2) }), "?12\n\r");
    }

    #[test]
    fn volume_is_clamped() {
        let z = zone(1);
        assert_eq!(
            frame(Command::SetVolume { zone: z, volume: 50 }),
            frame(Command::SetVolume { zone: z, volume: 38 })
        );
        assert_eq!(
            frame(Command::SetVolume { zone: z, volume: -5 }),
            frame(Command::SetVolume { zone: z, volume: 0 })
        );
    }

    #[test]
    fn tone_is_clamped_and_offset() {
        let z = zone(1);
        assert_eq!(frame(Command::SetBass { zone: z, bass: 0 }), "<11BS07\r\n");
        assert_eq!(frame(Command::SetBass { zone: z, bass: 20 }), "<11BS14\r\n");
        assert_eq!(frame(Command::SetTreble { zone: z, treble: -100 }), "<11TR00\r\n");
    }

    #[test]
    fn source_is_validated_strictly() {
        let z = zone(1);
        for bad in [0, 7, -1] {
            let result = encode(&Command::SetSource { zone: z, source: bad });
            assert!(matches!(result, Err(AmpError::InvalidArgument(_))), "source {}", bad);
        }
        assert_eq!(frame(Command::SetSource { zone: z, source: 1 }), "<11CH01\r\n");
        assert_eq!(frame(Command::SetSource { zone: z, source: 6 }), "<11CH06\r\n");
    }

    #[test]
    fn decodes_status_record() {
        let state = decode_status(b"#>1500010000200710100601").unwrap();
        assert_eq!(
            state,
            ZoneState {
                zone: zone(5),
                unit: 1,
                power: true,
                pa_control: false,
                mute: false,
                do_not_disturb: false,
                volume: 20,
                treble: 0,
                bass: 3,
                balance: 0,
                source: 6,
                keypad_connected: true,
            }
        );
    }

    #[test]
    fn treble_offset_law() {
        let treble_of = |field: &str| {
            let record = format!("#>110001000010{}07100100", field);
            decode_status(record.as_bytes()).unwrap().treble
        };
        assert_eq!(treble_of("07"), 0);
        assert_eq!(treble_of("00"), -7);
        assert_eq!(treble_of("14"), 7);
    }

    #[test]
    fn balance_is_unshifted_by_ten() {
        let state = decode_status(b"#>1100010000100707000100").unwrap();
        assert_eq!(state.balance, -10);
        let state = decode_status(b"#>1100010000100707200100").unwrap();
        assert_eq!(state.balance, 10);
    }

    #[test]
    fn rejects_short_record() {
        let err = decode_status(b"#>11000100001007071001").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = decode_status(b"#>11000100001X0707100100").unwrap_err();
        assert!(err.is_malformed());
        // sign characters are not digits either
        let err = decode_status(b"#>110001000010+707100100").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn rejects_bad_flag_and_out_of_range_values() {
        // power "02"
        assert!(decode_status(b"#>1100020000100707100100").unwrap_err().is_malformed());
        // volume 39
        assert!(decode_status(b"#>1100010000390707100100").unwrap_err().is_malformed());
        // treble 15
        assert!(decode_status(b"#>1100010000101507100100").unwrap_err().is_malformed());
        // balance 21
        assert!(decode_status(b"#>1100010000100707210100").unwrap_err().is_malformed());
        // source 0 and 7
        assert!(decode_status(b"#>1100010000100707100000").unwrap_err().is_malformed());
        assert!(decode_status(b"#>1100010000100707100700").unwrap_err().is_malformed());
        // zone 7
        assert!(decode_status(b"#>1700010000100707100100").unwrap_err().is_malformed());
    }

    #[test]
    fn status_round_trip() {
        let states = [
            ZoneState::idle(zone(1)),
            ZoneState {
                zone: zone(6),
                unit: 2,
                power: true,
                pa_control: true,
                mute: true,
                do_not_disturb: true,
                volume: 38,
                treble: -7,
                bass: 7,
                balance: -10,
                source: 6,
                keypad_connected: true,
            },
        ];
        for state in states {
            assert_eq!(decode_status(&encode_status(&state)).unwrap(), state);
        }
    }

    #[test]
    fn reply_skips_echo_and_prompt() {
        let reply = b"?15\r\r\n#>1500010000200710100601\r\r\n#";
        let state = decode_reply(reply).unwrap();
        assert_eq!(state.zone, zone(5));
        assert_eq!(state.volume, 20);
        assert_eq!(state.source, 6);
    }

    #[test]
    fn reply_without_record_is_malformed() {
        assert!(decode_reply(b"?15\r\r\n#").unwrap_err().is_malformed());
        assert!(decode_reply(b"#>15000100").unwrap_err().is_malformed());
    }

    #[test]
    fn command_frames_parse_back() {
        let commands = [
            Command::SetPower { zone: zone(3), on: true },
            Command::SetMute { zone: zone(1), on: false },
            Command::SetVolume { zone: zone(2), volume: 38 },
            Command::SetSource { zone: zone(4), source: 2 },
            Command::SetBass { zone: zone(5), bass: -3 },
            Command::SetTreble { zone: zone(6), treble: 7 },
            Command::QueryStatus { zone: zone(6) },
        ];
        for command in commands {
            let frame = encode(&command).unwrap();
            assert_eq!(decode_command(&frame).unwrap(), command);
        }
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(decode_command(b"<11XX01\r\n").unwrap_err().is_malformed());
        assert!(decode_command(b"<11PR02\r\n").unwrap_err().is_malformed());
        assert!(decode_command(b"<17PR01\r\n").unwrap_err().is_malformed());
        assert!(decode_command(b"hello").unwrap_err().is_malformed());
    }
}
