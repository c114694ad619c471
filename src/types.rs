use crate::error::{AmpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of zones on the amplifier
pub const ZONE_COUNT: u8 = 6;

/// Highest volume step the amplifier accepts
pub const MAX_VOLUME: u8 = 38;

/// Tone (bass/treble) range in steps either side of flat
pub const MAX_TONE: i8 = 7;

/// Balance range in steps either side of centre
pub const MAX_BALANCE: i8 = 10;

/// Number of selectable input sources
pub const SOURCE_COUNT: u8 = 6;

/// Zone identifier, always within `1..=6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ZoneId(u8);

impl ZoneId {
    /// Validate a raw zone number
    pub fn new(zone: u8) -> Result<Self> {
        if (1..=ZONE_COUNT).contains(&zone) {
            Ok(Self(zone))
        } else {
            Err(AmpError::InvalidArgument(format!(
                "zone must be between 1 and {}, got {}",
                ZONE_COUNT, zone
            )))
        }
    }

    /// All zones in query order
    pub fn all() -> impl Iterator<Item = ZoneId> {
        (1..=ZONE_COUNT).map(ZoneId)
    }

    /// The zone number
    pub fn get(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for ZoneId {
    type Error = AmpError;

    fn try_from(zone: u8) -> Result<Self> {
        Self::new(zone)
    }
}

/// Decoded status of one zone
///
/// Every numeric field is guaranteed to be in range: the decoder rejects
/// records that are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub zone: ZoneId,

    /// Amplifier unit number as reported on the wire
    pub unit: u8,

    pub power: bool,

    /// Public address override active
    pub pa_control: bool,

    pub mute: bool,

    pub do_not_disturb: bool,

    /// Volume step, 0..=38
    pub volume: u8,

    /// Treble, -7..=7
    pub treble: i8,

    /// Bass, -7..=7
    pub bass: i8,

    /// Balance, -10 (left) ..= 10 (right)
    pub balance: i8,

    /// Selected input, 1..=6
    pub source: u8,

    pub keypad_connected: bool,
}

impl ZoneState {
    /// A powered-off zone on unit 1 with every control at its neutral value
    pub fn idle(zone: ZoneId) -> Self {
        Self {
            zone,
            unit: 1,
            power: false,
            pa_control: false,
            mute: false,
            do_not_disturb: false,
            volume: 0,
            treble: 0,
            bass: 0,
            balance: 0,
            source: 1,
            keypad_connected: false,
        }
    }
}

/// Partial zone update, as accepted by a `PUT` on a zone resource
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treble: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
}

impl ZoneUpdate {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_id_bounds() {
        assert!(ZoneId::new(0).is_err());
        assert_eq!(ZoneId::new(1).unwrap().get(), 1);
        assert_eq!(ZoneId::new(6).unwrap().get(), 6);
        assert!(matches!(ZoneId::new(7), Err(AmpError::InvalidArgument(_))));
    }

    #[test]
    fn zones_iterate_in_order() {
        let zones: Vec<u8> = ZoneId::all().map(ZoneId::get).collect();
        assert_eq!(zones, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn zone_state_serializes_camel_case() {
        let state = ZoneState {
            pa_control: true,
            keypad_connected: true,
            ..ZoneState::idle(ZoneId::new(4).unwrap())
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["zone"], 4);
        assert_eq!(json["paControl"], true);
        assert_eq!(json["doNotDisturb"], false);
        assert_eq!(json["keypadConnected"], true);
        assert_eq!(json["treble"], 0);
    }

    #[test]
    fn zone_update_accepts_partial_body() {
        let update: ZoneUpdate = serde_json::from_str(r#"{"volume": 12, "mute": true}"#).unwrap();
        assert_eq!(update.volume, Some(12));
        assert_eq!(update.mute, Some(true));
        assert_eq!(update.power, None);
        assert!(!update.is_empty());
        assert!(ZoneUpdate::default().is_empty());
    }
}
