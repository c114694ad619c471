//! In-process stand-in for the amplifier
//!
//! [`SimulatedAmplifier`] answers frames the way the hardware does: commands
//! are applied silently, status queries are echoed and answered with a
//! status record. Faults can be injected per zone to exercise error paths
//! without a serial port.

use crate::connection::Transport;
use crate::error::{Result, TransportError};
use crate::protocol::{self, Command};
use crate::types::{ZoneId, ZoneState, MAX_TONE, MAX_VOLUME, SOURCE_COUNT, ZONE_COUNT};
use std::sync::{Arc, Mutex, PoisonError};

/// Misbehaviour a simulated zone can be told to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Status queries get no answer at all
    Silent,
    /// Status queries get a record with non-numeric fields
    Garbled,
}

struct SimState {
    zones: Vec<ZoneState>,
    faults: Vec<Option<Fault>>,
    received: Vec<Vec<u8>>,
    rejected: usize,
}

/// Simulated six-zone amplifier
///
/// Clones share the same state, so a test can keep one handle for
/// inspection while another is owned by a [`Link`](crate::Link).
#[derive(Clone)]
pub struct SimulatedAmplifier {
    inner: Arc<Mutex<SimState>>,
}

impl Default for SimulatedAmplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAmplifier {
    /// All zones powered off, flat tone, source 1, keypads connected
    pub fn new() -> Self {
        let zones = ZoneId::all()
            .map(|zone| ZoneState {
                keypad_connected: true,
                ..ZoneState::idle(zone)
            })
            .collect();

        Self {
            inner: Arc::new(Mutex::new(SimState {
                zones,
                faults: vec![None; usize::from(ZONE_COUNT)],
                received: Vec::new(),
                rejected: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the simulated state of a zone
    pub fn zone(&self, zone: ZoneId) -> ZoneState {
        self.lock().zones[zone.index()]
    }

    /// Overwrite the simulated state of a zone
    pub fn set_zone(&self, state: ZoneState) {
        self.lock().zones[state.zone.index()] = state;
    }

    /// Make a zone misbehave on status queries
    pub fn inject_fault(&self, zone: ZoneId, fault: Fault) {
        self.lock().faults[zone.index()] = Some(fault);
    }

    pub fn clear_fault(&self, zone: ZoneId) {
        self.lock().faults[zone.index()] = None;
    }

    /// Every frame received so far, in order
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.lock().received.clone()
    }

    /// Number of frames that did not parse as a complete command
    pub fn rejected(&self) -> usize {
        self.lock().rejected
    }

    /// Process one frame and return the reply, if the command has one
    pub fn process(&self, frame: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut sim = self.lock();
        sim.received.push(frame.to_vec());

        let command = match protocol::decode_command(frame) {
            Ok(command) => command,
            Err(e) => {
                sim.rejected += 1;
                return Err(e);
            }
        };

        let zone = command.zone();
        let state = &mut sim.zones[zone.index()];
        match command {
            Command::SetPower { on, .. } => state.power = on,
            Command::SetMute { on, .. } => state.mute = on,
            Command::SetVolume { volume, .. } => {
                state.volume = volume.clamp(0, i32::from(MAX_VOLUME)) as u8
            }
            Command::SetSource { source, .. } => {
                // the selector ignores positions it does not have
                if (1..=i32::from(SOURCE_COUNT)).contains(&source) {
                    state.source = source as u8;
                }
            }
            Command::SetBass { bass, .. } => state.bass = clamp_tone(bass),
            Command::SetTreble { treble, .. } => state.treble = clamp_tone(treble),
            Command::QueryStatus { .. } => {
                let state = *state;
                return Ok(sim.faults[zone.index()].map_or_else(
                    || Some(status_reply(&state)),
                    |fault| match fault {
                        Fault::Silent => None,
                        Fault::Garbled => Some(garbled_reply(zone)),
                    },
                ));
            }
        }

        Ok(None)
    }
}

impl Transport for SimulatedAmplifier {
    fn exchange(
        &mut self,
        frame: &[u8],
        expect_response: bool,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        // The hardware stays silent on frames it cannot parse.
        let reply = self.process(frame).ok().flatten().unwrap_or_default();
        if expect_response {
            Ok(reply)
        } else {
            Ok(Vec::new())
        }
    }
}

fn clamp_tone(value: i32) -> i8 {
    let max = i32::from(MAX_TONE);
    value.clamp(-max, max) as i8
}

/// Echo line, status record, prompt
fn status_reply(state: &ZoneState) -> Vec<u8> {
    let mut reply = format!("?1{}\r\r\n", state.zone).into_bytes();
    reply.extend_from_slice(&protocol::encode_status(state));
    reply.push(b'#');
    reply
}

fn garbled_reply(zone: ZoneId) -> Vec<u8> {
    format!("?1{}\r\r\n#>1{}0001??00200707100100\r\r\n#", zone, zone).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmpError;

    fn zone(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    #[test]
    fn applies_commands_silently() {
        let amp = SimulatedAmplifier::new();
        assert_eq!(amp.process(b"<12PR01\r\n").unwrap(), None);
        assert_eq!(amp.process(b"<12VO15\r\n").unwrap(), None);
        assert_eq!(amp.process(b"<12BS00\r\n").unwrap(), None);
        let state = amp.zone(zone(2));
        assert!(state.power);
        assert_eq!(state.volume, 15);
        assert_eq!(state.bass, -7);
    }

    #[test]
    fn answers_queries_with_echo_and_record() {
        let amp = SimulatedAmplifier::new();
        amp.process(b"<16CH03\r\n").unwrap();
        let reply = amp.process(b"?16\n\r").unwrap().unwrap();
        assert!(reply.starts_with(b"?16\r"));
        let state = protocol::decode_reply(&reply).unwrap();
        assert_eq!(state.zone, zone(6));
        assert_eq!(state.source, 3);
    }

    #[test]
    fn ignores_out_of_range_source() {
        let amp = SimulatedAmplifier::new();
        amp.process(b"<11CH09\r\n").unwrap();
        assert_eq!(amp.zone(zone(1)).source, 1);
    }

    #[test]
    fn counts_rejected_frames() {
        let amp = SimulatedAmplifier::new();
        assert!(matches!(amp.process(b"<11P"), Err(AmpError::MalformedFrame(_))));
        assert_eq!(amp.rejected(), 1);
        assert_eq!(amp.received().len(), 1);
    }

    #[test]
    fn injected_faults() {
        let amp = SimulatedAmplifier::new();
        amp.inject_fault(zone(3), Fault::Garbled);
        amp.inject_fault(zone(4), Fault::Silent);

        let reply = amp.process(b"?13\n\r").unwrap().unwrap();
        assert!(protocol::decode_reply(&reply).unwrap_err().is_malformed());
        assert_eq!(amp.process(b"?14\n\r").unwrap(), None);

        amp.clear_fault(zone(4));
        assert!(amp.process(b"?14\n\r").unwrap().is_some());
    }
}
