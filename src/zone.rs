use crate::connection::Link;
use crate::error::{AmpError, Result, TransportError};
use crate::protocol::{self, Command};
use crate::types::{ZoneId, ZoneState};
use std::sync::{Arc, Mutex, PoisonError};

/// Controller for a single zone
///
/// A `ZoneController` sends commands for its zone and keeps the last status
/// the amplifier reported. It never edits that status itself: after a
/// command, call [`refresh`](Self::refresh) to read back what the amplifier
/// actually did.
#[derive(Clone)]
pub struct ZoneController {
    zone: ZoneId,
    link: Link,
    state: Arc<Mutex<Option<ZoneState>>>,
}

impl ZoneController {
    /// Create a controller with no known state
    pub fn new(zone: ZoneId, link: Link) -> Self {
        Self {
            zone,
            link,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the zone this controller drives
    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    /// Get the last successfully decoded state, if any
    pub fn state(&self) -> Option<ZoneState> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a command to this zone without waiting for a reply
    pub async fn apply(&self, command: Command) -> Result<()> {
        if command.zone() != self.zone {
            return Err(AmpError::InvalidArgument(format!(
                "command for zone {} sent to zone {} controller",
                command.zone(),
                self.zone
            )));
        }

        let frame = protocol::encode(&command)?;
        self.link.exchange(frame, false).await?;
        Ok(())
    }

    /// Query the amplifier and replace the held state with its answer
    ///
    /// On failure the previously held state is kept as it was.
    pub async fn refresh(&self) -> Result<ZoneState> {
        let frame = protocol::encode(&Command::QueryStatus { zone: self.zone })?;
        let reply = self.link.exchange(frame, true).await?;
        if reply.is_empty() {
            return Err(TransportError::NoResponse.into());
        }

        let state = protocol::decode_reply(&reply)?;
        if state.zone != self.zone {
            return Err(AmpError::MalformedFrame(format!(
                "queried zone {} but reply is for zone {}",
                self.zone, state.zone
            )));
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);
        Ok(state)
    }
}
