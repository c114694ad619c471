use crate::config::AmpConfig;
use crate::connection::{Link, Transport};
use crate::error::{AmpError, Result};
use crate::protocol::{self, Command};
use crate::serial::SerialTransport;
use crate::types::{ZoneId, ZoneState, ZoneUpdate};
use crate::zone::ZoneController;

/// Client for a six-zone amplifier
///
/// The `Amplifier` owns one [`ZoneController`] per zone, all sharing a single
/// serialized [`Link`]. It is cheap to clone; construct it once at startup
/// and hand clones to whatever serves requests.
#[derive(Clone)]
pub struct Amplifier {
    zones: Vec<ZoneController>,
}

/// A zone left out of a status sweep, and why
#[derive(Debug)]
pub struct ZoneFailure {
    pub zone: ZoneId,
    pub error: AmpError,
}

/// Result of refreshing every zone
#[derive(Debug, Default)]
pub struct StatusReport {
    /// States of the zones that answered, in zone order
    pub zones: Vec<ZoneState>,

    /// Zones that did not answer or answered with garbage
    pub failures: Vec<ZoneFailure>,
}

impl Amplifier {
    /// Build an amplifier client over any transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_link(Link::new(transport))
    }

    /// Build an amplifier client over an existing link
    pub fn with_link(link: Link) -> Self {
        let zones = ZoneId::all()
            .map(|zone| ZoneController::new(zone, link.clone()))
            .collect();
        Self { zones }
    }

    /// Build an amplifier client on the serial port named in `config`
    ///
    /// Nothing is opened yet; each exchange opens and closes the port.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use zone_amp::{AmpConfig, Amplifier};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let amp = Amplifier::open(&AmpConfig::new("/dev/ttyUSB0"))?;
    ///     amp.set_power(1, true).await?;
    ///     amp.set_volume(1, 20).await?;
    ///     for zone in amp.status_snapshot().await {
    ///         println!("zone {}: volume {}", zone.zone, zone.volume);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &AmpConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("Using amplifier on {} at {} baud", config.port, config.baud_rate);
        Ok(Self::new(SerialTransport::new(config)))
    }

    /// Get the controller for a zone
    pub fn zone(&self, zone: u8) -> Result<&ZoneController> {
        let zone = ZoneId::new(zone)?;
        Ok(&self.zones[zone.index()])
    }

    /// All zone controllers, in zone order
    pub fn zones(&self) -> &[ZoneController] {
        &self.zones
    }

    /// Refresh every zone, in order, and report which ones failed
    pub async fn status_report(&self) -> StatusReport {
        let mut report = StatusReport::default();

        // One link: zones must be queried one after another.
        for controller in &self.zones {
            match controller.refresh().await {
                Ok(state) => report.zones.push(state),
                Err(error) => {
                    tracing::warn!("Zone {} left out of status: {}", controller.zone(), error);
                    report.failures.push(ZoneFailure {
                        zone: controller.zone(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Refresh every zone and return the states of those that answered
    ///
    /// A zone that fails is omitted rather than failing the whole snapshot.
    pub async fn status_snapshot(&self) -> Vec<ZoneState> {
        self.status_report().await.zones
    }

    /// States from the last refresh of each zone, without touching the link
    pub fn last_snapshot(&self) -> Vec<ZoneState> {
        self.zones.iter().filter_map(ZoneController::state).collect()
    }

    /// Last known state of one zone
    ///
    /// `Ok(None)` means the zone is valid but has never answered a query.
    pub fn zone_state(&self, zone: u8) -> Result<Option<ZoneState>> {
        Ok(self.zone(zone)?.state())
    }

    // ========== Zone Control ==========

    /// Turn a zone on or off
    pub async fn set_power(&self, zone: u8, on: bool) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetPower { zone, on }).await
    }

    /// Mute or unmute a zone
    pub async fn set_mute(&self, zone: u8, on: bool) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetMute { zone, on }).await
    }

    /// Set a zone's volume; clamped to `0..=38`
    pub async fn set_volume(&self, zone: u8, volume: i32) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetVolume { zone, volume }).await
    }

    /// Select a zone's input; fails unless `source` is within `1..=6`
    pub async fn set_source(&self, zone: u8, source: i32) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetSource { zone, source }).await
    }

    /// Set a zone's bass; clamped to `-7..=7`
    pub async fn set_bass(&self, zone: u8, bass: i32) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetBass { zone, bass }).await
    }

    /// Set a zone's treble; clamped to `-7..=7`
    pub async fn set_treble(&self, zone: u8, treble: i32) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        self.send(Command::SetTreble { zone, treble }).await
    }

    /// Apply every field present in `update` to one zone
    ///
    /// The zone and source are validated before anything is sent, so an
    /// invalid update leaves the amplifier untouched. Fields are sent in the
    /// order power, volume, source, bass, treble, mute; the first failure
    /// stops the rest.
    pub async fn apply_update(&self, zone: u8, update: &ZoneUpdate) -> Result<()> {
        let zone = ZoneId::new(zone)?;
        if let Some(source) = update.source {
            protocol::validate_source(source)?;
        }

        let commands = [
            update.power.map(|on| Command::SetPower { zone, on }),
            update.volume.map(|volume| Command::SetVolume { zone, volume }),
            update.source.map(|source| Command::SetSource { zone, source }),
            update.bass.map(|bass| Command::SetBass { zone, bass }),
            update.treble.map(|treble| Command::SetTreble { zone, treble }),
            update.mute.map(|on| Command::SetMute { zone, on }),
        ];

        for command in commands.into_iter().flatten() {
            self.send(command).await?;
        }

        Ok(())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.zones[command.zone().index()].apply(command).await
    }
}
