use thiserror::Error;

/// Result type for amplifier operations
pub type Result<T> = std::result::Result<T, AmpError>;

/// Errors that can occur when talking to the amplifier
#[derive(Error, Debug)]
pub enum AmpError {
    /// Zone or value outside the range the amplifier accepts
    ///
    /// Always raised before anything is written to the serial link.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The serial link failed to open, write, read or answer in time
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A status reply did not match the fixed-width record layout
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error outside of a serial exchange (e.g. reading a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AmpError {
    /// True for failures of the physical link rather than of the caller's input
    pub fn is_transport(&self) -> bool {
        matches!(self, AmpError::Transport(_))
    }

    /// True when the amplifier answered with something that could not be decoded
    pub fn is_malformed(&self) -> bool {
        matches!(self, AmpError::MalformedFrame(_))
    }
}

/// Failures of a single open-write-read-close exchange on the serial link
#[derive(Error, Debug)]
pub enum TransportError {
    /// The serial port could not be opened
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Writing the frame failed
    #[error("write failed: {0}")]
    Write(std::io::Error),

    /// Reading the reply failed
    #[error("read failed: {0}")]
    Read(std::io::Error),

    /// The exchange did not complete within its time budget
    #[error("exchange timed out")]
    Timeout,

    /// A reply was expected but the amplifier sent nothing
    #[error("no response from amplifier")]
    NoResponse,

    /// The blocking worker running the exchange failed
    #[error("exchange worker failed: {0}")]
    Worker(String),
}
