//! Unified error types for the edge agent.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level startup and dispatch paths uniform.  Hardware I/O errors are
//! `Copy` so they can be passed out of worker threads without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level agent error
// ---------------------------------------------------------------------------

/// Every fallible operation in the agent funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Settings are missing or invalid (fatal at startup).
    Config(ConfigError),
    /// A sensor, output line or PWM channel could not be opened (fatal at startup).
    HardwareInit(HardwareInitError),
    /// A read or write failed after initialisation.
    HardwareIo(HardwareIoError),
    /// A remote-invocation payload could not be decoded.
    PayloadDecode(PayloadDecodeError),
    /// Interactive input could not be parsed.
    InputParse(InputParseError),
    /// The cloud transport failed.
    Comms(CommsError),
    /// Reading commands or writing the console failed.
    Console(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::HardwareInit(e) => write!(f, "hardware init: {e}"),
            Self::HardwareIo(e) => write!(f, "hardware I/O: {e}"),
            Self::PayloadDecode(e) => write!(f, "payload: {e}"),
            Self::InputParse(e) => write!(f, "input: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Console(e) => write!(f, "console: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Console(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings file could not be read.
    Read(String),
    /// The settings file is not valid JSON for the expected shape.
    Parse(String),
    /// A required field is empty or absent.
    MissingField(&'static str),
    /// A field failed range validation.
    Invalid { field: &'static str, reason: String },
    /// Relay and LED resolve to the same GPIO without `AllowSharedLine`.
    SharedLine(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(msg) => write!(f, "cannot read settings: {msg}"),
            Self::Parse(msg) => write!(f, "cannot parse settings: {msg}"),
            Self::MissingField(field) => write!(f, "missing required setting {field}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::SharedLine(pin) => write!(
                f,
                "relay and LED both bound to GPIO{pin}; set AllowSharedLine to permit it"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware initialisation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareInitError {
    /// A GPIO line could not be opened for output.
    GpioOpen { pin: u8, reason: String },
    /// The PWM channel could not be created.
    PwmOpen { chip: u8, channel: u8, reason: String },
    /// The climate sensor did not respond.
    Sensor(String),
}

impl fmt::Display for HardwareInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioOpen { pin, reason } => write!(f, "GPIO{pin} open failed: {reason}"),
            Self::PwmOpen {
                chip,
                channel,
                reason,
            } => write!(f, "PWM chip {chip} channel {channel} open failed: {reason}"),
            Self::Sensor(reason) => write!(f, "sensor init failed: {reason}"),
        }
    }
}

impl std::error::Error for HardwareInitError {}

impl From<HardwareInitError> for Error {
    fn from(e: HardwareInitError) -> Self {
        Self::HardwareInit(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware I/O errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareIoError {
    /// Writing a level to a GPIO line failed.
    GpioWriteFailed(u8),
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// The sensor bus returned an error or timed out.
    SensorReadFailed,
    /// Reading is outside the physically plausible range.
    SensorOutOfRange,
}

impl fmt::Display for HardwareIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed(pin) => write!(f, "GPIO{pin} write failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::SensorReadFailed => write!(f, "sensor read failed"),
            Self::SensorOutOfRange => write!(f, "sensor reading out of range"),
        }
    }
}

impl std::error::Error for HardwareIoError {}

impl From<HardwareIoError> for Error {
    fn from(e: HardwareIoError) -> Self {
        Self::HardwareIo(e)
    }
}

// ---------------------------------------------------------------------------
// Payload and input errors (recovered locally, never fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecodeError(pub String);

impl fmt::Display for PayloadDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed payload: {}", self.0)
    }
}

impl std::error::Error for PayloadDecodeError {}

impl From<PayloadDecodeError> for Error {
    fn from(e: PayloadDecodeError) -> Self {
        Self::PayloadDecode(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputParseError {
    /// The rejected input, trimmed.
    pub input: String,
    /// What was expected instead.
    pub expected: &'static str,
}

impl fmt::Display for InputParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not {}", self.input, self.expected)
    }
}

impl std::error::Error for InputParseError {}

impl From<InputParseError> for Error {
    fn from(e: InputParseError) -> Self {
        Self::InputParse(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommsError {
    /// Operation attempted before `open` or after `close`.
    NotConnected,
    /// The transport refused the connection.
    ConnectFailed(String),
    /// A direct method with this name is already registered.
    MethodAlreadyRegistered(String),
    /// The outbound message could not be encoded.
    EncodeFailed(String),
    /// The transport rejected the outbound message.
    SendFailed(String),
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "transport not connected"),
            Self::ConnectFailed(msg) => write!(f, "connect failed: {msg}"),
            Self::MethodAlreadyRegistered(name) => write!(f, "method {name} already registered"),
            Self::EncodeFailed(msg) => write!(f, "encode failed: {msg}"),
            Self::SendFailed(msg) => write!(f, "send failed: {msg}"),
        }
    }
}

impl std::error::Error for CommsError {}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Agent-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
