//! Agent settings.
//!
//! Loaded once at startup from the `Settings` section of `appsettings.json`,
//! then overridden field-by-field from `EDGE_AGENT_*` environment variables.
//! Not hot-reloaded.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::drivers::pwm_ramp::RampProfile;
use crate::error::ConfigError;
use crate::pins;

/// Longest PWM step delay accepted.  The remote `ControlPWM` handler blocks
/// for up to one step while the ramp winds down.
pub const MAX_STEP_DELAY_MS: u64 = 1_000;

/// Prefix for environment overrides, e.g. `EDGE_AGENT_SEND_INTERVAL_MS`.
pub const ENV_PREFIX: &str = "EDGE_AGENT_";

/// Top-level shape of `appsettings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "Settings")]
    pub settings: Settings,
}

/// Core agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    // --- Cloud ---
    /// Device connection string (`HostName=...;DeviceId=...;SharedAccessKey=...`).
    pub connection_string: String,
    /// Device id stamped on every telemetry record.
    pub device_id: String,

    // --- Telemetry ---
    /// Delay between telemetry samples (milliseconds).
    #[serde(rename = "SendInterval")]
    pub send_interval_ms: u32,

    // --- GPIO ---
    /// Relay output line.
    pub gpio_pin: u8,
    /// LED output line.  `None` shares the relay line.
    #[serde(default)]
    pub led_pin: Option<u8>,
    /// Permit relay and LED on the same physical line.
    #[serde(default)]
    pub allow_shared_line: bool,
    #[serde(default = "default_heartbeat_pin")]
    pub heartbeat_pin: u8,

    // --- PWM LED ---
    pub pwm_pin: u8,
    #[serde(default = "default_pwm_chip")]
    pub pwm_chip: u8,
    #[serde(default = "default_pwm_channel")]
    pub pwm_channel: u8,
    #[serde(default = "default_pwm_frequency")]
    pub pwm_frequency_hz: u32,
    #[serde(default = "default_pwm_floor")]
    pub pwm_floor_permille: u16,
    #[serde(default = "default_pwm_ceiling")]
    pub pwm_ceiling_permille: u16,
    #[serde(default = "default_pwm_steps")]
    pub pwm_steps: u16,
    #[serde(default = "default_pwm_step_delay")]
    pub pwm_step_delay_ms: u64,
}

fn default_heartbeat_pin() -> u8 {
    pins::HEARTBEAT_GPIO
}
fn default_pwm_chip() -> u8 {
    pins::PWM_CHIP
}
fn default_pwm_channel() -> u8 {
    pins::PWM_CHANNEL
}
fn default_pwm_frequency() -> u32 {
    pins::PWM_FREQ_HZ
}
fn default_pwm_floor() -> u16 {
    pins::PWM_FLOOR_PERMILLE
}
fn default_pwm_ceiling() -> u16 {
    pins::PWM_CEILING_PERMILLE
}
fn default_pwm_steps() -> u16 {
    pins::PWM_RAMP_STEPS
}
fn default_pwm_step_delay() -> u64 {
    pins::PWM_STEP_DELAY_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection_string: "HostName=localhost;DeviceId=edge-agent".into(),
            device_id: "edge-agent".into(),
            send_interval_ms: pins::SEND_INTERVAL_MS,
            gpio_pin: pins::RELAY_GPIO,
            led_pin: Some(pins::LED_GPIO),
            allow_shared_line: false,
            heartbeat_pin: pins::HEARTBEAT_GPIO,
            pwm_pin: pins::PWM_GPIO,
            pwm_chip: pins::PWM_CHIP,
            pwm_channel: pins::PWM_CHANNEL,
            pwm_frequency_hz: pins::PWM_FREQ_HZ,
            pwm_floor_permille: pins::PWM_FLOOR_PERMILLE,
            pwm_ceiling_permille: pins::PWM_CEILING_PERMILLE,
            pwm_steps: pins::PWM_RAMP_STEPS,
            pwm_step_delay_ms: pins::PWM_STEP_DELAY_MS,
        }
    }
}

impl Settings {
    /// Read, override from the process environment, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        let mut settings = Self::from_json_str(&text)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse an `appsettings.json` document (no validation).
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<AppSettings>(text)
            .map(|doc| doc.settings)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `EDGE_AGENT_<FIELD>` overrides using `lookup` as the environment.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("CONNECTION_STRING") {
            self.connection_string = v;
        }
        if let Some(v) = var("DEVICE_ID") {
            self.device_id = v;
        }
        if let Some(v) = var("SEND_INTERVAL_MS") {
            self.send_interval_ms = parse_override("SendInterval", &v)?;
        }
        if let Some(v) = var("GPIO_PIN") {
            self.gpio_pin = parse_override("GpioPin", &v)?;
        }
        if let Some(v) = var("LED_PIN") {
            self.led_pin = Some(parse_override("LedPin", &v)?);
        }
        if let Some(v) = var("HEARTBEAT_PIN") {
            self.heartbeat_pin = parse_override("HeartbeatPin", &v)?;
        }
        if let Some(v) = var("PWM_PIN") {
            self.pwm_pin = parse_override("PwmPin", &v)?;
        }
        if let Some(v) = var("ALLOW_SHARED_LINE") {
            self.allow_shared_line = parse_override("AllowSharedLine", &v)?;
        }
        if let Some(v) = var("PWM_CHIP") {
            self.pwm_chip = parse_override("PwmChip", &v)?;
        }
        if let Some(v) = var("PWM_CHANNEL") {
            self.pwm_channel = parse_override("PwmChannel", &v)?;
        }
        if let Some(v) = var("PWM_FREQUENCY_HZ") {
            self.pwm_frequency_hz = parse_override("PwmFrequencyHz", &v)?;
        }
        if let Some(v) = var("PWM_FLOOR_PERMILLE") {
            self.pwm_floor_permille = parse_override("PwmFloorPermille", &v)?;
        }
        if let Some(v) = var("PWM_CEILING_PERMILLE") {
            self.pwm_ceiling_permille = parse_override("PwmCeilingPermille", &v)?;
        }
        if let Some(v) = var("PWM_STEPS") {
            self.pwm_steps = parse_override("PwmSteps", &v)?;
        }
        if let Some(v) = var("PWM_STEP_DELAY_MS") {
            self.pwm_step_delay_ms = parse_override("PwmStepDelayMs", &v)?;
        }
        Ok(())
    }

    /// Range and consistency checks.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_string.trim().is_empty() {
            return Err(ConfigError::MissingField("ConnectionString"));
        }
        let conn = ConnectionString::parse(&self.connection_string)?;
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::MissingField("DeviceId"));
        }
        if conn.device_id() != self.device_id {
            warn!(
                "DeviceId '{}' differs from connection string device '{}'",
                self.device_id,
                conn.device_id()
            );
        }

        if self.send_interval_ms == 0 {
            return Err(invalid("SendInterval", "must be greater than zero"));
        }

        if self.pwm_floor_permille >= self.pwm_ceiling_permille {
            return Err(invalid("PwmFloorPermille", "must be below PwmCeilingPermille"));
        }
        if self.pwm_ceiling_permille > 1000 {
            return Err(invalid("PwmCeilingPermille", "must not exceed 1000"));
        }
        if self.pwm_steps < 2 {
            return Err(invalid("PwmSteps", "needs at least two steps"));
        }
        if self.pwm_step_delay_ms == 0 || self.pwm_step_delay_ms > MAX_STEP_DELAY_MS {
            return Err(invalid(
                "PwmStepDelayMs",
                &format!("must be within 1..={MAX_STEP_DELAY_MS}"),
            ));
        }
        if self.pwm_frequency_hz == 0 {
            return Err(invalid("PwmFrequencyHz", "must be greater than zero"));
        }

        let led = self.led_gpio();
        if led == self.gpio_pin && !self.allow_shared_line {
            return Err(ConfigError::SharedLine(led));
        }
        for (field, pin) in [("HeartbeatPin", self.heartbeat_pin), ("PwmPin", self.pwm_pin)] {
            if pin == self.gpio_pin || pin == led {
                return Err(invalid(field, &format!("GPIO{pin} already used by relay/LED")));
            }
        }
        if self.heartbeat_pin == self.pwm_pin {
            return Err(invalid("HeartbeatPin", "collides with PwmPin"));
        }
        Ok(())
    }

    /// Resolved LED line (falls back to the relay line).
    pub fn led_gpio(&self) -> u8 {
        self.led_pin.unwrap_or(self.gpio_pin)
    }

    /// Whether relay and LED are wired to the same line.
    pub fn shares_relay_line(&self) -> bool {
        self.led_gpio() == self.gpio_pin
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_interval_ms))
    }

    pub fn ramp_profile(&self) -> RampProfile {
        RampProfile {
            floor_permille: self.pwm_floor_permille,
            ceiling_permille: self.pwm_ceiling_permille,
            steps: self.pwm_steps,
            step_delay: Duration::from_millis(self.pwm_step_delay_ms),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn parse_override<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(field, &format!("'{raw}' from environment is not a valid value")))
}

// ───────────────────────────────────────────────────────────────
// Connection string
// ───────────────────────────────────────────────────────────────

/// Parsed `Key=Value;Key=Value` device connection string.
///
/// `Debug` redacts the shared access key.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    host_name: String,
    device_id: String,
    shared_access_key: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut host_name = None;
        let mut device_id = None;
        let mut shared_access_key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                return Err(invalid("ConnectionString", &format!("segment '{part}' has no '='")));
            };
            match key.trim() {
                "HostName" => host_name = Some(value.trim().to_string()),
                "DeviceId" => device_id = Some(value.trim().to_string()),
                // Base64 keys end in '=', so keep the remainder verbatim.
                "SharedAccessKey" => shared_access_key = Some(value.to_string()),
                _ => {}
            }
        }

        let host_name = host_name
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("ConnectionString", "HostName is missing"))?;
        let device_id = device_id
            .filter(|d| !d.is_empty())
            .ok_or_else(|| invalid("ConnectionString", "DeviceId is missing"))?;

        Ok(Self {
            host_name,
            device_id,
            shared_access_key,
        })
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn has_key(&self) -> bool {
        self.shared_access_key.is_some()
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("device_id", &self.device_id)
            .field(
                "shared_access_key",
                &self.shared_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
