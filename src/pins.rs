//! Default GPIO / PWM assignments for the Raspberry Pi carrier board.
//!
//! Single source of truth for pin defaults: [`Settings`](crate::config::Settings)
//! falls back to these when a field is absent from `appsettings.json`.

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Relay coil driver (active HIGH).
pub const RELAY_GPIO: u8 = 21;
/// Indicator LED (active HIGH).
pub const LED_GPIO: u8 = 20;
/// Telemetry heartbeat LED, toggled once per sample.
pub const HEARTBEAT_GPIO: u8 = 17;

// ---------------------------------------------------------------------------
// PWM LED
// ---------------------------------------------------------------------------

/// Hardware PWM0 is routed to GPIO 18 once `dtoverlay=pwm-2chan` is enabled.
pub const PWM_GPIO: u8 = 18;
pub const PWM_CHIP: u8 = 0;
pub const PWM_CHANNEL: u8 = 0;
/// Carrier frequency for the PWM LED.
pub const PWM_FREQ_HZ: u32 = 500;

// ---------------------------------------------------------------------------
// Ramp profile (per-mille of full duty)
// ---------------------------------------------------------------------------

pub const PWM_FLOOR_PERMILLE: u16 = 100;
pub const PWM_CEILING_PERMILLE: u16 = 900;
pub const PWM_RAMP_STEPS: u16 = 10;
pub const PWM_STEP_DELAY_MS: u64 = 100;

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Default send interval when `SendInterval` is not configured.
pub const SEND_INTERVAL_MS: u32 = 1_000;
