//! Fuzz target: `Settings::from_json_str`
//!
//! A settings file that parses must either validate or be rejected with a
//! `ConfigError`; neither step may panic.
//!
//! cargo fuzz run fuzz_settings

#![no_main]

use edge_agent::config::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(settings) = Settings::from_json_str(text) {
        let _ = settings.validate();
        let _ = settings.ramp_profile();
    }
});
