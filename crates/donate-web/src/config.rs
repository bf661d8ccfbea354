//! Build-time Configuration
//!
//! The browser has no environment; the same `DONATE_*` variables the native
//! runtime reads are captured at compile time.

use donate_core::{DonateConfig, Result};

/// Configuration baked into this build
pub fn web_config() -> Result<DonateConfig> {
    DonateConfig::from_lookup(compiled_setting)
}

fn compiled_setting(name: &str) -> Option<String> {
    let value = match name {
        "DONATE_BACKEND_URL" => option_env!("DONATE_BACKEND_URL"),
        "DONATE_PUBLISHABLE_KEY" => option_env!("DONATE_PUBLISHABLE_KEY"),
        "DONATE_CURRENCY" => option_env!("DONATE_CURRENCY"),
        "DONATE_AMOUNT_UNITS" => option_env!("DONATE_AMOUNT_UNITS"),
        "DONATE_REQUEST_TIMEOUT_SECS" => option_env!("DONATE_REQUEST_TIMEOUT_SECS"),
        _ => None,
    };
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
