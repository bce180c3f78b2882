//! Duration parsing for Go-style duration strings.
//!
//! Accepts `s`, `m` and `h` components, alone or chained (`90s`, `5m`,
//! `1h30m`). The result must be a whole, non-zero number of seconds.

use anyhow::{Context, Result, bail};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// # Examples
///
/// ```text
/// "300s"   -> 300s
/// "5m"     -> 300s
/// "1h30m"  -> 5400s
/// "10"     -> error, missing unit
/// "0s"     -> error, zero
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - The string is empty or a component has no unit
/// - A unit other than `h`, `m` or `s` is used
/// - The total overflows or is zero
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let duration_str = duration_str.trim();
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    let mut rest = duration_str;
    let mut seconds: u64 = 0;

    while !rest.is_empty() {
        // Find where digits end and unit begins
        let split_pos = rest
            .find(|c: char| !c.is_ascii_digit())
            .context("Duration must end with a unit (h, m, or s)")?;
        let (value_str, tail) = rest.split_at(split_pos);

        let value: u64 = value_str
            .parse()
            .with_context(|| format!("Invalid duration '{duration_str}': expected a number before the unit"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let multiplier = match unit {
            "h" => SECONDS_PER_HOUR,
            "m" => SECONDS_PER_MINUTE,
            "s" => 1,
            _ => bail!("Unsupported duration unit '{unit}'. Use 'h' (hours), 'm' (minutes), or 's' (seconds)"),
        };

        seconds = value
            .checked_mul(multiplier)
            .and_then(|s| seconds.checked_add(s))
            .context("Duration value too large (overflow)")?;
        rest = next;
    }

    if seconds == 0 {
        bail!("Duration '{duration_str}' must be at least 1s");
    }

    Ok(Duration::from_secs(seconds))
}
