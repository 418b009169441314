// sitebackup/src/utils/duration.rs
use anyhow::{Context, Result};
use chrono::Duration;

/// Parses human retention strings like "1 day", "30 days" or "2 hours" into a
/// duration. Months and years use the fixed 30/365-day approximations.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let mut parts = input.split_whitespace();
    let count: i64 = parts
        .next()
        .context("duration is empty")?
        .parse()
        .with_context(|| format!("duration {input:?} does not start with a number"))?;
    let unit = parts
        .next()
        .with_context(|| format!("duration {input:?} is missing a unit"))?;
    if parts.next().is_some() {
        anyhow::bail!("duration {input:?} has trailing input");
    }
    if count < 0 {
        anyhow::bail!("duration {input:?} must not be negative");
    }

    let unit_seconds = match unit.strip_suffix('s').unwrap_or(unit) {
        "second" => 1,
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        "year" => 365 * 86_400,
        other => anyhow::bail!("unrecognized duration unit {other:?} in {input:?}"),
    };

    Ok(Duration::seconds(count * unit_seconds))
}
