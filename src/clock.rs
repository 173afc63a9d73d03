use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};

use crate::config::ClockSettings;

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

pub fn offset(settings: &ClockSettings) -> Result<FixedOffset> {
    FixedOffset::east_opt(settings.utc_offset_hours * 3600)
        .ok_or_else(|| anyhow!("utc offset out of range: {}h", settings.utc_offset_hours))
}

/// Current time in the configured zone, formatted for the first column.
pub fn now_timestamp(settings: &ClockSettings) -> Result<String> {
    let now = Utc::now().with_timezone(&offset(settings)?);
    Ok(format_timestamp(&now, settings.round_to_hour))
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>, round_to_hour: bool) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let at = if round_to_hour {
        at.with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(|| at.clone())
    } else {
        at.clone()
    };
    at.format(TIMESTAMP_FORMAT).to_string()
}
