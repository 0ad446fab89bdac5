use crate::config::DurationFormat;
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};

pub fn format_duration(duration: Duration, format: DurationFormat) -> String {
    let total_ms = duration.num_milliseconds();
    let sign = if total_ms < 0 { "-" } else { "" };
    let total_ms = total_ms.abs();

    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let seconds = total_ms / 1_000 % 60;
    let millis = total_ms % 1_000;

    match format {
        DurationFormat::Reltime => format!(
            "{}{}:{:02}:{:02}.{:03}",
            sign, hours, minutes, seconds, millis
        ),
        DurationFormat::Iso8601 => format!(
            "{}PT{}H{}M{}.{:03}S",
            sign, hours, minutes, seconds, millis
        ),
    }
}

/// RFC 3339 with millisecond precision, keeping the instant's own offset.
pub fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, false)
}
