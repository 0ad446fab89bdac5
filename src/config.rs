use chrono_tz::Tz;

/// How durations and contest-relative times are rendered in payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DurationFormat {
    /// CCS RELTIME, `h:mm:ss.sss`
    Reltime,
    /// ISO-8601 period, `PThHmMs.sssS`
    Iso8601,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Zone the run log's wall-clock `start_time` is expressed in
    pub timezone: Tz,
    /// Minutes added per rejected attempt, passed through to the contest descriptor
    pub penalty_time: i64,
    pub duration_format: DurationFormat,
    /// Append a final `state` event marking the contest as finalized
    pub finalize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: chrono_tz::Europe::Minsk,
            penalty_time: 20,
            duration_format: DurationFormat::Reltime,
            finalize: false,
        }
    }
}
