use chrono::prelude::*;
use chrono::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Contest {
    pub id: String,
    pub name: String,
    pub start_instant: DateTime<FixedOffset>,
    pub duration: Duration,
    pub freeze_duration: Option<Duration>,
}

impl Contest {
    pub fn end_instant(&self) -> DateTime<FixedOffset> {
        self.start_instant + self.duration
    }

    /// Instant after which outcomes are hidden: `start + duration - freeze`.
    pub fn scoreboard_freeze_instant(&self) -> Option<DateTime<FixedOffset>> {
        self.freeze_duration
            .map(|freeze_duration| self.end_instant() - freeze_duration)
    }

    pub fn instant_at(&self, contest_time: Duration) -> DateTime<FixedOffset> {
        self.start_instant + contest_time
    }
}
