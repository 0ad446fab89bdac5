use chrono::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub id: String,
    pub team_id: String,
    pub problem_id: String,
    pub language_id: String,
    /// Offset from the contest start
    pub time: Duration,
    pub file: Option<String>,
}
