use chrono::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
    pub id: String,
    pub label: String,
    pub name: String,
    pub ordinal: u32,
    pub time_limit: Option<Duration>,
    /// Either a CSS color name or an `#rrggbb` value
    pub color: Option<String>,
}
