use chrono::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JudgementType {
    pub id: String,
    pub name: String,
    pub penalty: bool,
    pub solved: bool,
}

impl JudgementType {
    pub fn new(id: &str, name: &str, penalty: bool, solved: bool) -> Self {
        JudgementType {
            id: id.into(),
            name: name.into(),
            penalty,
            solved,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Judgement {
    pub id: String,
    pub submission_id: String,
    pub judgement_type_id: String,
    /// Offset from the contest start
    pub time: Duration,
}
