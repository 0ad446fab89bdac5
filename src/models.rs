pub mod contest;
pub mod judgement;
pub mod language;
pub mod problem;
pub mod submission;
pub mod team;

pub use contest::Contest;
pub use judgement::{Judgement, JudgementType};
pub use language::Language;
pub use problem::Problem;
pub use submission::Submission;
pub use team::{Group, Organization, Team};

/// Everything read from the run log. Built once by the importer and never
/// mutated afterwards; collection order is document order.
#[derive(Clone, Debug)]
pub struct ContestModel {
    pub contest: Contest,
    pub judgement_types: Vec<JudgementType>,
    pub languages: Vec<Language>,
    pub groups: Vec<Group>,
    pub organizations: Vec<Organization>,
    pub teams: Vec<Team>,
    pub problems: Vec<Problem>,
    pub submissions: Vec<Submission>,
    pub judgements: Vec<Judgement>,
}
