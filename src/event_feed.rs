use crate::config::Config;
use crate::models::{Contest, ContestModel, Judgement, Problem, Submission};
use crate::time_format::{format_duration, format_instant};
use log::{debug, info, trace};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Token of the first event in a feed; later events count up from here.
pub const FIRST_TOKEN: u64 = 1;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Contests,
    JudgementTypes,
    Languages,
    Groups,
    Organizations,
    Teams,
    Problems,
    Submissions,
    Judgements,
    State,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Contests => "contests",
            EventType::JudgementTypes => "judgement-types",
            EventType::Languages => "languages",
            EventType::Groups => "groups",
            EventType::Organizations => "organizations",
            EventType::Teams => "teams",
            EventType::Problems => "problems",
            EventType::Submissions => "submissions",
            EventType::Judgements => "judgements",
            EventType::State => "state",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ContestPayload {
    pub id: String,
    pub name: String,
    pub formal_name: String,
    pub start_time: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoreboard_freeze_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoreboard_freeze_time: Option<String>,
    pub penalty_time: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JudgementTypePayload {
    pub id: String,
    pub name: String,
    pub penalty: bool,
    pub solved: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LanguagePayload {
    pub id: String,
    pub name: String,
    pub entry_point_required: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupPayload {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OrganizationPayload {
    pub id: String,
    pub name: String,
    pub formal_name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamPayload {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub group_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProblemPayload {
    pub id: String,
    pub label: String,
    pub name: String,
    pub ordinal: u32,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub href: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub id: String,
    pub team_id: String,
    pub problem_id: String,
    pub language_id: String,
    pub time: String,
    pub contest_time: String,
    pub files: Vec<FileRef>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JudgementPayload {
    pub id: String,
    pub submission_id: String,
    pub judgement_type_id: String,
    pub start_time: String,
    pub start_contest_time: String,
    pub end_time: String,
    pub end_contest_time: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatePayload {
    pub started: String,
    pub ended: String,
    pub finalized: String,
    pub end_of_updates: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Contest(ContestPayload),
    JudgementType(JudgementTypePayload),
    Language(LanguagePayload),
    Group(GroupPayload),
    Organization(OrganizationPayload),
    Team(TeamPayload),
    Problem(ProblemPayload),
    Submission(SubmissionPayload),
    Judgement(JudgementPayload),
    State(StatePayload),
}

/// One line of `event-feed.ndjson`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Id of the entity the event is about; `None` for the singleton state
    pub id: Option<String>,
    pub op: Operation,
    pub data: Payload,
    pub token: String,
}

/// Everything the package writer needs: the static metadata files and the
/// ordered feed.
#[derive(Debug, Clone)]
pub struct Package {
    pub contest: ContestPayload,
    pub judgement_types: Vec<JudgementTypePayload>,
    pub languages: Vec<LanguagePayload>,
    pub groups: Vec<GroupPayload>,
    pub organizations: Vec<OrganizationPayload>,
    pub teams: Vec<TeamPayload>,
    pub problems: Vec<ProblemPayload>,
    pub events: Vec<Event>,
}

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("duplicate {kind} id {id:?}")]
    DuplicateId { kind: EventType, id: String },
    #[error("{kind} {id:?} references {target} {target_id:?}, which is not in the feed before it")]
    DanglingReference {
        kind: EventType,
        id: String,
        target: EventType,
        target_id: String,
    },
    #[error("judgement {id:?} is judged before submission {submission_id:?}")]
    JudgementBeforeSubmission { id: String, submission_id: String },
}

/// Appends events and remembers which ids each event type has introduced,
/// so every reference can be checked against what a consumer has already
/// seen.
struct FeedBuilder {
    events: Vec<Event>,
    seen: HashMap<EventType, HashSet<String>>,
}

impl FeedBuilder {
    fn new() -> Self {
        FeedBuilder {
            events: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn push(&mut self, kind: EventType, id: Option<String>, op: Operation, data: Payload) {
        let token = (FIRST_TOKEN + self.events.len() as u64).to_string();
        trace!("Event {} {} {:?}", token, kind, id);
        self.events.push(Event {
            kind,
            id,
            op,
            data,
            token,
        });
    }

    fn create(&mut self, kind: EventType, id: &str, data: Payload) -> Result<(), IntegrityError> {
        if !self.seen.entry(kind).or_default().insert(id.into()) {
            return Err(IntegrityError::DuplicateId {
                kind,
                id: id.into(),
            });
        }
        self.push(kind, Some(id.into()), Operation::Create, data);
        Ok(())
    }

    fn require(
        &self,
        kind: EventType,
        id: &str,
        target: EventType,
        target_id: &str,
    ) -> Result<(), IntegrityError> {
        let seen = self
            .seen
            .get(&target)
            .map_or(false, |ids| ids.contains(target_id));
        if !seen {
            return Err(IntegrityError::DanglingReference {
                kind,
                id: id.into(),
                target,
                target_id: target_id.into(),
            });
        }
        Ok(())
    }
}

pub fn describe_contest(contest: &Contest, config: &Config) -> ContestPayload {
    let format = config.duration_format;
    ContestPayload {
        id: contest.id.clone(),
        name: contest.name.clone(),
        formal_name: contest.name.clone(),
        start_time: format_instant(&contest.start_instant),
        duration: format_duration(contest.duration, format),
        scoreboard_freeze_duration: contest
            .freeze_duration
            .map(|freeze_duration| format_duration(freeze_duration, format)),
        scoreboard_freeze_time: contest
            .scoreboard_freeze_instant()
            .map(|instant| format_instant(&instant)),
        penalty_time: config.penalty_time,
    }
}

fn describe_problem(problem: &Problem) -> ProblemPayload {
    let (color, rgb) = match &problem.color {
        Some(color) if color.starts_with('#') => (None, Some(color.clone())),
        Some(color) => (Some(color.clone()), None),
        None => (None, None),
    };
    ProblemPayload {
        id: problem.id.clone(),
        label: problem.label.clone(),
        name: problem.name.clone(),
        ordinal: problem.ordinal,
        time_limit: problem
            .time_limit
            .map(|time_limit| time_limit.num_milliseconds() as f64 / 1000.0),
        color,
        rgb,
    }
}

fn describe_submission(
    submission: &Submission,
    contest: &Contest,
    config: &Config,
) -> SubmissionPayload {
    SubmissionPayload {
        id: submission.id.clone(),
        team_id: submission.team_id.clone(),
        problem_id: submission.problem_id.clone(),
        language_id: submission.language_id.clone(),
        time: format_instant(&contest.instant_at(submission.time)),
        contest_time: format_duration(submission.time, config.duration_format),
        files: submission
            .file
            .iter()
            .map(|href| FileRef { href: href.clone() })
            .collect(),
    }
}

fn describe_judgement(judgement: &Judgement, contest: &Contest, config: &Config) -> JudgementPayload {
    let time = format_instant(&contest.instant_at(judgement.time));
    let contest_time = format_duration(judgement.time, config.duration_format);
    JudgementPayload {
        id: judgement.id.clone(),
        submission_id: judgement.submission_id.clone(),
        judgement_type_id: judgement.judgement_type_id.clone(),
        start_time: time.clone(),
        start_contest_time: contest_time.clone(),
        end_time: time,
        end_contest_time: contest_time,
    }
}

/// Turns the contest model into the package contents. Events come out
/// grouped by type in dependency order (contest, judgement types, languages,
/// groups, organizations, teams, problems, submissions, judgements), so a
/// consumer reading the feed in order never meets an id it hasn't seen.
/// Submissions and judgements are each ordered by time, ties keeping
/// document order.
pub fn derive(model: &ContestModel, config: &Config) -> Result<Package, IntegrityError> {
    let contest = &model.contest;
    let mut feed = FeedBuilder::new();

    let contest_payload = describe_contest(contest, config);
    feed.create(
        EventType::Contests,
        &contest.id,
        Payload::Contest(contest_payload.clone()),
    )?;

    let judgement_types: Vec<_> = model
        .judgement_types
        .iter()
        .map(|judgement_type| JudgementTypePayload {
            id: judgement_type.id.clone(),
            name: judgement_type.name.clone(),
            penalty: judgement_type.penalty,
            solved: judgement_type.solved,
        })
        .collect();
    for payload in &judgement_types {
        feed.create(
            EventType::JudgementTypes,
            &payload.id,
            Payload::JudgementType(payload.clone()),
        )?;
    }

    let languages: Vec<_> = model
        .languages
        .iter()
        .map(|language| LanguagePayload {
            id: language.id.clone(),
            name: language.name.clone(),
            entry_point_required: false,
        })
        .collect();
    for payload in &languages {
        feed.create(
            EventType::Languages,
            &payload.id,
            Payload::Language(payload.clone()),
        )?;
    }

    let groups: Vec<_> = model
        .groups
        .iter()
        .map(|group| GroupPayload {
            id: group.id.clone(),
            name: group.name.clone(),
        })
        .collect();
    for payload in &groups {
        feed.create(EventType::Groups, &payload.id, Payload::Group(payload.clone()))?;
    }

    let mut organizations = Vec::with_capacity(model.organizations.len());
    for organization in &model.organizations {
        if let Some(group_id) = &organization.group_id {
            feed.require(
                EventType::Organizations,
                &organization.id,
                EventType::Groups,
                group_id,
            )?;
        }
        let payload = OrganizationPayload {
            id: organization.id.clone(),
            name: organization.name.clone(),
            formal_name: organization.name.clone(),
        };
        feed.create(
            EventType::Organizations,
            &payload.id,
            Payload::Organization(payload.clone()),
        )?;
        organizations.push(payload);
    }

    let mut teams = Vec::with_capacity(model.teams.len());
    for team in &model.teams {
        if let Some(organization_id) = &team.organization_id {
            feed.require(
                EventType::Teams,
                &team.id,
                EventType::Organizations,
                organization_id,
            )?;
        }
        for group_id in &team.group_ids {
            feed.require(EventType::Teams, &team.id, EventType::Groups, group_id)?;
        }
        let payload = TeamPayload {
            id: team.id.clone(),
            name: team.name.clone(),
            organization_id: team.organization_id.clone(),
            group_ids: team.group_ids.clone(),
        };
        feed.create(EventType::Teams, &payload.id, Payload::Team(payload.clone()))?;
        teams.push(payload);
    }

    let problems: Vec<_> = model.problems.iter().map(describe_problem).collect();
    for payload in &problems {
        feed.create(
            EventType::Problems,
            &payload.id,
            Payload::Problem(payload.clone()),
        )?;
    }

    let mut submissions: Vec<&Submission> = model.submissions.iter().collect();
    submissions.sort_by_key(|submission| submission.time);
    let mut submitted_at = HashMap::with_capacity(submissions.len());
    for submission in submissions {
        feed.require(
            EventType::Submissions,
            &submission.id,
            EventType::Teams,
            &submission.team_id,
        )?;
        feed.require(
            EventType::Submissions,
            &submission.id,
            EventType::Problems,
            &submission.problem_id,
        )?;
        feed.require(
            EventType::Submissions,
            &submission.id,
            EventType::Languages,
            &submission.language_id,
        )?;
        feed.create(
            EventType::Submissions,
            &submission.id,
            Payload::Submission(describe_submission(submission, contest, config)),
        )?;
        submitted_at.insert(submission.id.as_str(), submission.time);
    }

    let mut judgements: Vec<&Judgement> = model.judgements.iter().collect();
    judgements.sort_by_key(|judgement| judgement.time);
    for judgement in judgements {
        feed.require(
            EventType::Judgements,
            &judgement.id,
            EventType::Submissions,
            &judgement.submission_id,
        )?;
        feed.require(
            EventType::Judgements,
            &judgement.id,
            EventType::JudgementTypes,
            &judgement.judgement_type_id,
        )?;
        let judged_too_early = submitted_at
            .get(judgement.submission_id.as_str())
            .map_or(false, |submitted| judgement.time < *submitted);
        if judged_too_early {
            return Err(IntegrityError::JudgementBeforeSubmission {
                id: judgement.id.clone(),
                submission_id: judgement.submission_id.clone(),
            });
        }
        feed.create(
            EventType::Judgements,
            &judgement.id,
            Payload::Judgement(describe_judgement(judgement, contest, config)),
        )?;
    }

    if config.finalize {
        let end = format_instant(&contest.end_instant());
        debug!("Finalizing contest at {}", end);
        feed.push(
            EventType::State,
            None,
            Operation::Update,
            Payload::State(StatePayload {
                started: contest_payload.start_time.clone(),
                ended: end.clone(),
                finalized: end.clone(),
                end_of_updates: end,
            }),
        );
    }

    info!("Derived {} events", feed.events.len());

    Ok(Package {
        contest: contest_payload,
        judgement_types,
        languages,
        groups,
        organizations,
        teams,
        problems,
        events: feed.events,
    })
}

#[cfg(test)]
mod tests;
