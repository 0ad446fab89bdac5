use crate::config::Config;
use crate::models::{
    Contest, ContestModel, Group, Judgement, JudgementType, Language, Organization, Problem,
    Submission, Team,
};
use chrono::prelude::*;
use chrono::{Duration, Offset};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;

mod error {
    use quick_xml::de::DeError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ParseError {
        #[error("malformed XML: {0}")]
        XmlDecode(#[from] DeError),
        #[error("<{element}> is missing required attribute `{attribute}`")]
        MissingAttribute {
            element: &'static str,
            attribute: &'static str,
        },
        #[error("<{element}> has invalid `{attribute}` {value:?}: {reason}")]
        InvalidAttribute {
            element: &'static str,
            attribute: &'static str,
            value: String,
            reason: String,
        },
        #[error("<{element}> has duplicate `{attribute}` {id:?}")]
        DuplicateId {
            element: &'static str,
            attribute: &'static str,
            id: String,
        },
        #[error("<{element}> `{attribute}` {id:?} does not match any <{target}>")]
        DanglingReference {
            element: &'static str,
            attribute: &'static str,
            id: String,
            target: &'static str,
        },
    }
}

pub use error::ParseError;

mod xml {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct RunLog {
        pub contest_id: Option<String>,
        pub start_time: Option<String>,
        pub duration: Option<String>,
        pub fog_time: Option<String>,
        pub name: Option<Name>,
        pub users: Option<Users>,
        pub problems: Option<Problems>,
        pub languages: Option<Languages>,
        pub runs: Option<Runs>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Name {
        #[serde(rename = "$value")]
        pub value: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Users {
        pub user: Option<Vec<User>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct User {
        pub id: Option<String>,
        pub name: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Problems {
        pub problem: Option<Vec<Problem>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Problem {
        pub id: Option<String>,
        pub short_name: Option<String>,
        pub long_name: Option<String>,
        pub time_limit: Option<String>,
        pub color: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Languages {
        pub language: Option<Vec<Language>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Language {
        pub id: Option<String>,
        pub short_name: Option<String>,
        pub long_name: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Runs {
        pub run: Option<Vec<Run>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Run {
        pub run_id: Option<String>,
        pub time: Option<String>,
        pub nsec: Option<String>,
        pub status: Option<String>,
        pub user_id: Option<String>,
        pub prob_id: Option<String>,
        pub lang_id: Option<String>,
        pub file: Option<String>,
    }
}

const START_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const GUEST_GROUP: &str = "Guest";

pub fn standard_judgement_types() -> Vec<JudgementType> {
    vec![
        JudgementType::new("AC", "Accepted", false, true),
        JudgementType::new("WA", "Wrong Answer", true, false),
        JudgementType::new("TLE", "Time Limit Exceeded", true, false),
        JudgementType::new("RTE", "Run-Time Error", true, false),
        JudgementType::new("MLE", "Memory Limit Exceeded", true, false),
        JudgementType::new("PE", "Presentation Error", true, false),
        JudgementType::new("CE", "Compiler Error", false, false),
    ]
}

/// Judgement type for an ejudge run status, `None` while the run is still
/// being processed.
pub fn judgement_type_for_status(status: &str) -> Option<&'static str> {
    match status {
        "OK" => Some("AC"),
        "WA" => Some("WA"),
        "PE" => Some("PE"),
        "TL" | "WT" => Some("TLE"),
        "ML" => Some("MLE"),
        "RT" => Some("RTE"),
        "CE" => Some("CE"),
        "RU" | "CD" | "CG" | "AV" | "PD" | "QU" | "AC" | "PR" | "RJ" => None,
        other => {
            warn!("Unknown run status {:?}, judging as CE", other);
            Some("CE")
        }
    }
}

lazy_static! {
    static ref ORGANIZATION_REGEX: Regex = Regex::new(r"^\s*([^:]*?)\s*:").unwrap();
    static ref GUEST_TEAM_REGEX: Regex = Regex::new(r"(?i)guest team").unwrap();
}

/// `"BSU: Team 1"` belongs to `"BSU"`; a name without a colon is its own
/// organization.
pub fn organization_name(team_name: &str) -> &str {
    ORGANIZATION_REGEX
        .captures(team_name)
        .and_then(|captures| captures.get(1))
        .map(|prefix| prefix.as_str())
        .filter(|prefix| !prefix.is_empty())
        .unwrap_or_else(|| team_name.trim())
}

pub fn group_name(team_name: &str) -> &str {
    if GUEST_TEAM_REGEX.is_match(team_name) {
        GUEST_GROUP
    } else {
        organization_name(team_name)
    }
}

// Largest whole-second count a `Duration` can hold.
const MAX_SECONDS: i64 = i64::MAX / 1000;

fn required<'a>(
    value: &'a Option<String>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, ParseError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ParseError::MissingAttribute { element, attribute })
}

fn optional(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn invalid(
    element: &'static str,
    attribute: &'static str,
    value: &str,
    reason: impl ToString,
) -> ParseError {
    ParseError::InvalidAttribute {
        element,
        attribute,
        value: value.into(),
        reason: reason.to_string(),
    }
}

fn parse_non_negative(
    value: &str,
    element: &'static str,
    attribute: &'static str,
) -> Result<i64, ParseError> {
    let number = value
        .parse::<i64>()
        .map_err(|e| invalid(element, attribute, value, e))?;
    if number < 0 {
        return Err(invalid(element, attribute, value, "must not be negative"));
    }
    Ok(number)
}

fn parse_seconds(
    value: &str,
    element: &'static str,
    attribute: &'static str,
) -> Result<Duration, ParseError> {
    let seconds = parse_non_negative(value, element, attribute)?;
    if seconds > MAX_SECONDS {
        return Err(invalid(element, attribute, value, "too large"));
    }
    Ok(Duration::seconds(seconds))
}

/// Fails unless `start + offset` is a representable instant.
fn check_in_calendar(
    start: &DateTime<FixedOffset>,
    offset: Duration,
    element: &'static str,
    attribute: &'static str,
    value: &str,
) -> Result<(), ParseError> {
    start
        .checked_add_signed(offset)
        .map(|_| ())
        .ok_or_else(|| invalid(element, attribute, value, "ends past the last supported date"))
}

fn parse_start_instant(value: &str, timezone: Tz) -> Result<DateTime<FixedOffset>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(value, START_TIME_FORMAT)
        .map_err(|e| invalid("runlog", "start_time", value, e))?;
    let local = timezone.from_local_datetime(&naive).single().ok_or_else(|| {
        invalid(
            "runlog",
            "start_time",
            value,
            format!("not a single local time in {}", timezone.name()),
        )
    })?;
    let offset = local.offset().fix();
    Ok(local.with_timezone(&offset))
}

fn claim_id(
    seen: &mut HashSet<String>,
    id: &str,
    element: &'static str,
    attribute: &'static str,
) -> Result<(), ParseError> {
    if !seen.insert(id.into()) {
        return Err(ParseError::DuplicateId {
            element,
            attribute,
            id: id.into(),
        });
    }
    Ok(())
}

fn resolve(
    known: &HashSet<String>,
    id: &str,
    element: &'static str,
    attribute: &'static str,
    target: &'static str,
) -> Result<(), ParseError> {
    if !known.contains(id) {
        return Err(ParseError::DanglingReference {
            element,
            attribute,
            id: id.into(),
            target,
        });
    }
    Ok(())
}

fn import_contest(runlog: &xml::RunLog, config: &Config) -> Result<Contest, ParseError> {
    let id = required(&runlog.contest_id, "runlog", "contest_id")?;
    let start_instant = parse_start_instant(
        required(&runlog.start_time, "runlog", "start_time")?,
        config.timezone,
    )?;
    let raw_duration = required(&runlog.duration, "runlog", "duration")?;
    let duration = parse_seconds(raw_duration, "runlog", "duration")?;
    check_in_calendar(&start_instant, duration, "runlog", "duration", raw_duration)?;
    let freeze_duration = match optional(&runlog.fog_time) {
        Some(fog_time) => {
            let freeze_duration = parse_seconds(fog_time, "runlog", "fog_time")?;
            if freeze_duration > duration {
                return Err(invalid(
                    "runlog",
                    "fog_time",
                    fog_time,
                    "longer than the contest",
                ));
            }
            Some(freeze_duration).filter(|d| *d != Duration::zero())
        }
        None => None,
    };
    let name = runlog
        .name
        .as_ref()
        .and_then(|name| name.value.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(id);

    Ok(Contest {
        id: id.into(),
        name: name.into(),
        start_instant,
        duration,
        freeze_duration,
    })
}

struct Participants {
    groups: Vec<Group>,
    organizations: Vec<Organization>,
    teams: Vec<Team>,
}

fn import_participants(users: &[xml::User]) -> Result<Participants, ParseError> {
    let mut participants = Participants {
        groups: Vec::new(),
        organizations: Vec::new(),
        teams: Vec::new(),
    };
    let mut team_ids = HashSet::new();
    let mut organization_ids = HashSet::new();
    let mut group_ids = HashSet::new();

    for user in users {
        let id = required(&user.id, "user", "id")?;
        claim_id(&mut team_ids, id, "user", "id")?;
        let name = required(&user.name, "user", "name")?;

        let organization = organization_name(name);
        if organization_ids.insert(organization.to_string()) {
            participants.organizations.push(Organization {
                id: organization.into(),
                name: organization.into(),
                group_id: None,
            });
        }

        let group = group_name(name);
        if group_ids.insert(group.to_string()) {
            participants.groups.push(Group {
                id: group.into(),
                name: group.into(),
            });
        }

        debug!("Team {} {:?} in {:?}/{:?}", id, name, organization, group);
        participants.teams.push(Team {
            id: id.into(),
            name: name.into(),
            organization_id: Some(organization.into()),
            group_ids: vec![group.into()],
        });
    }

    for organization in participants.organizations.iter_mut() {
        if group_ids.contains(&organization.id) {
            organization.group_id = Some(organization.id.clone());
        }
    }

    Ok(participants)
}

fn import_problems(problems: &[xml::Problem]) -> Result<Vec<Problem>, ParseError> {
    let mut ids = HashSet::new();
    problems
        .iter()
        .enumerate()
        .map(|(ordinal, problem)| {
            let id = required(&problem.id, "problem", "id")?;
            claim_id(&mut ids, id, "problem", "id")?;
            let label = required(&problem.short_name, "problem", "short_name")?;
            let time_limit = match optional(&problem.time_limit) {
                Some(value) => {
                    let seconds = value
                        .parse::<f64>()
                        .map_err(|e| invalid("problem", "time_limit", value, e))?;
                    if !seconds.is_finite() || seconds <= 0.0 {
                        return Err(invalid("problem", "time_limit", value, "must be positive"));
                    }
                    Some(Duration::milliseconds((seconds * 1000.0).round() as i64))
                }
                None => None,
            };
            Ok(Problem {
                id: id.into(),
                label: label.into(),
                name: optional(&problem.long_name).unwrap_or(label).into(),
                ordinal: ordinal as u32,
                time_limit,
                color: optional(&problem.color).map(String::from),
            })
        })
        .collect()
}

fn import_languages(languages: &[xml::Language]) -> Result<Vec<Language>, ParseError> {
    let mut ids = HashSet::new();
    languages
        .iter()
        .map(|language| {
            let id = required(&language.id, "language", "id")?;
            claim_id(&mut ids, id, "language", "id")?;
            let name = match optional(&language.long_name) {
                Some(name) => name,
                None => required(&language.short_name, "language", "long_name")?,
            };
            Ok(Language {
                id: id.into(),
                name: name.into(),
            })
        })
        .collect()
}

struct Known {
    teams: HashSet<String>,
    problems: HashSet<String>,
    languages: HashSet<String>,
}

fn import_runs(
    runs: &[xml::Run],
    start_instant: &DateTime<FixedOffset>,
    known: &Known,
) -> Result<(Vec<Submission>, Vec<Judgement>), ParseError> {
    let mut ids = HashSet::new();
    let mut submissions = Vec::with_capacity(runs.len());
    let mut judgements = Vec::with_capacity(runs.len());

    for run in runs {
        let id = required(&run.run_id, "run", "run_id")?;
        claim_id(&mut ids, id, "run", "run_id")?;

        let team_id = required(&run.user_id, "run", "user_id")?;
        resolve(&known.teams, team_id, "run", "user_id", "user")?;
        let problem_id = required(&run.prob_id, "run", "prob_id")?;
        resolve(&known.problems, problem_id, "run", "prob_id", "problem")?;
        let language_id = required(&run.lang_id, "run", "lang_id")?;
        resolve(&known.languages, language_id, "run", "lang_id", "language")?;

        let raw_time = required(&run.time, "run", "time")?;
        let mut time = parse_seconds(raw_time, "run", "time")?;
        if let Some(nsec) = optional(&run.nsec) {
            let nanoseconds = parse_non_negative(nsec, "run", "nsec")?;
            if nanoseconds >= 1_000_000_000 {
                return Err(invalid("run", "nsec", nsec, "must be below one second"));
            }
            time = time
                .checked_add(&Duration::nanoseconds(nanoseconds))
                .ok_or_else(|| invalid("run", "nsec", nsec, "too large"))?;
        }
        check_in_calendar(start_instant, time, "run", "time", raw_time)?;

        let status = required(&run.status, "run", "status")?;
        match judgement_type_for_status(status) {
            Some(judgement_type_id) => judgements.push(Judgement {
                id: id.into(),
                submission_id: id.into(),
                judgement_type_id: judgement_type_id.into(),
                time,
            }),
            None => debug!("Run {} is still pending ({})", id, status),
        }

        submissions.push(Submission {
            id: id.into(),
            team_id: team_id.into(),
            problem_id: problem_id.into(),
            language_id: language_id.into(),
            time,
            file: optional(&run.file).map(String::from),
        });
    }

    Ok((submissions, judgements))
}

fn ids<'a, T: 'a>(items: &'a [T], id: impl Fn(&'a T) -> &'a String) -> HashSet<String> {
    items.iter().map(|item| id(item).clone()).collect()
}

/// Reads an ejudge `<runlog>` export into a validated contest model.
pub fn parse(xml: &str, config: &Config) -> Result<ContestModel, ParseError> {
    let runlog: xml::RunLog = quick_xml::de::from_str(xml)?;

    let contest = import_contest(&runlog, config)?;
    info!(
        "Contest {} {:?} starts at {}",
        contest.id, contest.name, contest.start_instant
    );

    let users = runlog
        .users
        .as_ref()
        .and_then(|users| users.user.as_deref())
        .unwrap_or_default();
    let Participants {
        groups,
        organizations,
        teams,
    } = import_participants(users)?;

    let problems = import_problems(
        runlog
            .problems
            .as_ref()
            .and_then(|problems| problems.problem.as_deref())
            .unwrap_or_default(),
    )?;
    let languages = import_languages(
        runlog
            .languages
            .as_ref()
            .and_then(|languages| languages.language.as_deref())
            .unwrap_or_default(),
    )?;

    let known = Known {
        teams: ids(&teams, |team| &team.id),
        problems: ids(&problems, |problem| &problem.id),
        languages: ids(&languages, |language| &language.id),
    };
    let (submissions, judgements) = import_runs(
        runlog
            .runs
            .as_ref()
            .and_then(|runs| runs.run.as_deref())
            .unwrap_or_default(),
        &contest.start_instant,
        &known,
    )?;

    info!(
        "Imported {} teams, {} problems, {} languages, {} runs ({} judged)",
        teams.len(),
        problems.len(),
        languages.len(),
        submissions.len(),
        judgements.len()
    );

    Ok(ContestModel {
        contest,
        judgement_types: standard_judgement_types(),
        languages,
        groups,
        organizations,
        teams,
        problems,
        submissions,
        judgements,
    })
}
