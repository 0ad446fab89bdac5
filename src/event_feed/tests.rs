use super::*;
use crate::config::DurationFormat;
use crate::models::{Group, JudgementType, Language, Organization, Team};
use chrono::prelude::*;
use chrono::Duration;

fn contest() -> Contest {
    Contest {
        id: "olymp".into(),
        name: "Olympiad".into(),
        start_instant: FixedOffset::east(3 * 3600)
            .ymd(2023, 10, 21)
            .and_hms(10, 0, 0),
        duration: Duration::hours(5),
        freeze_duration: Some(Duration::hours(1)),
    }
}

/// 1 team, 1 problem, 1 language, 1 judgement type, 1 judged submission.
fn minimal_model() -> ContestModel {
    ContestModel {
        contest: contest(),
        judgement_types: vec![JudgementType::new("AC", "Accepted", false, true)],
        languages: vec![Language {
            id: "cpp".into(),
            name: "C++".into(),
        }],
        groups: vec![],
        organizations: vec![],
        teams: vec![Team {
            id: "T1".into(),
            name: "Team One".into(),
            organization_id: None,
            group_ids: vec![],
        }],
        problems: vec![Problem {
            id: "p1".into(),
            label: "A".into(),
            name: "Sum".into(),
            ordinal: 0,
            time_limit: Some(Duration::seconds(2)),
            color: Some("#ff0000".into()),
        }],
        submissions: vec![submission("s1", "T1", 90)],
        judgements: vec![judgement("s1", "AC", 95)],
    }
}

fn submission(id: &str, team_id: &str, seconds: i64) -> Submission {
    Submission {
        id: id.into(),
        team_id: team_id.into(),
        problem_id: "p1".into(),
        language_id: "cpp".into(),
        time: Duration::seconds(seconds),
        file: None,
    }
}

fn judgement(submission_id: &str, judgement_type_id: &str, seconds: i64) -> Judgement {
    Judgement {
        id: format!("j-{}", submission_id),
        submission_id: submission_id.into(),
        judgement_type_id: judgement_type_id.into(),
        time: Duration::seconds(seconds),
    }
}

/// A model with organizations, groups and submissions out of time order.
fn busy_model() -> ContestModel {
    let mut model = minimal_model();
    model
        .judgement_types
        .push(JudgementType::new("WA", "Wrong Answer", true, false));
    model.groups = vec![
        Group {
            id: "univ".into(),
            name: "Universities".into(),
        },
        Group {
            id: "Guest".into(),
            name: "Guest".into(),
        },
    ];
    model.organizations = vec![Organization {
        id: "bsu".into(),
        name: "BSU".into(),
        group_id: Some("univ".into()),
    }];
    model.teams.push(Team {
        id: "T2".into(),
        name: "BSU: Two".into(),
        organization_id: Some("bsu".into()),
        group_ids: vec!["univ".into(), "Guest".into()],
    });
    model.submissions = vec![
        submission("s1", "T1", 300),
        submission("s2", "T2", 100),
        submission("s3", "T1", 100),
        submission("s4", "T2", 400),
    ];
    model.judgements = vec![
        judgement("s1", "WA", 500),
        judgement("s2", "AC", 150),
        judgement("s3", "WA", 500),
    ];
    model
}

fn kinds(package: &Package) -> Vec<EventType> {
    package.events.iter().map(|event| event.kind).collect()
}

fn ids_of(package: &Package, kind: EventType) -> Vec<&str> {
    package
        .events
        .iter()
        .filter(|event| event.kind == kind)
        .filter_map(|event| event.id.as_deref())
        .collect()
}

/// Every `(type, id)` referenced by an event's payload.
fn references(event: &Event) -> Vec<(EventType, String)> {
    match &event.data {
        Payload::Team(team) => team
            .organization_id
            .iter()
            .map(|id| (EventType::Organizations, id.clone()))
            .chain(
                team.group_ids
                    .iter()
                    .map(|id| (EventType::Groups, id.clone())),
            )
            .collect(),
        Payload::Submission(submission) => vec![
            (EventType::Teams, submission.team_id.clone()),
            (EventType::Problems, submission.problem_id.clone()),
            (EventType::Languages, submission.language_id.clone()),
        ],
        Payload::Judgement(judgement) => vec![
            (EventType::Submissions, judgement.submission_id.clone()),
            (EventType::JudgementTypes, judgement.judgement_type_id.clone()),
        ],
        _ => vec![],
    }
}

#[test]
fn minimal_model_produces_seven_events() {
    let package = derive(&minimal_model(), &Config::default()).unwrap();
    assert_eq!(
        kinds(&package),
        vec![
            EventType::Contests,
            EventType::JudgementTypes,
            EventType::Languages,
            EventType::Teams,
            EventType::Problems,
            EventType::Submissions,
            EventType::Judgements,
        ]
    );
    let tokens: Vec<_> = package.events.iter().map(|e| e.token.as_str()).collect();
    assert_eq!(tokens, vec!["1", "2", "3", "4", "5", "6", "7"]);
    assert!(package.events.iter().all(|e| e.op == Operation::Create));

    match &package.events[5].data {
        Payload::Submission(submission) => {
            assert_eq!(submission.team_id, "T1");
            assert_eq!(submission.time, "2023-10-21T10:01:30.000+03:00");
            assert_eq!(submission.contest_time, "0:01:30.000");
            assert!(submission.files.is_empty());
        }
        other => panic!("expected a submission, got {:?}", other),
    }
    match &package.events[6].data {
        Payload::Judgement(judgement) => {
            assert_eq!(judgement.submission_id, "s1");
            assert_eq!(judgement.judgement_type_id, "AC");
            assert_eq!(judgement.end_contest_time, "0:01:35.000");
        }
        other => panic!("expected a judgement, got {:?}", other),
    }
}

#[test]
fn metadata_mirrors_the_model() {
    let package = derive(&minimal_model(), &Config::default()).unwrap();
    assert_eq!(package.teams.len(), 1);
    assert_eq!(package.languages[0].name, "C++");
    assert!(package.groups.is_empty());
    assert!(package.organizations.is_empty());

    let problem = &package.problems[0];
    assert_eq!(problem.label, "A");
    assert_eq!(problem.time_limit, Some(2.0));
    assert_eq!(problem.rgb.as_deref(), Some("#ff0000"));
    assert_eq!(problem.color, None);

    let judgement_type = &package.judgement_types[0];
    assert!(judgement_type.solved);
    assert!(!judgement_type.penalty);
}

#[test]
fn contest_descriptor_derives_the_freeze_time() {
    let package = derive(&minimal_model(), &Config::default()).unwrap();
    let descriptor = &package.contest;
    assert_eq!(descriptor.id, "olymp");
    assert_eq!(descriptor.start_time, "2023-10-21T10:00:00.000+03:00");
    assert_eq!(descriptor.duration, "5:00:00.000");
    assert_eq!(
        descriptor.scoreboard_freeze_duration.as_deref(),
        Some("1:00:00.000")
    );
    assert_eq!(
        descriptor.scoreboard_freeze_time.as_deref(),
        Some("2023-10-21T14:00:00.000+03:00")
    );
    assert_eq!(descriptor.penalty_time, 20);
    assert_eq!(package.events[0].data, Payload::Contest(descriptor.clone()));
}

#[test]
fn iso8601_durations_when_configured() {
    let config = Config {
        duration_format: DurationFormat::Iso8601,
        ..Config::default()
    };
    let package = derive(&minimal_model(), &config).unwrap();
    assert_eq!(package.contest.duration, "PT5H0M0.000S");
}

#[test]
fn no_forward_references() {
    let package = derive(&busy_model(), &Config::default()).unwrap();
    let mut seen = HashSet::new();
    for event in &package.events {
        for reference in references(event) {
            assert!(
                seen.contains(&reference),
                "event {} references {:?} before it appears",
                event.token,
                reference
            );
        }
        if let Some(id) = &event.id {
            seen.insert((event.kind, id.clone()));
        }
    }
}

#[test]
fn types_appear_in_dependency_order() {
    let package = derive(&busy_model(), &Config::default()).unwrap();
    let order = [
        EventType::Contests,
        EventType::JudgementTypes,
        EventType::Languages,
        EventType::Groups,
        EventType::Organizations,
        EventType::Teams,
        EventType::Problems,
        EventType::Submissions,
        EventType::Judgements,
    ];
    let rank = |kind: EventType| order.iter().position(|k| *k == kind).unwrap();
    let ranks: Vec<_> = package.events.iter().map(|e| rank(e.kind)).collect();
    assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));
    for kind in order.iter() {
        assert!(package.events.iter().any(|e| e.kind == *kind));
    }
}

#[test]
fn submissions_follow_time_with_ties_in_source_order() {
    let package = derive(&busy_model(), &Config::default()).unwrap();
    assert_eq!(
        ids_of(&package, EventType::Submissions),
        vec!["s2", "s3", "s1", "s4"]
    );
}

#[test]
fn judgements_follow_judged_time_after_all_submissions() {
    let package = derive(&busy_model(), &Config::default()).unwrap();
    assert_eq!(
        ids_of(&package, EventType::Judgements),
        vec!["j-s2", "j-s1", "j-s3"]
    );

    let position = |kind: EventType, id: &str| {
        package
            .events
            .iter()
            .position(|e| e.kind == kind && e.id.as_deref() == Some(id))
            .unwrap()
    };
    for event in package.events.iter().filter(|e| e.kind == EventType::Judgements) {
        if let Payload::Judgement(judgement) = &event.data {
            let judged_at = position(EventType::Judgements, &judgement.id);
            assert!(judged_at > position(EventType::Submissions, &judgement.submission_id));
        }
    }
}

#[test]
fn pending_submission_has_no_judgement() {
    let package = derive(&busy_model(), &Config::default()).unwrap();
    let judged: Vec<_> = package
        .events
        .iter()
        .filter_map(|event| match &event.data {
            Payload::Judgement(judgement) => Some(judgement.submission_id.as_str()),
            _ => None,
        })
        .collect();
    assert!(!judged.contains(&"s4"));
    assert_eq!(ids_of(&package, EventType::Submissions).len(), 4);
}

#[test]
fn finalize_appends_a_state_update() {
    let config = Config {
        finalize: true,
        ..Config::default()
    };
    let package = derive(&minimal_model(), &config).unwrap();
    assert_eq!(package.events.len(), 8);
    let state = package.events.last().unwrap();
    assert_eq!(state.kind, EventType::State);
    assert_eq!(state.op, Operation::Update);
    assert_eq!(state.id, None);
    match &state.data {
        Payload::State(state) => {
            assert_eq!(state.ended, "2023-10-21T15:00:00.000+03:00");
            assert_eq!(state.finalized, state.ended);
        }
        other => panic!("expected state, got {:?}", other),
    }
}

#[test]
fn duplicate_team_id_is_an_integrity_error() {
    let mut model = busy_model();
    model.teams[1].id = "T1".into();
    match derive(&model, &Config::default()) {
        Err(IntegrityError::DuplicateId { kind, id }) => {
            assert_eq!(kind, EventType::Teams);
            assert_eq!(id, "T1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unknown_team_is_an_integrity_error() {
    let mut model = minimal_model();
    model.submissions[0].team_id = "T9".into();
    match derive(&model, &Config::default()) {
        Err(IntegrityError::DanglingReference {
            kind,
            target,
            target_id,
            ..
        }) => {
            assert_eq!(kind, EventType::Submissions);
            assert_eq!(target, EventType::Teams);
            assert_eq!(target_id, "T9");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unknown_organization_group_is_an_integrity_error() {
    let mut model = busy_model();
    model.organizations[0].group_id = Some("nowhere".into());
    assert!(matches!(
        derive(&model, &Config::default()),
        Err(IntegrityError::DanglingReference {
            kind: EventType::Organizations,
            ..
        })
    ));
}

#[test]
fn judgement_before_submission_is_an_integrity_error() {
    let mut model = minimal_model();
    model.judgements[0].time = Duration::seconds(10);
    assert!(matches!(
        derive(&model, &Config::default()),
        Err(IntegrityError::JudgementBeforeSubmission { .. })
    ));
}

#[test]
fn events_serialize_as_feed_lines() {
    let package = derive(&minimal_model(), &Config::default()).unwrap();
    let line = serde_json::to_value(&package.events[5]).unwrap();
    assert_eq!(line["type"], "submissions");
    assert_eq!(line["id"], "s1");
    assert_eq!(line["op"], "create");
    assert_eq!(line["token"], "6");
    assert_eq!(line["data"]["problem_id"], "p1");

    let judgement_type = serde_json::to_value(&package.events[1]).unwrap();
    assert_eq!(judgement_type["type"], "judgement-types");
    assert_eq!(judgement_type["data"]["solved"], true);
}
