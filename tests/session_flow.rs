use rand::rngs::StdRng;
use rand::SeedableRng;

use pose_coach::catalog::slugify;
use pose_coach::detect::StubDetector;
use pose_coach::evaluate::NO_POSE_DETECTED;
use pose_coach::session::{select_verdict_source, RestKind, ScriptedVerdictSource};
use pose_coach::{
    shared_memory_uri, CameraConfig, CameraSource, CoachError, DetectionResult, DetectorRegistry,
    Feedback, PoseDefinition, PoseEvaluator, PoseVerdict, RecordingSink, SessionEvent, SessionLog,
    SessionMachine, SessionPhase, SessionTiming, SqliteSessionLog, VerdictSource, VoiceSettings,
};

const CLOCK_BASE: i64 = 1_700_000_000;
const TEN_MINUTES_MS: u64 = 10 * 60 * 1_000;

fn poses(names: &[&str]) -> Vec<PoseDefinition> {
    names
        .iter()
        .map(|name| PoseDefinition::new(&slugify(name), name))
        .collect()
}

fn instant_holds() -> SessionTiming {
    SessionTiming {
        hold_min_secs: 1,
        hold_max_secs: 1,
        ..SessionTiming::default()
    }
}

fn fallback_banners(sink: &RecordingSink) -> usize {
    sink.banners()
        .iter()
        .filter(|b| b.message == "AI pose detection failed. Using fallback mode.")
        .count()
}

fn session_with(
    names: &[&str],
    timing: SessionTiming,
    source: Box<dyn VerdictSource>,
    sink: &RecordingSink,
) -> SessionMachine {
    SessionMachine::new(
        poses(names),
        timing,
        source,
        Feedback::new(Box::new(sink.clone()), VoiceSettings::default()),
        Box::new(StdRng::seed_from_u64(42)),
    )
    .unwrap()
    .with_clock_base(CLOCK_BASE)
}

#[test]
fn four_poses_rest_short_short_long_then_complete() {
    let uri = shared_memory_uri();
    let reader = SqliteSessionLog::open(&uri).unwrap();
    let writer = SqliteSessionLog::open(&uri).unwrap();

    let script = ScriptedVerdictSource::always(PoseVerdict::pass());
    let sink = RecordingSink::new();
    let names = ["Mountain Pose", "Tree Pose", "Warrior II", "Boat Pose"];
    let mut session = session_with(&names, instant_holds(), Box::new(script.clone()), &sink)
        .with_user("tester")
        .with_log(Box::new(writer));

    session.start().unwrap();
    session.run_to_end(TEN_MINUTES_MS);

    let events = session.drain_events();
    let rests: Vec<(RestKind, u32)> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::RestStarted { kind, secs } => Some((*kind, *secs)),
            _ => None,
        })
        .collect();
    assert_eq!(rests.len(), 3);
    assert_eq!(rests[0].0, RestKind::Short);
    assert_eq!(rests[1].0, RestKind::Short);
    assert_eq!(rests[2], (RestKind::Long, 30));
    for (_, secs) in &rests[..2] {
        assert!((10..=20).contains(secs));
    }

    let completed: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::PoseCompleted { name, held_secs, .. } => {
                assert_eq!(*held_secs, 1);
                Some(name.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(completed, names);

    let tail: Vec<&SessionEvent> = events.iter().rev().take(2).collect();
    assert_eq!(*tail[0], SessionEvent::ExitRequested);
    assert_eq!(*tail[1], SessionEvent::SessionComplete { poses_completed: 4 });
    assert_eq!(session.phase(), SessionPhase::SessionComplete);
    assert!(session.is_finished());
    assert!(script.is_released());

    assert_eq!(reader.count().unwrap(), 4);
    let report = reader
        .weekly_report("tester", CLOCK_BASE + 3_600)
        .unwrap();
    assert_eq!(report.len(), 4);
    assert!(report.iter().all(|row| row.completions == 1));
}

#[test]
fn countdown_only_runs_while_pose_is_correct() {
    let script = ScriptedVerdictSource::always(PoseVerdict::fail("Level your hips."));
    let sink = RecordingSink::new();
    let mut session = session_with(
        &["Mountain Pose"],
        SessionTiming::default(),
        Box::new(script.clone()),
        &sink,
    );
    session.start().unwrap();
    session.run_until(2_000);
    let target = session.timer().unwrap().target_secs;

    session.run_until(10_000);
    assert_eq!(session.timer().unwrap().remaining_secs, target);
    assert_eq!(session.display(), "PAUSED");

    script.push(PoseVerdict::pass());
    session.run_until(10_500);
    let mut last = session.timer().unwrap().remaining_secs;
    for second in 1..=5u64 {
        session.run_until(10_500 + second * 1_000);
        let now = session.timer().unwrap().remaining_secs;
        assert_eq!(now + 1, last);
        last = now;
    }
}

#[test]
fn unchanged_verdicts_give_feedback_once() {
    let script = ScriptedVerdictSource::always(PoseVerdict::pass());
    let sink = RecordingSink::new();
    let mut session = session_with(
        &["Mountain Pose", "Tree Pose"],
        SessionTiming::default(),
        Box::new(script.clone()),
        &sink,
    );
    session.start().unwrap();
    session.run_until(10_000);

    assert!(script.polls() >= 5);
    let praise = sink
        .banners()
        .iter()
        .filter(|b| b.message == "Perfect Mountain Pose!")
        .count();
    assert_eq!(praise, 1);
    let spoken = sink
        .speech()
        .iter()
        .filter(|s| s.starts_with("Great! Your pose looks correct."))
        .count();
    assert_eq!(spoken, 1);
}

#[test]
fn denied_camera_ends_the_session() {
    let script = ScriptedVerdictSource::default().denying_camera();
    let sink = RecordingSink::new();
    let mut session = session_with(&["Tree Pose"], SessionTiming::default(), Box::new(script), &sink);

    let err = session.start().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CoachError>(),
        Some(CoachError::CameraAccessDenied(_))
    ));
    assert_eq!(session.phase(), SessionPhase::Ended);
    assert_eq!(session.pending_timers(), 0);
    assert_eq!(session.drain_events(), vec![SessionEvent::CameraDenied]);
    assert_eq!(
        sink.banners()[0].message,
        "Camera access denied. Please check permissions."
    );
}

#[test]
fn failed_detector_switches_to_fallback_once() {
    let mut registry = DetectorRegistry::new();
    registry.register(StubDetector::unavailable("model missing"));
    let camera = CameraSource::new(CameraConfig::default()).unwrap();
    let (source, reason) = select_verdict_source(
        &registry,
        None,
        Box::new(camera),
        PoseEvaluator::default(),
        Box::new(StdRng::seed_from_u64(5)),
        &SessionTiming::default(),
    );
    assert!(source.is_fallback());

    let sink = RecordingSink::new();
    let mut session = session_with(&["Chair Pose"], SessionTiming::default(), source, &sink)
        .with_fallback_reason(reason);
    session.start().unwrap();

    assert_eq!(fallback_banners(&sink), 1);
    match &session.drain_events()[0] {
        SessionEvent::FallbackActive { reason } => assert!(reason.contains("model missing")),
        other => panic!("unexpected first event {:?}", other),
    }

    session.run_until(20_000);
    assert_eq!(fallback_banners(&sink), 1);
    assert!(session.last_verdict().is_some());
    assert!(!session.phase().is_terminal());
}

#[test]
fn empty_frames_hand_over_to_simulated_verdicts() {
    let mut registry = DetectorRegistry::new();
    registry.register(StubDetector::fixed(DetectionResult::default()));
    let camera = CameraSource::new(CameraConfig::default()).unwrap();
    let timing = SessionTiming::default();
    assert_eq!(timing.no_body_fallback_cycles, 20);
    let (source, reason) = select_verdict_source(
        &registry,
        None,
        Box::new(camera),
        PoseEvaluator::default(),
        Box::new(StdRng::seed_from_u64(5)),
        &timing,
    );
    assert!(reason.is_none());

    let sink = RecordingSink::new();
    let mut session = session_with(&["Warrior II"], timing, source, &sink);
    session.start().unwrap();

    // 18 empty cycles: the timer holds and the detector is still in charge.
    session.run_until(9_000);
    let target = session.timer().unwrap().target_secs;
    assert_eq!(session.timer().unwrap().remaining_secs, target);
    assert_eq!(
        session.last_verdict().and_then(|v| v.first_correction()),
        Some(NO_POSE_DETECTED)
    );
    let early = session.drain_events();
    assert!(!early.contains(&SessionEvent::DetectionActive));
    assert!(!early
        .iter()
        .any(|e| matches!(e, SessionEvent::FallbackActive { .. })));
    assert_eq!(fallback_banners(&sink), 0);

    session.run_until(12_000);
    let reasons: Vec<String> = session
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::FallbackActive { reason } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("no body detected"), "{}", reasons[0]);
    assert_eq!(fallback_banners(&sink), 1);

    session.run_to_end(TEN_MINUTES_MS);
    assert_eq!(session.poses_completed(), 1);
    assert_eq!(session.phase(), SessionPhase::SessionComplete);
    assert_eq!(fallback_banners(&sink), 1);
    assert!(session.is_finished());
}

#[test]
fn every_third_pose_earns_the_long_rest() {
    let script = ScriptedVerdictSource::always(PoseVerdict::pass());
    let sink = RecordingSink::new();
    let names = [
        "Mountain Pose",
        "Tree Pose",
        "Warrior II",
        "Boat Pose",
        "Chair Pose",
        "Camel Pose",
        "Plank Pose",
    ];
    let mut session = session_with(&names, instant_holds(), Box::new(script), &sink);
    session.start().unwrap();
    session.run_to_end(TEN_MINUTES_MS);

    let events = session.drain_events();
    let kinds: Vec<RestKind> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::RestStarted { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    use RestKind::{Long, Short};
    assert_eq!(kinds, vec![Short, Short, Long, Short, Short, Long]);
    assert!(events.contains(&SessionEvent::SessionComplete { poses_completed: 7 }));
    assert_eq!(session.poses_completed(), 7);
}
