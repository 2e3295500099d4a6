use super::*;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use trackfetch_api::transport::MockTransport;
use trackfetch_test_utils::{display::RecordingDisplay, enable_tracing};

const TP: &str = "1430000000";

fn test_config() -> CoreConsumerConfig {
    CoreConsumerConfig {
        root_prefix: "/root".into(),
        space_name: "space".into(),
        pipeline_size: 3,
        ..Default::default()
    }
}

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

fn handle(state: &mut ConsumerState, event: Event) -> Vec<Command> {
    let mut out = Vec::new();
    state.handle(event, &mut out);
    out
}

fn data_event(kind: RequestKind, interest: Interest, data: Data) -> Event {
    Event::Outcome {
        kind,
        interest,
        outcome: Outcome::Data(data),
    }
}

fn timeout_event(kind: RequestKind, interest: Interest) -> Event {
    Event::Outcome {
        kind,
        interest,
        outcome: Outcome::Timeout,
    }
}

/// Names of the track interests among the commands.
fn track_names(commands: &[Command]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Express {
                kind: RequestKind::Track,
                interest,
            } => Some(interest.name.to_string()),
            _ => None,
        })
        .collect()
}

fn hint_interest(commands: &[Command]) -> Interest {
    commands
        .iter()
        .find_map(|c| match c {
            Command::Express {
                kind: RequestKind::Hint,
                interest,
            } => Some(interest.clone()),
            _ => None,
        })
        .expect("no hint interest expressed")
}

fn find_track_interest(commands: &[Command], seq: u64) -> Interest {
    commands
        .iter()
        .find_map(|c| match c {
            Command::Express {
                kind: RequestKind::Track,
                interest,
            } if interest.name.get(-1) == Some(&NameComponent::from(seq)) => {
                Some(interest.clone())
            }
            _ => None,
        })
        .expect("no such track interest")
}

fn track_data(track: &str, seq: u64) -> Data {
    Data::new(
        name(&format!("/root/space/{TP}/tracks/{track}/{seq}")),
        format!(r#"{{"seq":{seq}}}"#),
    )
}

fn hint_data(version: u64, content: &str) -> Data {
    Data::new(
        name(&format!("/root/space/{TP}/track_hint/{version}")),
        content.to_string(),
    )
}

/// Bring a state machine to the running phase, returns the first hint
/// interest.
fn running_state() -> (ConsumerState, Interest) {
    let mut state = ConsumerState::new(test_config()).unwrap();
    let out = handle(&mut state, Event::Start);
    let Command::Express {
        kind: RequestKind::Bootstrap,
        interest,
    } = out[0].clone()
    else {
        panic!("expected bootstrap interest, got {out:?}");
    };

    let out = handle(
        &mut state,
        data_event(
            RequestKind::Bootstrap,
            interest,
            hint_data(0, r#"{"tracks":[]}"#),
        ),
    );
    let hint = hint_interest(&out);
    (state, hint)
}

/// Running state with track "5" announced at seq 10.
fn fetching_state() -> (ConsumerState, Interest, Vec<Command>) {
    let (mut state, hint) = running_state();
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            hint,
            hint_data(1, r#"{"tracks":[{"id":5,"seq":10}]}"#),
        ),
    );
    let next_hint = hint_interest(&out);
    (state, next_hint, out)
}

#[test]
fn start_expresses_bootstrap_interest_once() {
    let mut state = ConsumerState::new(test_config()).unwrap();
    let out = handle(&mut state, Event::Start);
    assert_eq!(1, out.len());
    match &out[0] {
        Command::Express {
            kind: RequestKind::Bootstrap,
            interest,
        } => {
            assert_eq!("/root/space", interest.name.to_string());
            assert_eq!(ChildSelector::Rightmost, interest.child_selector);
        }
        c => panic!("unexpected {c:?}"),
    }
    assert_eq!(ConsumerPhase::Bootstrapping, state.status().phase);

    assert!(handle(&mut state, Event::Start).is_empty());
}

#[test]
fn bootstrap_timeout_reexpresses_after_interval() {
    let mut state = ConsumerState::new(test_config()).unwrap();
    let out = handle(&mut state, Event::Start);
    let Command::Express { interest, .. } = out[0].clone() else {
        panic!();
    };

    let out = handle(
        &mut state,
        timeout_event(RequestKind::Bootstrap, interest.clone()),
    );
    assert_eq!(
        vec![Command::ExpressAfter {
            delay: Duration::from_millis(1000),
            kind: RequestKind::Bootstrap,
            interest,
        }],
        out,
    );
    assert_eq!(ConsumerPhase::Bootstrapping, state.status().phase);
}

#[test]
fn malformed_bootstrap_data_keeps_pending() {
    let mut state = ConsumerState::new(test_config()).unwrap();
    let out = handle(&mut state, Event::Start);
    let Command::Express { interest, .. } = out[0].clone() else {
        panic!();
    };

    let out = handle(
        &mut state,
        data_event(
            RequestKind::Bootstrap,
            interest,
            Data::new(name(&format!("/root/space/{TP}")), ""),
        ),
    );
    assert!(out.is_empty());
    assert_eq!(ConsumerPhase::Bootstrapping, state.status().phase);
}

#[test]
fn bootstrap_data_starts_hint_polling() {
    let (state, hint) = running_state();
    assert_eq!(
        ConsumerPhase::Running {
            time_partition: NameComponent::from(TP)
        },
        state.status().phase,
    );
    assert_eq!(
        format!("/root/space/{TP}/track_hint"),
        hint.name.to_string()
    );
    assert!(hint.exclude.is_none());
}

#[test]
fn hint_starts_pipeline_for_new_track() {
    let (state, next_hint, out) = fetching_state();
    assert_eq!(
        vec![
            format!("/root/space/{TP}/tracks/5/11"),
            format!("/root/space/{TP}/tracks/5/12"),
            format!("/root/space/{TP}/tracks/5/13"),
        ],
        track_names(&out),
    );
    assert_eq!(
        Some(Exclude::up_to(NameComponent::from(1_u64))),
        next_hint.exclude,
    );

    let status = state.status();
    assert_eq!(Some(NameComponent::from(1_u64)), status.hint_marker);
    assert_eq!(1, status.tracks.len());
    assert_eq!(10, status.tracks[0].last_received_seq);
    assert_eq!(13, status.tracks[0].last_issued_seq);
}

#[test]
fn known_tracks_are_not_refetched() {
    let (mut state, next_hint, _) = fetching_state();
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            next_hint,
            hint_data(2, r#"{"tracks":[{"id":5,"seq":40},{"id":6,"seq":0}]}"#),
        ),
    );
    assert_eq!(
        vec![
            format!("/root/space/{TP}/tracks/6/1"),
            format!("/root/space/{TP}/tracks/6/2"),
            format!("/root/space/{TP}/tracks/6/3"),
        ],
        track_names(&out),
    );
}

#[test]
fn duplicate_hint_version_is_not_accepted() {
    let (mut state, next_hint, _) = fetching_state();
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            next_hint.clone(),
            hint_data(1, r#"{"tracks":[{"id":9,"seq":0}]}"#),
        ),
    );
    assert!(track_names(&out).is_empty());
    assert_eq!(next_hint, hint_interest(&out));
    assert_eq!(1, state.status().tracks.len());
}

#[test]
fn pipeline_scenario() {
    let (mut state, _, out) = fetching_state();
    let interest_11 = find_track_interest(&out, 11);
    let interest_10 = interest_11.clone();

    // response 11 moves the window by one
    let out = handle(
        &mut state,
        data_event(RequestKind::Track, interest_11, track_data("5", 11)),
    );
    assert_eq!(
        vec![format!("/root/space/{TP}/tracks/5/14")],
        track_names(&out)
    );
    assert!(out.contains(&Command::Display(TrackRecord {
        track_id: TrackId::new(5),
        seq: 11,
        payload: serde_json::json!({"seq": 11}),
    })));
    let interest_14 = find_track_interest(&out, 14);
    let status = state.status().tracks[0].clone();
    assert_eq!(11, status.last_received_seq);
    assert_eq!(14, status.last_issued_seq);

    // a late response for 10 is dropped
    let out = handle(
        &mut state,
        data_event(RequestKind::Track, interest_10, track_data("5", 10)),
    );
    assert!(out.is_empty());
    assert_eq!(status, state.status().tracks[0]);

    // timeout for 14 is re-expressed unchanged
    let out = handle(
        &mut state,
        timeout_event(RequestKind::Track, interest_14.clone()),
    );
    assert_eq!(
        vec![Command::Express {
            kind: RequestKind::Track,
            interest: interest_14,
        }],
        out,
    );
}

#[test]
fn moot_timeout_is_not_reexpressed() {
    let (mut state, _, out) = fetching_state();
    let interest_12 = find_track_interest(&out, 12);
    let interest_13 = find_track_interest(&out, 13);
    handle(
        &mut state,
        data_event(RequestKind::Track, interest_13, track_data("5", 13)),
    );
    assert!(handle(&mut state, timeout_event(RequestKind::Track, interest_12))
        .is_empty());
}

#[test]
fn window_invariant_holds_after_each_accepted_item() {
    let (mut state, _, out) = fetching_state();
    let template = find_track_interest(&out, 11);
    for seq in [12, 11, 15, 13, 14, 16, 20, 17] {
        handle(
            &mut state,
            data_event(
                RequestKind::Track,
                template.clone(),
                track_data("5", seq),
            ),
        );
        let t = state.status().tracks[0].clone();
        assert_eq!(3, t.last_issued_seq - t.last_received_seq);
    }
}

#[test]
fn undecodable_track_item_still_moves_window() {
    let (mut state, _, out) = fetching_state();
    let interest = find_track_interest(&out, 11);
    let mut data = track_data("5", 11);
    data.content = bytes::Bytes::from_static(b"not json");
    let out =
        handle(&mut state, data_event(RequestKind::Track, interest, data));
    assert_eq!(1, track_names(&out).len());
    assert!(!out.iter().any(|c| matches!(c, Command::Display(_))));
}

#[test]
fn hint_timeout_resets_tracks() {
    let (mut state, next_hint, out) = fetching_state();
    let interest_11 = find_track_interest(&out, 11);
    let interest_12 = find_track_interest(&out, 12);

    let out = handle(
        &mut state,
        timeout_event(RequestKind::Hint, next_hint.clone()),
    );
    assert_eq!(
        vec![Command::Express {
            kind: RequestKind::Hint,
            interest: next_hint.clone(),
        }],
        out,
    );
    assert!(state.status().tracks.is_empty());

    // outcomes of the old session are now unknown-track events
    assert!(handle(
        &mut state,
        data_event(RequestKind::Track, interest_11, track_data("5", 11)),
    )
    .is_empty());
    assert!(handle(&mut state, timeout_event(RequestKind::Track, interest_12))
        .is_empty());

    // the next hint repopulates with exactly one window per track
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            next_hint,
            hint_data(2, r#"{"tracks":[{"id":5,"seq":30},{"id":7,"seq":1}]}"#),
        ),
    );
    assert_eq!(6, track_names(&out).len());
    assert_eq!(2, state.status().tracks.len());
}

#[test]
fn timeout_threshold_drops_track() {
    let mut config = test_config();
    config.track_timeout_threshold = 2;
    let mut state = ConsumerState::new(config).unwrap();
    let out = handle(&mut state, Event::Start);
    let Command::Express { interest, .. } = out[0].clone() else {
        panic!();
    };
    let out = handle(
        &mut state,
        data_event(RequestKind::Bootstrap, interest, hint_data(0, "{}")),
    );
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            hint_interest(&out),
            hint_data(1, r#"{"tracks":[{"id":5,"seq":10}]}"#),
        ),
    );

    let first = handle(
        &mut state,
        timeout_event(RequestKind::Track, find_track_interest(&out, 11)),
    );
    assert_eq!(1, first.len());
    let second = handle(
        &mut state,
        timeout_event(RequestKind::Track, find_track_interest(&out, 12)),
    );
    assert!(second.is_empty());
    assert!(state.status().tracks.is_empty());
}

#[test]
fn hint_with_sequence_at_max_is_ignored() {
    let (mut state, hint) = running_state();
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            hint,
            hint_data(
                1,
                &format!(
                    r#"{{"tracks":[{{"id":5,"seq":{}}},{{"id":6,"seq":10}}]}}"#,
                    u64::MAX
                ),
            ),
        ),
    );

    // the other track of the same hint is still fetched
    assert_eq!(
        vec![
            format!("/root/space/{TP}/tracks/6/11"),
            format!("/root/space/{TP}/tracks/6/12"),
            format!("/root/space/{TP}/tracks/6/13"),
        ],
        track_names(&out),
    );
    let status = state.status();
    assert_eq!(1, status.tracks.len());
    assert_eq!(TrackId::new(6), status.tracks[0].track_id);
    assert_eq!(Some(NameComponent::from(1_u64)), status.hint_marker);
}

#[test]
fn track_window_near_max_sequence_does_not_overflow() {
    let (mut state, hint) = running_state();
    let start = u64::MAX - 3;
    let out = handle(
        &mut state,
        data_event(
            RequestKind::Hint,
            hint,
            hint_data(1, &format!(r#"{{"tracks":[{{"id":5,"seq":{start}}}]}}"#)),
        ),
    );
    assert_eq!(3, track_names(&out).len());
    let template = find_track_interest(&out, u64::MAX);

    for seq in [u64::MAX - 1, u64::MAX, u64::MAX] {
        let out = handle(
            &mut state,
            data_event(RequestKind::Track, template.clone(), track_data("5", seq)),
        );
        assert!(track_names(&out).is_empty());
    }
    assert!(handle(&mut state, timeout_event(RequestKind::Track, template))
        .is_empty());

    let track = state.status().tracks[0].clone();
    assert_eq!(u64::MAX, track.last_received_seq);
    assert_eq!(u64::MAX, track.last_issued_seq);
}

#[test]
fn zero_pipeline_size_is_rejected() {
    let config = CoreConsumerConfig {
        pipeline_size: 0,
        ..test_config()
    };
    assert!(config.validate().is_err());
    assert!(test_config().validate().is_ok());
}

#[test]
fn factory_default_config_round_trip() {
    let factory = CoreConsumerFactory::create();
    let mut config = Config::default();
    factory.default_config(&mut config).unwrap();
    factory.validate_config(&config).unwrap();

    let m: CoreConsumerModConfig = config.get_module_config().unwrap();
    assert_eq!(3, m.core_consumer.pipeline_size);
    assert_eq!(
        "/ndn/edu/ucla/remap/opt/node0",
        m.core_consumer.prefix().unwrap().to_string()
    );

    let config =
        Config::from_json(r#"{"coreConsumer":{"pipelineSize":0}}"#).unwrap();
    assert!(factory.validate_config(&config).is_err());
}

#[tokio::test(start_paused = true)]
async fn bootstrap_retries_forever_against_silent_transport() {
    enable_tracing();

    let expressed = Arc::new(Mutex::new(Vec::new()));
    let mut transport = MockTransport::new();
    transport.expect_express().returning({
        let expressed = expressed.clone();
        move |interest| {
            expressed.lock().unwrap().push(interest.name.clone());
            Box::pin(async move {
                tokio::time::sleep(interest.lifetime).await;
                Outcome::Timeout
            })
        }
    });

    let mut config = Config::default();
    config
        .set_module_config(&CoreConsumerModConfig {
            core_consumer: test_config(),
        })
        .unwrap();
    let display = Arc::new(RecordingDisplay::default());
    let consumer = CoreConsumerFactory::create()
        .create(&config, Arc::new(transport), display.clone())
        .await
        .unwrap();

    consumer.start();

    // lifetime 2 s + re-express interval 1 s per round
    tokio::time::sleep(Duration::from_millis(6500)).await;

    let expressed = expressed.lock().unwrap().clone();
    assert_eq!(3, expressed.len());
    assert!(expressed.iter().all(|n| n == &name("/root/space")));
    assert_eq!(
        ConsumerPhase::Bootstrapping,
        consumer.status().await.unwrap().phase
    );
    assert!(display.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn driver_delivers_track_items() {
    let mut transport = MockTransport::new();
    transport.expect_express().returning(|interest| {
        Box::pin(async move {
            let n = interest.name.to_string();
            if n == "/root/space" {
                Outcome::Data(hint_data(0, "{}"))
            } else if n.ends_with("/track_hint") && interest.exclude.is_none() {
                Outcome::Data(hint_data(
                    1,
                    r#"{"tracks":[{"id":"a","seq":0}]}"#,
                ))
            } else {
                // the producer has published items 1 to 10 so far
                let seq = interest
                    .name
                    .get(-1)
                    .and_then(NameComponent::to_seq)
                    .filter(|seq| *seq <= 10);
                match seq {
                    Some(seq) if !n.ends_with("/track_hint") => {
                        Outcome::Data(track_data("a", seq))
                    }
                    _ => {
                        tokio::time::sleep(interest.lifetime).await;
                        Outcome::Timeout
                    }
                }
            }
        })
    });

    let mut config = Config::default();
    config
        .set_module_config(&CoreConsumerModConfig {
            core_consumer: test_config(),
        })
        .unwrap();
    let display = Arc::new(RecordingDisplay::default());
    let consumer = CoreConsumerFactory::create()
        .create(&config, Arc::new(transport), display.clone())
        .await
        .unwrap();
    consumer.start();

    trackfetch_test_utils::iter_check!({
        let status = consumer.status().await.unwrap();
        if status
            .tracks
            .first()
            .is_some_and(|t| t.last_received_seq == 10)
        {
            assert_eq!(13, status.tracks[0].last_issued_seq);
            break;
        }
    });

    let records = display.records();
    assert!(!records.is_empty());
    assert_eq!(10, records.last().unwrap().seq);
    assert!(records.iter().all(|r| (1..=10).contains(&r.seq)));
    assert!(records.iter().all(|r| r.track_id == TrackId::new("a")));
    assert!(records.windows(2).all(|w| w[0].seq < w[1].seq));
}
