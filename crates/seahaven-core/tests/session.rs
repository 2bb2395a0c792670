//! Session-level tests driven by the scripted generator on tokio's paused
//! clock.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use seahaven_core::{
    AGENT_ACTIONS_TASK, BET_RESOLUTION_TASK, EVICTION_TASK, MOVEMENT_TASK, SeahavenConfig, Session,
    TaskError, WORLD_EVENT_TASK,
};
use seahaven_llm::{
    AGENT_INSTRUCTION_FALLBACK, PROTAGONIST_FALLBACK, Reply, ScriptedGenerator, Task,
    WORLD_CHAT_FALLBACK,
};
use seahaven_market::{InvalidStakeError, NewBet};
use seahaven_types::{BetId, EventType, GlobalEvent, Position, Stake, TurnKind};
use seahaven_world::WorldError;

/// Quiet defaults: no house bets, no agent participation, generous deadline.
fn config() -> SeahavenConfig {
    let mut config = SeahavenConfig::default();
    config.market.seed_bets = false;
    config.agents.participation_probability = 0.0;
    config.collaborator.request_timeout_ms = 60_000;
    config
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

fn bet_events(events: &[GlobalEvent]) -> usize {
    events.iter().filter(|e| e.event_type == EventType::Bet).count()
}

#[tokio::test(start_paused = true)]
async fn slow_task_is_skipped_not_overlapped() {
    let generator = ScriptedGenerator::new();
    generator
        .set_default(
            Task::WorldEvent,
            Reply::text(r#"{"event": "A plane circles overhead", "changes": {}}"#),
        )
        .set_delay(Task::WorldEvent, Duration::from_secs(25));
    let session = Session::start(&config(), generator.clone()).unwrap();

    // Ticks at 10, 20, 30, 40: the call started at 10 is still running at
    // 20 and 30.
    advance(41).await;
    assert_eq!(generator.calls(Task::WorldEvent), 2);
    assert_eq!(generator.peak_in_flight(Task::WorldEvent), 1);

    let stats = session.stats();
    let world_event = stats.iter().find(|s| s.name == WORLD_EVENT_TASK).unwrap();
    assert_eq!(world_event.runs, 2);
    assert_eq!(world_event.skipped, 2);
    assert_eq!(world_event.completed, 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn answer_arriving_after_shutdown_is_discarded() {
    let generator = ScriptedGenerator::new();
    generator
        .set_default(
            Task::WorldEvent,
            Reply::text(r#"{"event": "A storm is staged", "changes": {"weather": "Stormy"}}"#),
        )
        .set_delay(Task::WorldEvent, Duration::from_secs(5));
    let session = Session::start(&config(), generator.clone()).unwrap();

    advance(12).await;
    assert_eq!(generator.calls(Task::WorldEvent), 1);
    let report = session.shutdown().await;

    advance(30).await;
    assert_eq!(report.snapshot.world.weather, "Sunny");
    assert_eq!(report.snapshot.world.current_event, None);
    assert_eq!(report.task(WORLD_EVENT_TASK).unwrap().cancelled, 1);
    assert_eq!(generator.calls(Task::WorldEvent), 1);
}

#[tokio::test(start_paused = true)]
async fn world_event_applies_changes_and_logs_them() {
    let generator = ScriptedGenerator::new();
    generator.set_default(
        Task::WorldEvent,
        Reply::text(
            "```json\n{\"event\": \"A stage light falls from the sky\", \"changes\": {\"weather\": \"Rainy\", \"timeOfDay\": \"Noon\"}}\n```",
        ),
    );
    let session = Session::start(&config(), generator).unwrap();

    advance(11).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.world.weather, "Rainy");
    assert_eq!(snapshot.world.time_of_day, "Noon");
    assert_eq!(
        snapshot.world.current_event.as_deref(),
        Some("A stage light falls from the sky")
    );
    let kinds: Vec<EventType> = snapshot.recent_events.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![EventType::Weather, EventType::Interaction]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_world_event_changes_nothing() {
    let generator = ScriptedGenerator::new();
    generator.set_default(Task::WorldEvent, Reply::text("I would rather not."));
    let session = Session::start(&config(), generator).unwrap();

    advance(11).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.world.weather, "Sunny");
    assert_eq!(snapshot.world.current_event, None);
    assert!(snapshot.recent_events.is_empty());

    let report = session.shutdown().await;
    assert_eq!(report.task(WORLD_EVENT_TASK).unwrap().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_resolution_leaves_bets_active() {
    let generator = ScriptedGenerator::new();
    generator
        .push(Task::BetResolution, Reply::Fail("connection reset".to_owned()))
        .push(Task::BetResolution, Reply::text("[{\"id\": \"1\", \"success\": maybe}]"))
        .set_default(
            Task::BetResolution,
            Reply::text(r#"[{"id": "1", "success": true, "message": "He spotted the light."}]"#),
        );
    let mut config = config();
    config.market.seed_bets = true;
    let session = Session::start(&config, generator.clone()).unwrap();
    let opening = session.snapshot().await.active_bets;
    assert_eq!(opening.len(), 2);

    // Cycles at 20 and 40 fail; nothing changes.
    advance(41).await;
    assert_eq!(generator.calls(Task::BetResolution), 2);
    assert_eq!(session.snapshot().await.active_bets, opening);

    // The cycle at 60 resolves only the bet named in the answer.
    advance(20).await;
    let active = session.snapshot().await.active_bets;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, BetId::from("2"));
    assert_eq!(active[0].pool, opening[1].pool);

    let report = session.shutdown().await;
    let resolution = report.task(BET_RESOLUTION_TASK).unwrap();
    assert_eq!(resolution.failures, 2);
    assert_eq!(resolution.completed, 1);
    assert!(
        report
            .snapshot
            .recent_events
            .iter()
            .any(|e| e.event_type == EventType::Bet && e.bet_id == Some(BetId::from("1"))
                && e.description.contains("resolved"))
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_location_is_discarded_and_known_one_moves() {
    let generator = ScriptedGenerator::new();
    generator
        .push(Task::NextLocation, Reply::text("the moon"))
        .set_default(Task::NextLocation, Reply::text("Cafe."));
    let session = Session::start(&config(), generator).unwrap();

    advance(11).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.protagonist.current_location, "home");
    assert_eq!(snapshot.protagonist_position, Position::new(50.0, 50.0));

    // The location switches at once; the animation catches up over 20 steps
    // of 50ms.
    tokio::time::sleep(Duration::from_millis(9_100)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.protagonist.current_location, "cafe");
    assert_eq!(snapshot.protagonist.current_activity, "Going to Cafe");
    assert_ne!(snapshot.protagonist_position, Position::new(30.0, 40.0));
    assert!(
        snapshot
            .recent_events
            .iter()
            .any(|e| e.event_type == EventType::Movement && e.location.as_deref() == Some("cafe"))
    );

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.protagonist_position, Position::new(30.0, 40.0));

    let report = session.shutdown().await;
    let movement = report.task(MOVEMENT_TASK).unwrap();
    assert_eq!(movement.completed, 2);
    assert_eq!(movement.failures, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_animation_settles_at_the_target() {
    let generator = ScriptedGenerator::new();
    generator.set_default(Task::NextLocation, Reply::text("store"));
    let session = Session::start(&config(), generator).unwrap();

    tokio::time::sleep(Duration::from_millis(10_200)).await;
    let moving = session.snapshot().await;
    assert_eq!(moving.protagonist.current_location, "store");
    assert_ne!(moving.protagonist_position, Position::new(70.0, 70.0));

    let report = session.shutdown().await;
    assert_eq!(report.snapshot.protagonist_position, Position::new(70.0, 70.0));
}

#[tokio::test(start_paused = true)]
async fn agents_act_and_protagonist_answers() {
    let generator = ScriptedGenerator::new();
    generator
        .set_default(Task::AgentAutonomous, Reply::text("Lovely day for a walk!"))
        .set_default(Task::ProtagonistReply, Reply::text("Truman: It is. Odd how it never rains."));
    let mut config = config();
    config.agents.participation_probability = 1.0;
    let session = Session::start(&config, generator.clone()).unwrap();

    advance(11).await;
    let snapshot = session.snapshot().await;
    let turns: Vec<(&str, TurnKind)> = snapshot
        .conversation
        .iter()
        .map(|t| (t.speaker.as_str(), t.kind))
        .collect();
    assert_eq!(
        turns,
        vec![
            ("Meryl", TurnKind::Action),
            ("Truman", TurnKind::Response),
            ("Marlon", TurnKind::Action),
            ("Truman", TurnKind::Response),
        ]
    );
    assert_eq!(snapshot.conversation[1].text, "It is. Odd how it never rains.");
    assert_eq!(snapshot.conversation[1].suspicion_delta, Some(10));
    assert_eq!(snapshot.world.suspicion_meter, 40);
    assert_eq!(generator.calls(Task::AgentAutonomous), 2);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn one_failing_agent_does_not_stop_the_other() {
    let generator = ScriptedGenerator::new();
    generator
        .push(Task::AgentAutonomous, Reply::Fail("rate limited".to_owned()))
        .set_default(Task::AgentAutonomous, Reply::text("Hey pal!"))
        .set_default(Task::ProtagonistReply, Reply::text("Hey!"));
    let mut config = config();
    config.agents.participation_probability = 1.0;
    let session = Session::start(&config, generator).unwrap();

    advance(11).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.conversation.len(), 2);
    assert_eq!(snapshot.conversation[0].speaker, "Marlon");

    let report = session.shutdown().await;
    assert_eq!(report.task(AGENT_ACTIONS_TASK).unwrap().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn instruction_reaches_agent_and_protagonist() {
    let generator = ScriptedGenerator::new();
    generator
        .set_default(
            Task::AgentInstruction,
            Reply::text("Meryl: Truman, try this new Mococoa drink!"),
        )
        .set_default(
            Task::ProtagonistReply,
            Reply::text("Why do you talk like a commercial? That's strange."),
        );
    let session = Session::start(&config(), generator.clone()).unwrap();

    let outcome = session.instruct("meryl", "Promote the cocoa").await.unwrap();
    assert_eq!(outcome.action.speaker, "Meryl");
    assert_eq!(outcome.action.text, "Truman, try this new Mococoa drink!");
    assert_eq!(outcome.action.kind, TurnKind::Action);
    assert_eq!(outcome.response.kind, TurnKind::Response);
    assert_eq!(outcome.response.suspicion_delta, Some(20));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.world.suspicion_meter, 40);
    assert_eq!(snapshot.conversation, vec![outcome.action, outcome.response]);
    assert_eq!(
        generator.requests()[0].messages.last().map(|m| m.content.contains("Promote the cocoa")),
        Some(true)
    );

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn instruction_degrades_to_fallback_lines() {
    let generator = ScriptedGenerator::new();
    let session = Session::start(&config(), generator).unwrap();

    let outcome = session.instruct("Marlon", "Distract him").await.unwrap();
    assert_eq!(outcome.action.text, AGENT_INSTRUCTION_FALLBACK);
    assert_eq!(outcome.response.text, PROTAGONIST_FALLBACK);
    assert_eq!(outcome.response.suspicion_delta, Some(0));
    assert_eq!(session.snapshot().await.world.suspicion_meter, 20);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn instruction_to_unknown_agent_is_rejected() {
    let generator = ScriptedGenerator::new();
    let session = Session::start(&config(), generator.clone()).unwrap();

    let err = session.instruct("Christof", "Cue the sun").await.unwrap_err();
    assert!(matches!(err, TaskError::World(WorldError::UnknownAgent(_))));
    assert!(generator.requests().is_empty());
    assert!(session.snapshot().await.conversation.is_empty());

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn world_chat_keeps_audience_message_on_failure() {
    let generator = ScriptedGenerator::new();
    generator
        .push(Task::WorldChat, Reply::Fail("offline".to_owned()))
        .set_default(Task::WorldChat, Reply::text("Welcome back, viewer."));
    let session = Session::start(&config(), generator.clone()).unwrap();

    assert_eq!(session.chat_with_world("Hello?").await, WORLD_CHAT_FALLBACK);
    assert_eq!(session.chat_with_world("Anyone there?").await, "Welcome back, viewer.");

    // The second request carries the first audience message as history but
    // not the fallback.
    let second = &generator.requests()[1];
    let transcript = second.transcript();
    assert!(transcript.contains("Hello?"));
    assert!(!transcript.contains(WORLD_CHAT_FALLBACK));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stakes_move_pool_and_odds() {
    let generator = ScriptedGenerator::new();
    let session = Session::start(&config(), generator).unwrap();
    let end = session.now().checked_add_signed(TimeDelta::hours(1)).unwrap();

    let bet = session
        .create_bet(NewBet::new("Will Truman reach the edge?", ["Yes", "No"], end).with_id("b1"))
        .await
        .unwrap();
    assert_eq!(bet.odds["Yes"], Decimal::from(2));
    assert_eq!(bet.odds["No"], Decimal::from(2));

    let stake = Stake {
        bet_id: BetId::from("b1"),
        option: "Yes".to_owned(),
        amount: Decimal::new(1, 3),
    };
    let bet = session.place_stake(&stake).await.unwrap();
    assert_eq!(bet.pool, Decimal::new(1, 3));
    assert_eq!(bet.odds["Yes"], Decimal::ONE);
    assert_eq!(bet.odds["No"], Decimal::from(2));
    assert!(!bet.resolved);

    let bad = Stake {
        option: "Maybe".to_owned(),
        ..stake
    };
    let err = session.place_stake(&bad).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Stake(InvalidStakeError::UnknownOption { .. })
    ));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.active_bets.len(), 1);
    assert_eq!(snapshot.active_bets[0].pool, Decimal::new(1, 3));
    let bet_events = snapshot
        .recent_events
        .iter()
        .filter(|e| e.event_type == EventType::Bet)
        .count();
    assert_eq!(bet_events, 2);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn generated_bet_is_opened() {
    let generator = ScriptedGenerator::new();
    generator.set_default(
        Task::BetGeneration,
        Reply::text(
            r#"{"id": "rain-1", "question": "Will it rain on Truman only?", "options": ["Yes", "No"], "endTime": "30 minutes", "pool": "2000 USDC", "odds": {"Yes": "4.0", "No": "1.2"}}"#,
        ),
    );
    let session = Session::start(&config(), generator).unwrap();

    advance(11).await;
    let bets = session.snapshot().await.active_bets;
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].id, BetId::from("rain-1"));
    assert_eq!(bets[0].pool, Decimal::from(2_000));

    // The same id on the next tick gets a fresh one instead of a clash.
    advance(10).await;
    let bets = session.snapshot().await.active_bets;
    assert_eq!(bets.len(), 2);
    assert_ne!(bets[1].id, bets[0].id);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn eviction_task_drops_events_past_max_age() {
    let mut config = config();
    config.market.seed_bets = true;
    config.event_log.max_age_secs = 60;
    config.event_log.recent_window_secs = 3_600;
    let session = Session::start(&config, ScriptedGenerator::new()).unwrap();

    // Eviction ticks at 30, 60, 90. At 60 the opening events are exactly
    // max_age old and stay.
    advance(75).await;
    assert_eq!(bet_events(&session.snapshot().await.recent_events), 2);

    advance(5).await;
    let stake = Stake {
        bet_id: BetId::from("1"),
        option: "Yes".to_owned(),
        amount: Decimal::from(10),
    };
    session.place_stake(&stake).await.unwrap();

    advance(15).await;
    let events = session.snapshot().await.recent_events;
    assert_eq!(bet_events(&events), 1);
    assert!(events.iter().any(|e| e.description.contains("staked on \"Yes\"")));
    let now = session.now();
    assert!(
        events
            .iter()
            .all(|e| now.signed_duration_since(e.timestamp) <= TimeDelta::seconds(60))
    );

    let report = session.shutdown().await;
    assert_eq!(report.task(EVICTION_TASK).unwrap().completed, 3);
}

#[tokio::test(start_paused = true)]
async fn bets_close_on_session_time() {
    let session = Session::start(&config(), ScriptedGenerator::new()).unwrap();
    let end = session.now().checked_add_signed(TimeDelta::seconds(60)).unwrap();
    session
        .create_bet(NewBet::new("Will Truman open the door?", ["Yes", "No"], end).with_id("door"))
        .await
        .unwrap();
    let stake = Stake {
        bet_id: BetId::from("door"),
        option: "No".to_owned(),
        amount: Decimal::ONE,
    };
    session.place_stake(&stake).await.unwrap();

    advance(61).await;
    let err = session.place_stake(&stake).await.unwrap_err();
    assert!(matches!(err, TaskError::Stake(InvalidStakeError::Closed(_))));

    // Closed but unresolved bets stay on the board.
    assert_eq!(session.snapshot().await.active_bets.len(), 1);
    session.shutdown().await;
}
