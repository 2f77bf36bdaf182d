//! Tests errors reported to the foreground and the acknowledgement hand-off

use std::thread;
use std::time::{Duration, Instant};

use keyclicker::{
    Hotkey, NoticeKind, Report, Rgb, Row, RunConfig, RunMode, RunStatus,
};

mod common;
use common::{Call, Recorder};

const ONCE: RunConfig = RunConfig {
    mode: RunMode::Limited(1),
    safe_mode: true,
};

const ONCE_UNSAFE: RunConfig = RunConfig {
    mode: RunMode::Limited(1),
    safe_mode: false,
};

#[test]
fn safe_mode_block_waits_for_acknowledgement() {
    let backend = Recorder::new();
    let rows = vec![Row::new("a").delay("0"), Row::new(" ctrl "), Row::new("b")];
    let (mut engine, inbox) = common::engine(rows, &backend);

    assert_eq!(engine.start(ONCE), Ok(true));
    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::SafeModeBlocked);
    assert_eq!(notice.title(), "Safe Mode Block");
    assert_eq!(notice.message, "Action 'ctrl' is blocked in safe mode.");

    // Held until acknowledged
    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.snapshot().status, RunStatus::Running);
    assert_eq!(engine.snapshot().step, Some(1));

    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert_eq!(backend.calls(), vec![Call::Press("a".to_string())]);
}

#[test]
fn guarded_commands_are_blocked() {
    let backend = Recorder::new().with_pixel(Rgb::new(0, 0, 0));
    let (mut engine, inbox) = common::engine(vec![Row::new("waitcolor(0,0,0,1,1)")], &backend);

    assert_eq!(engine.start(ONCE), Ok(true));
    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::SafeModeBlocked);
    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
}

#[test]
fn colour_wait_times_out() {
    let backend = Recorder::new().with_pixel(Rgb::new(0, 0, 0));
    let rows = vec![Row::new("waitcolor(255,255,255,5,5)"), Row::new("a")];
    let (mut engine, inbox) = common::engine(rows, &backend);

    let start = Instant::now();
    assert_eq!(engine.start(ONCE_UNSAFE), Ok(true));
    let notice = common::next_notice(&inbox);
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(notice.kind, NoticeKind::ColorNotFound);
    assert_eq!(
        notice.message,
        "Color (255,255,255) not found at (5,5) within 0.3s.\nAutomation stopped."
    );

    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert!(backend.calls().is_empty());
}

#[test]
fn colour_wait_within_tolerance() {
    let backend = Recorder::new().with_pixel(Rgb::new(250, 5, 128));
    let rows = vec![
        Row::new("waitcolor(255,0,120,5,5)").delay("0"),
        Row::new("a").delay("0"),
    ];
    let (mut engine, _inbox) = common::engine(rows, &backend);

    assert_eq!(engine.start(ONCE_UNSAFE), Ok(true));
    assert_eq!(engine.join(), RunStatus::Completed);
    assert_eq!(backend.calls(), vec![Call::Press("a".to_string())]);
}

#[test]
fn stop_cancels_colour_wait_silently() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("waitcolor(1,2,3,4,5)")], &backend);

    assert_eq!(engine.start(ONCE_UNSAFE), Ok(true));
    common::wait_until("the colour wait", || engine.snapshot().step == Some(0));
    assert!(engine.stop());
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert!(
        common::drain(&inbox)
            .iter()
            .all(|report| !matches!(report, Report::Notice(_)))
    );
}

#[test]
fn emergency_stop_does_not_wait() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("a").delay("0.2")], &backend);

    assert_eq!(engine.start(RunConfig::default()), Ok(true));
    common::wait_until("the first press", || backend.count() >= 1);
    assert!(engine.emergency_stop());
    assert_eq!(engine.snapshot().status, RunStatus::EmergencyStopped);
    assert!(!engine.stop());

    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::EmergencyStop);
    assert!(!notice.requires_ack());
    assert_eq!(notice.message, "Automation stopped.\nPress Start to begin again.");

    assert_eq!(engine.join(), RunStatus::EmergencyStopped);
    assert_eq!(engine.snapshot().step, None);
    assert!(common::captured().contains("Emergency stop"));
}

#[test]
fn emergency_stop_releases_a_pending_notice() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("alt")], &backend);

    assert_eq!(engine.start(ONCE), Ok(true));
    assert_eq!(common::next_notice(&inbox).kind, NoticeKind::SafeModeBlocked);
    assert_eq!(engine.trigger(Hotkey::EmergencyStop, &ONCE), Ok(true));
    assert_eq!(engine.join(), RunStatus::EmergencyStopped);
}

#[test]
fn backend_failure_is_an_action_error() {
    let backend = Recorder::new().failing_on("x");
    let (mut engine, inbox) = common::engine(vec![Row::new("x")], &backend);

    assert_eq!(engine.start(ONCE), Ok(true));
    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::ActionError);
    assert_eq!(
        notice.message,
        "Error performing action 'x':\ninput backend failed: device unplugged\nAutomation stopped."
    );
    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
}

#[test]
fn malformed_command_is_an_action_error() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("click(1)")], &backend);

    assert_eq!(engine.start(ONCE), Ok(true));
    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::ActionError);
    assert_eq!(
        notice.message,
        "Error processing action 'click(1)':\n`click` requires integer arguments (x,y)\nAutomation stopped."
    );
    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert!(common::captured().contains("ERROR Row 1"));
}

#[test]
fn number_broken_mid_run() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("a").delay("0.1")], &backend);

    assert_eq!(engine.start(RunConfig::default()), Ok(true));
    common::wait_until("the first press", || backend.count() >= 1);
    engine.sequence().write().unwrap().get_mut(0).unwrap().delay = "soon".to_string();

    let notice = common::next_notice(&inbox);
    assert_eq!(notice.kind, NoticeKind::RuntimeError);
    assert_eq!(
        notice.message,
        "Invalid number in Row 1 ('soon' or '0.0'). Stopping."
    );
    inbox.acknowledge();
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert_eq!(backend.count(), 1);
}

#[test]
fn hotkeys_drive_the_engine() {
    let backend = Recorder::new();
    let (mut engine, _inbox) = common::engine(vec![Row::new("a").delay("0.05")], &backend);
    let config = RunConfig::default();

    assert_eq!(engine.trigger(Hotkey::Start, &config), Ok(true));
    assert_eq!(engine.trigger(Hotkey::Start, &config), Ok(false));
    assert_eq!(engine.trigger(Hotkey::Stop, &config), Ok(true));
    assert_eq!(engine.join(), RunStatus::Stopped);
    assert_eq!(engine.trigger(Hotkey::EmergencyStop, &config), Ok(false));
}

#[test]
fn closed_inbox_never_blocks() {
    let backend = Recorder::new();
    let (mut engine, inbox) = common::engine(vec![Row::new("tab")], &backend);
    drop(inbox);

    assert_eq!(engine.start(ONCE), Ok(true));
    assert_eq!(engine.join(), RunStatus::Stopped);
}
