//! Cycle-level behaviour of the control loop: ordering inside a cycle,
//! publication suppression, channel resync and failure retries.

use std::time::Duration;

use actuatord::controller::{ActuatorController, MotionSettings, Vocabulary};

use crate::mock_hw::Rig;

const COMMAND: &str = "foxyhamster/feeds/outlet-set";
const STATE: &str = "foxyhamster/feeds/outlet-state";

fn motion_rig() -> Rig {
    Rig::new(Box::new(ActuatorController::new(
        MotionSettings::default(),
        COMMAND,
        STATE,
        Vocabulary::default(),
    )))
}

fn settled_motion_rig() -> Rig {
    let mut rig = motion_rig();
    rig.set_motion(false);
    rig.cycle_at(0);
    rig.published();
    rig
}

#[test]
fn startup_asserts_off_and_publishes_it() {
    let mut rig = motion_rig();
    rig.set_motion(false);
    rig.cycle_at(0);

    assert_eq!(rig.writes(0), vec![false]);
    assert_eq!(rig.published(), vec![(STATE.to_string(), "off".to_string())]);

    rig.cycle_at(1);
    assert_eq!(rig.writes(0), vec![false]);
    assert!(rig.published().is_empty());
}

#[test]
fn motion_high_at_startup_is_baseline_not_trigger() {
    let mut rig = motion_rig();
    rig.set_motion(true);
    rig.cycle_at(0);

    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["off"]);
}

#[test]
fn unchanged_state_is_not_republished() {
    let mut rig = settled_motion_rig();
    rig.set_motion(true);
    rig.cycle_at(1);
    assert_eq!(rig.payloads(), vec!["on"]);

    for secs in 2..10 {
        rig.cycle_at(secs);
    }
    assert!(rig.published().is_empty());
    assert_eq!(rig.writes(0), vec![false, true]);
}

#[test]
fn remote_off_wins_over_motion_in_same_cycle() {
    let mut rig = settled_motion_rig();
    rig.set_motion(true);
    rig.command(COMMAND, "off");
    rig.cycle_at(1);

    assert!(!rig.is_on(0));
    assert_eq!(rig.writes(0).last(), Some(&false));
    // The remote side already holds "off".
    assert!(rig.published().is_empty());
}

#[test]
fn later_motion_overrides_remote_off() {
    let mut rig = settled_motion_rig();
    rig.command(COMMAND, "OFF");
    rig.cycle_at(1);
    rig.set_motion(true);
    rig.cycle_at(2);

    assert!(rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["on"]);
}

#[test]
fn foreign_topic_and_unknown_payload_are_ignored() {
    let mut rig = settled_motion_rig();
    rig.command("someone/else", "on");
    rig.command(COMMAND, "toggle");
    rig.cycle_at(1);

    assert!(!rig.is_on(0));
    assert!(rig.published().is_empty());
    assert_eq!(rig.control().stats().commands, 2);
}

#[test]
fn reconnect_republishes_current_state_once() {
    let mut rig = settled_motion_rig();
    rig.set_motion(true);
    rig.cycle_at(1);
    assert_eq!(rig.payloads(), vec!["on"]);

    rig.request_resync();
    rig.cycle_at(2);
    assert_eq!(rig.published(), vec![(STATE.to_string(), "on".to_string())]);

    rig.cycle_at(3);
    assert!(rig.published().is_empty());
    assert_eq!(rig.writes(0), vec![false, true]);
}

#[test]
fn full_outbound_queue_retries_next_cycle() {
    let mut rig = Rig::with_capacity(
        Box::new(ActuatorController::new(
            MotionSettings::default(),
            COMMAND,
            STATE,
            Vocabulary::default(),
        )),
        1,
    );
    rig.set_motion(false);
    rig.cycle_at(0);

    // "off" still sits in the queue, so "on" cannot be handed over.
    rig.set_motion(true);
    rig.cycle_at(1);
    assert!(rig.is_on(0));
    assert_eq!(rig.control().stats().publish_failures, 1);
    assert_eq!(rig.payloads(), vec!["off"]);

    rig.cycle_at(2);
    assert_eq!(rig.payloads(), vec!["on"]);
    assert_eq!(rig.control().stats().publications, 2);
}

#[test]
fn failed_write_withholds_publication_until_it_lands() {
    let mut rig = settled_motion_rig();
    rig.set_failing(0, true);
    rig.set_motion(true);
    rig.cycle_at(1);

    assert!(rig.is_on(0));
    assert!(rig.published().is_empty());
    assert_eq!(rig.control().stats().write_failures, 1);

    rig.set_failing(0, false);
    rig.cycle_at(2);
    assert_eq!(rig.writes(0), vec![false, true]);
    assert_eq!(rig.payloads(), vec!["on"]);
}

#[test]
fn closed_inbound_queue_does_not_stop_cycles() {
    let mut rig = settled_motion_rig();
    let (dead_tx, _) = tokio::sync::mpsc::channel(1);
    rig.to_loop = dead_tx;

    rig.set_motion(true);
    rig.cycle_at(1);
    assert!(rig.is_on(0));
    assert_eq!(rig.control().stats().cycles, 2);
}

#[test]
fn deadline_is_visible_in_actuator_state() {
    let mut rig = settled_motion_rig();
    rig.set_motion(true);
    rig.cycle_at(5);

    let state = rig.control().policy().outputs()[0].state();
    assert_eq!(
        state.last_trigger_deadline,
        Some(rig.start + Duration::from_secs(305))
    );
    assert_eq!(state.last_published, Some(true));
}

#[test]
fn publication_lost_after_handover_is_resent() {
    let mut rig = settled_motion_rig();
    rig.set_motion(true);
    rig.cycle_at(1);

    // The channel task took "on" off the queue but the client refused it.
    assert_eq!(rig.payloads(), vec!["on"]);
    rig.request_resync();

    rig.cycle_at(2);
    assert_eq!(rig.published(), vec![(STATE.to_string(), "on".to_string())]);
    assert_eq!(rig.control().stats().resyncs, 1);
}

#[test]
fn resync_requests_between_cycles_coalesce() {
    let mut rig = settled_motion_rig();
    rig.request_resync();
    rig.request_resync();
    rig.request_resync();

    rig.cycle_at(1);
    assert_eq!(rig.payloads(), vec!["off"]);
    rig.cycle_at(2);
    assert!(rig.published().is_empty());
    assert_eq!(rig.control().stats().resyncs, 1);
}

#[test]
fn resync_survives_full_inbox() {
    let mut rig = settled_motion_rig();
    for _ in 0..16 {
        rig.command("someone/else", "noise");
    }
    assert!(rig
        .to_loop
        .try_send(actuatord::mqtt::ChannelEvent::Disconnected("late".to_string()))
        .is_err());
    rig.request_resync();

    rig.cycle_at(1);
    assert_eq!(rig.payloads(), vec!["off"]);
}
