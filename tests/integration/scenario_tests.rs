//! End-to-end runs of each profile built from a config file, with time
//! advanced in seconds through the rig.

use actuatord::config::Config;
use actuatord::controller::ControlPolicy;

use crate::mock_hw::Rig;

const COMMAND: &str = "foxyhamster/feeds/outlet-set";
const STATE: &str = "foxyhamster/feeds/outlet-state";

fn policy_from(profile: &str, hardware: &str) -> Box<dyn ControlPolicy> {
    let content = format!(
        "[mqtt]\nhost = \"localhost\"\n\n[profile]\n{profile}\n\n[hardware]\n{hardware}\n"
    );
    let config = Config::from_toml_str(&content).unwrap();
    config.validate().unwrap();
    config.profile.build_policy()
}

fn motion_policy(extra: &str) -> Box<dyn ControlPolicy> {
    policy_from(
        &format!(
            "kind = \"motion\"\ncommand_topic = \"{COMMAND}\"\nstate_topic = \"{STATE}\"\n{extra}"
        ),
        "motion_pin = 17\nrelay = { pin = 27 }",
    )
}

fn settled(policy: Box<dyn ControlPolicy>) -> Rig {
    let mut rig = Rig::new(policy);
    rig.set_motion(false);
    rig.cycle_at(0);
    rig.published();
    rig
}

#[test]
fn motion_switches_on_and_times_out() {
    let mut rig = settled(motion_policy("timeout_secs = 300"));

    rig.set_motion(true);
    rig.cycle_at(1);
    assert!(rig.is_on(0));
    assert_eq!(rig.published(), vec![(STATE.to_string(), "on".to_string())]);

    rig.set_motion(false);
    rig.cycle_at(2);
    rig.cycle_at(300);
    assert!(rig.is_on(0));
    assert!(rig.published().is_empty());

    rig.cycle_at(302);
    assert!(!rig.is_on(0));
    assert_eq!(rig.published(), vec![(STATE.to_string(), "off".to_string())]);
    assert_eq!(rig.writes(0), vec![false, true, false]);
}

#[test]
fn new_motion_extends_the_window() {
    let mut rig = settled(motion_policy("timeout_secs = 300"));

    rig.set_motion(true);
    rig.cycle_at(1);
    rig.set_motion(false);
    rig.cycle_at(100);
    rig.set_motion(true);
    rig.cycle_at(200);
    rig.set_motion(false);
    rig.cycle_at(201);

    rig.cycle_at(450);
    assert!(rig.is_on(0));
    rig.cycle_at(500);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["on", "off"]);
}

#[test]
fn remote_off_cancels_pending_timeout() {
    let mut rig = settled(motion_policy("timeout_secs = 300"));

    rig.set_motion(true);
    rig.cycle_at(1);
    rig.published();

    rig.command(COMMAND, "OFF");
    rig.cycle_at(50);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["off"]);

    // Motion stays high, so no new edge; the old deadline must not revive it.
    for secs in [100, 301, 400] {
        rig.cycle_at(secs);
    }
    assert!(!rig.is_on(0));
    assert!(rig.published().is_empty());
    let state = rig.control().policy().outputs()[0].state();
    assert_eq!(state.last_trigger_deadline, None);
}

#[test]
fn remote_on_retriggers_window_by_default() {
    let mut rig = settled(motion_policy("timeout_secs = 60"));

    rig.command(COMMAND, "on");
    rig.cycle_at(10);
    assert!(rig.is_on(0));

    rig.cycle_at(69);
    assert!(rig.is_on(0));
    rig.cycle_at(70);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["on", "off"]);
}

#[test]
fn remote_on_latches_when_configured() {
    let mut rig = settled(motion_policy("timeout_secs = 60\nremote_on = \"latch\""));

    rig.command(COMMAND, "on");
    rig.cycle_at(10);
    rig.set_motion(true);
    rig.cycle_at(20);
    rig.set_motion(false);
    rig.cycle_at(1000);
    assert!(rig.is_on(0));

    rig.command(COMMAND, "off");
    rig.cycle_at(1001);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["on", "off"]);
}

#[test]
fn held_motion_keeps_actuator_on_when_configured() {
    let mut rig = settled(motion_policy("timeout_secs = 60\nhold_while_active = true"));

    rig.set_motion(true);
    for secs in (1..=200).step_by(30) {
        rig.cycle_at(secs);
    }
    assert!(rig.is_on(0));

    // Last re-arm happened at 181.
    rig.set_motion(false);
    rig.cycle_at(230);
    assert!(rig.is_on(0));
    rig.cycle_at(241);
    assert!(!rig.is_on(0));
}

#[test]
fn custom_vocabulary_is_published() {
    let mut rig = Rig::new(motion_policy(
        "[profile.payloads]\non = \"ON\"\noff = \"OFF\"",
    ));
    rig.set_motion(false);
    rig.cycle_at(0);
    rig.set_motion(true);
    rig.cycle_at(1);

    assert_eq!(rig.payloads(), vec!["OFF", "ON"]);
}

#[test]
fn climate_above_both_thresholds_runs_fan() {
    let policy = policy_from(
        "kind = \"threshold\"\ntemperature_threshold = 28.0\nhumidity_threshold = 80.0\nstate_topic = \"home/fan\"",
        "relay = { pin = 27 }\nclimate = {}",
    );
    let mut rig = Rig::new(policy);

    rig.cycle_at(0);
    assert_eq!(rig.payloads(), vec!["off"]);

    rig.set_climate(29.0, 85.0);
    rig.cycle_at(1);
    assert!(rig.is_on(0));
    rig.cycle_at(2);
    assert_eq!(rig.published(), vec![("home/fan".to_string(), "on".to_string())]);

    rig.set_climate(27.0, 85.0);
    rig.cycle_at(3);
    rig.cycle_at(4);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["off"]);
    assert_eq!(rig.writes(0), vec![false, true, false]);
}

#[test]
fn status_lines_mirror_sensors() {
    let policy = policy_from(
        "kind = \"status\"\noccupancy_topic = \"home/occupied\"\ndoor_topic = \"home/door\"",
        "motion_pin = 17\ndoor_pin = 22",
    );
    let mut rig = Rig::new(policy);

    rig.set_motion(false);
    rig.set_door(false);
    rig.cycle_at(0);
    assert_eq!(
        rig.published(),
        vec![
            ("home/occupied".to_string(), "no".to_string()),
            ("home/door".to_string(), "CLOSED".to_string()),
        ]
    );

    rig.set_door(true);
    rig.cycle_at(1);
    assert_eq!(
        rig.published(),
        vec![("home/door".to_string(), "OPEN".to_string())]
    );
    assert_eq!(rig.writes(1), vec![false, true]);
    assert_eq!(rig.writes(0), vec![false]);

    rig.set_motion(true);
    rig.cycle_at(2);
    assert_eq!(rig.payloads(), vec!["yes"]);
}

#[test]
fn remote_override_holds_until_next_measurement() {
    let policy = policy_from(
        "kind = \"threshold\"\ntemperature_threshold = 28.0\nhumidity_threshold = 80.0\nstate_topic = \"home/fan\"\ncommand_topic = \"home/fan/set\"",
        "relay = { pin = 27 }\nclimate = {}",
    );
    let mut rig = Rig::new(policy);
    rig.set_climate(20.0, 40.0);
    rig.cycle_at(0);
    assert_eq!(rig.payloads(), vec!["off"]);

    rig.command("home/fan/set", "on");
    rig.cycle_at(1);
    // Cycles without a new measurement keep the override.
    rig.cycle_at(2);
    rig.cycle_at(3);
    assert!(rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["on"]);
    assert_eq!(rig.writes(0), vec![false, true]);

    rig.set_climate(20.0, 40.0);
    rig.cycle_at(4);
    assert!(!rig.is_on(0));
    assert_eq!(rig.payloads(), vec!["off"]);
    assert_eq!(rig.writes(0), vec![false, true, false]);
}
