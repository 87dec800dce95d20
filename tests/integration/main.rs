//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below drives a full [`ControlLoop`] against mock sensors,
//! mock actuators and in-memory channel queues. Time is synthetic: every
//! cycle is handed an explicit `Instant`, so no test sleeps.
//!
//! [`ControlLoop`]: actuatord::controller::ControlLoop

mod control_loop_tests;
mod mock_hw;
mod scenario_tests;
