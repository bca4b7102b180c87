//! Property tests for the cooldown state machine and stage sequences

use cryo_core::config::{Thresholds, TimeOfDay, SECONDS_PER_DAY};
use cryo_core::orchestrator::{stage1_exit_reached, Action, Orchestrator};
use cryo_core::sampler::{RecalibrationCounter, TemperatureSample};
use cryo_core::stage::stage1::{STAGE1_HOLD_LOWER_K, STAGE1_HOLD_UPPER_K, STAGE1_RAMP_STEPS};
use cryo_core::stage::{Actuator, OutputCommand, Stage1Actuator, Stage2Actuator};
use cryo_core::state::StageState;
use cryo_core::traits::OutputChannel;
use proptest::prelude::*;

fn sample(cold_head_k: f32, helium_pump_k: f32) -> TemperatureSample {
    TemperatureSample {
        cold_head_k,
        film_burner_k: 20.0,
        mainplate_k: 20.0,
        helium_pump_k,
        heat_switch_k: 20.0,
        elapsed_ms: 0,
    }
}

#[derive(Debug, Clone)]
enum Input {
    Sample(f32, f32),
    Jump,
    Stop,
    Fault,
    Start,
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        6 => (0.5f32..300.0, 0.5f32..80.0).prop_map(|(c, p)| Input::Sample(c, p)),
        1 => Just(Input::Jump),
        1 => Just(Input::Stop),
        1 => Just(Input::Fault),
        1 => Just(Input::Start),
    ]
}

/// Track which actuators the action stream leaves running
#[derive(Default)]
struct Runtime {
    stage1: bool,
    stage2: bool,
    ch1_energizable: bool,
}

impl Runtime {
    fn execute(&mut self, actions: &[Action]) {
        for action in actions {
            match *action {
                Action::StartStage(OutputChannel::PumpHeater) => {
                    assert!(!self.stage2, "stage 1 started while stage 2 runs");
                    self.stage1 = true;
                    self.ch1_energizable = true;
                }
                Action::StartStage(OutputChannel::HeatSwitch) => {
                    assert!(!self.stage1, "stage 2 started while stage 1 runs");
                    assert!(!self.ch1_energizable, "channel 1 not de-energized");
                    self.stage2 = true;
                }
                Action::CancelStage(OutputChannel::PumpHeater) => self.stage1 = false,
                Action::CancelStage(OutputChannel::HeatSwitch) => self.stage2 = false,
                Action::DeEnergize(OutputChannel::PumpHeater) => {
                    assert!(!self.stage1, "channel 1 de-energized under a live actuator");
                    self.ch1_energizable = false;
                }
                _ => {}
            }
        }
    }
}

proptest! {
    #[test]
    fn at_most_one_actuator_runs(inputs in proptest::collection::vec(input(), 1..60)) {
        let mut orchestrator = Orchestrator::new();
        let mut runtime = Runtime::default();

        runtime.execute(&orchestrator.begin_run(Thresholds::default()).unwrap());
        for input in inputs {
            let actions = match input {
                Input::Sample(c, p) => orchestrator.on_sample(&sample(c, p)),
                Input::Jump => orchestrator.jump_to_stage2().unwrap_or_default(),
                Input::Stop => orchestrator.stop(),
                Input::Fault => orchestrator.fault(),
                Input::Start => orchestrator.begin_run(Thresholds::default()).unwrap_or_default(),
            };
            runtime.execute(&actions);
            prop_assert!(!(runtime.stage1 && runtime.stage2));
            prop_assert_eq!(runtime.stage1, orchestrator.state() == StageState::Stage1Active);
            prop_assert_eq!(runtime.stage2, orchestrator.state() == StageState::Stage2Active);
        }
    }

    #[test]
    fn stage2_iff_some_sample_meets_both_thresholds(
        readings in proptest::collection::vec((0.5f32..300.0, 0.5f32..80.0), 1..80),
        cold_head_k in 1.0f32..20.0,
        pump_lower_bound_k in 20.0f32..60.0,
    ) {
        let thresholds = Thresholds { cold_head_k, pump_lower_bound_k };
        let mut orchestrator = Orchestrator::new();
        orchestrator.begin_run(thresholds).unwrap();
        // The first sample only starts Stage 1
        orchestrator.on_sample(&sample(300.0, 0.5));

        let expected = readings
            .iter()
            .any(|&(c, p)| stage1_exit_reached(&thresholds, &sample(c, p)));
        for (c, p) in readings {
            orchestrator.on_sample(&sample(c, p));
        }
        prop_assert_eq!(orchestrator.state() == StageState::Stage2Active, expected);
    }

    #[test]
    fn recalibration_fires_once_per_seven_identical(value in 1.0f32..300.0, extra in 0usize..20) {
        let mut counter = RecalibrationCounter::new();
        let readings = 7 + extra;
        let fired = (0..readings).filter(|_| counter.observe(value)).count();
        // First reading seeds the counter; each fire needs six repeats after it
        prop_assert_eq!(fired, (readings - 1) / 6);

        counter.observe(value + 1.0);
        prop_assert_eq!(counter.repeat_count(), 0);
    }

    #[test]
    fn stage1_hold_has_no_chatter(temps in proptest::collection::vec(40.0f32..55.0, 1..200)) {
        let mut actuator = Stage1Actuator::new();
        for _ in 0..STAGE1_RAMP_STEPS {
            actuator.tick(None);
        }

        let mut on = true;
        let mut seen_upper = false;
        for k in temps {
            for command in actuator.tick(Some(k)) {
                match command {
                    OutputCommand::SetEnabled(true) => {
                        prop_assert!(!on);
                        prop_assert!(seen_upper);
                        prop_assert!(k < STAGE1_HOLD_LOWER_K);
                        on = true;
                    }
                    OutputCommand::SetEnabled(false) => {
                        prop_assert!(on);
                        prop_assert!(k > STAGE1_HOLD_UPPER_K);
                        on = false;
                    }
                    OutputCommand::SetVoltage(v) => prop_assert!(v <= 2.5),
                }
            }
            if k > STAGE1_HOLD_UPPER_K {
                seen_upper = true;
            }
        }
    }

    #[test]
    fn ramps_never_overshoot(ticks in 1usize..800) {
        let mut stage1 = Stage1Actuator::new();
        let mut stage2 = Stage2Actuator::new();
        for _ in 0..ticks {
            for command in stage1.tick(None) {
                if let OutputCommand::SetVoltage(v) = command {
                    prop_assert!((0.0..=25.0).contains(&v));
                }
            }
            for command in stage2.tick(None) {
                if let OutputCommand::SetVoltage(v) = command {
                    prop_assert!((0.0..=6.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn schedule_delay_is_within_a_day(now in 0u32..SECONDS_PER_DAY, target in 0u32..SECONDS_PER_DAY) {
        let now = TimeOfDay::from_seconds(now).unwrap();
        let target = TimeOfDay::from_seconds(target).unwrap();
        let delay = now.seconds_until(target);
        prop_assert!(delay < SECONDS_PER_DAY);
        prop_assert_eq!((now.seconds() + delay) % SECONDS_PER_DAY, target.seconds());
    }
}
