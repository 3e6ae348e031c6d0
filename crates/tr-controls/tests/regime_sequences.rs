use proptest::prelude::*;
use tr_controls::{
    ControlLoop, ControlMode, PidGains, PidRegulator, RampProfile, RegulationPolicy,
    TransitionRule,
};

fn bench_loop() -> ControlLoop {
    ControlLoop::new(
        RampProfile::new(6.0, 0.05).unwrap(),
        TransitionRule::new(20.0, 0.1, 3).unwrap(),
        PidRegulator::new(PidGains::new(0.65, 0.01, 0.05).unwrap(), 12.0).unwrap(),
        RegulationPolicy::Pid,
    )
    .unwrap()
}

/// Drive the loop through `readings`, returning the mode after each tick.
fn drive(cl: &mut ControlLoop, readings: &[Option<f64>]) -> Vec<ControlMode> {
    readings
        .iter()
        .map(|&t| {
            cl.next_command(t);
            cl.observe(t);
            cl.mode()
        })
        .collect()
}

#[test]
fn switch_happens_on_fifth_tick() {
    let mut cl = bench_loop();
    let mut readings = vec![Some(25.0); 4];
    readings.extend(std::iter::repeat(Some(20.05)).take(20));

    let modes = drive(&mut cl, &readings);

    // 1-indexed tick 5 is index 4.
    assert!(modes[..4].iter().all(|m| *m == ControlMode::Ramping));
    assert!(modes[4..].iter().all(|m| *m == ControlMode::Regulating));
}

#[test]
fn switch_fires_exactly_once() {
    let mut cl = bench_loop();
    let fired: Vec<bool> = (0..30)
        .map(|_| {
            cl.next_command(Some(20.0));
            cl.observe(Some(20.0))
        })
        .collect();
    assert_eq!(fired.iter().filter(|f| **f).count(), 1);
    assert!(fired[4]);
}

#[test]
fn absent_tick_delays_switch() {
    let mut cl = bench_loop();
    let readings = [
        Some(20.0),
        None,
        Some(20.0),
        Some(20.0),
        Some(20.0),
        Some(20.0),
    ];
    let modes = drive(&mut cl, &readings);
    assert_eq!(modes[4], ControlMode::Ramping);
    assert_eq!(modes[5], ControlMode::Regulating);
}

proptest! {
    #[test]
    fn ramp_never_decreases_or_overshoots(
        readings in prop::collection::vec(prop::option::of(21.0_f64..80.0), 1..300)
    ) {
        // Every reading is out of tolerance, so the loop keeps ramping.
        let mut cl = bench_loop();
        let mut last = 0.0;
        for t in readings {
            let cmd = cl.next_command(t);
            cl.observe(t);
            prop_assert!(cmd >= last);
            prop_assert!(cmd <= 6.0);
            prop_assert_eq!(cl.mode(), ControlMode::Ramping);
            last = cmd;
        }
    }

    #[test]
    fn commands_stay_within_ceiling_after_switch(
        readings in prop::collection::vec(prop::option::of(-40.0_f64..120.0), 1..200)
    ) {
        let mut cl = bench_loop();
        drive(&mut cl, &[Some(20.0); 5]);
        prop_assert_eq!(cl.mode(), ControlMode::Regulating);
        for t in readings {
            let cmd = cl.next_command(t);
            prop_assert!((0.0..=12.0).contains(&cmd));
            prop_assert!(!cl.observe(t));
        }
    }
}
