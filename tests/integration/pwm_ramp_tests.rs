//! PWM ramp actuator against a recording PWM channel.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use edge_agent::drivers::ActuatorState;
use edge_agent::drivers::pwm_ramp::{MIN_RAMP_STEPS, PwmRampActuator, RampPhase, RampProfile};
use edge_agent::error::HardwareIoError;

use crate::mock_hw::{PwmCall, PwmProbe, RecordingPwm, ShortSleeper, WAIT, wait_until};

fn ramp() -> (PwmRampActuator, PwmProbe, Arc<ShortSleeper>) {
    let (pwm, probe) = RecordingPwm::new();
    let sleeper = ShortSleeper::new();
    let actuator = PwmRampActuator::new(Box::new(pwm), RampProfile::default(), sleeper.clone());
    (actuator, probe, sleeper)
}

fn ends_wound_down(probe: &PwmProbe) -> bool {
    probe.calls().ends_with(&[PwmCall::Duty(0), PwmCall::Stop])
}

#[test]
fn ramp_sweeps_up_then_down() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 28));
    pwm.stop().unwrap();

    let duties = probe.duties();
    let profile = RampProfile::default();
    let up: Vec<u16> = profile.ascent().collect();
    let down: Vec<u16> = profile.descent().collect();
    assert_eq!(down.len(), 8);
    assert_eq!(&duties[..10], &up[..]);
    assert_eq!(&duties[10..18], &down[..]);
    assert_eq!(&duties[18..28], &up[..]);
    assert_eq!(up[0], 100);
    assert_eq!(up[9], 900);
}

#[test]
fn peak_and_floor_are_never_repeated() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 40));
    pwm.stop().unwrap();

    let duties = probe.duties();
    let (_, ramp) = duties.split_last().unwrap();
    assert!(ramp.windows(2).all(|w| w[0] != w[1]));
}

#[test]
fn zero_step_profile_still_ramps_and_stops() {
    let (line, probe) = RecordingPwm::new();
    let profile = RampProfile {
        steps: 0,
        ..RampProfile::default()
    };
    let pwm = PwmRampActuator::new(Box::new(line), profile, ShortSleeper::new());
    assert_eq!(pwm.profile().steps, MIN_RAMP_STEPS);

    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 4));
    let stopper = thread::spawn(move || {
        let res = pwm.stop();
        (res, pwm)
    });
    assert!(wait_until(WAIT, || stopper.is_finished()), "stop never returned");
    let (res, pwm) = stopper.join().unwrap();
    res.unwrap();

    assert_eq!(pwm.phase(), RampPhase::Stopped);
    assert!(ends_wound_down(&probe));
    let duties = probe.duties();
    let (_, ramp) = duties.split_last().unwrap();
    assert!(ramp.iter().all(|d| [100, 900].contains(d)));
}

#[test]
fn sleeps_one_step_delay_between_writes() {
    let (pwm, probe, sleeper) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 3));
    pwm.stop().unwrap();
    assert!(
        sleeper
            .requested()
            .iter()
            .all(|d| *d == Duration::from_millis(100))
    );
}

#[test]
fn stop_returns_only_after_duty_is_zero() {
    let (pwm, probe, _) = ramp();
    pwm.change_state(ActuatorState::On).unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 5));
    assert_eq!(pwm.current_state(), ActuatorState::On);

    pwm.change_state(ActuatorState::Off).unwrap();

    assert!(ends_wound_down(&probe));
    assert_eq!(pwm.duty_permille(), 0);
    assert_eq!(pwm.phase(), RampPhase::Stopped);
    assert_eq!(pwm.current_state(), ActuatorState::Off);
}

#[test]
fn every_ramp_duty_stays_within_profile() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 45));
    pwm.stop().unwrap();

    let duties = probe.duties();
    let (last, ramp) = duties.split_last().unwrap();
    assert_eq!(*last, 0);
    assert!(ramp.iter().all(|d| (100..=900).contains(d)));
}

#[test]
fn start_is_idempotent() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 3));
    pwm.stop().unwrap();
    assert_eq!(probe.count(PwmCall::Start), 1);
    assert_eq!(probe.count(PwmCall::Stop), 1);
}

#[test]
fn stop_without_start_is_noop() {
    let (pwm, probe, _) = ramp();
    pwm.stop().unwrap();
    assert!(probe.calls().is_empty());
    assert!(!pwm.is_started());
}

#[test]
fn restart_begins_from_the_floor() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 4));
    pwm.stop().unwrap();
    let first_run = probe.calls().len();

    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.calls().len() >= first_run + 3));
    pwm.stop().unwrap();

    let calls = probe.calls();
    assert_eq!(calls[first_run], PwmCall::Start);
    assert_eq!(calls[first_run + 1], PwmCall::Duty(100));
    assert_eq!(probe.count(PwmCall::Start), 2);
    assert!(ends_wound_down(&probe));
}

#[test]
fn write_failure_leaves_actuator_stopped_and_restartable() {
    let (pwm, probe, _) = ramp();
    probe.fail_duty_writes_after(Some(5));
    pwm.start().unwrap();

    assert!(wait_until(WAIT, || !pwm.is_started()));
    assert_eq!(pwm.current_state(), ActuatorState::Off);
    assert_eq!(probe.duties().len(), 5);
    assert_eq!(pwm.stop(), Err(HardwareIoError::PwmWriteFailed));
    assert_eq!(pwm.stop(), Ok(()));

    probe.fail_duty_writes_after(None);
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 8));
    assert!(pwm.is_started());
    pwm.stop().unwrap();
    assert!(ends_wound_down(&probe));
}

#[test]
fn grace_period_is_slept_before_stop() {
    let (pwm, probe, sleeper) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 2));
    pwm.stop_with_grace(Duration::from_millis(30)).unwrap();
    assert!(sleeper.requested().contains(&Duration::from_millis(30)));
    assert!(ends_wound_down(&probe));
}

#[test]
fn drop_winds_the_ramp_down() {
    let (pwm, probe, _) = ramp();
    pwm.start().unwrap();
    assert!(wait_until(WAIT, || probe.duties().len() >= 2));
    drop(pwm);
    assert!(ends_wound_down(&probe));
}

#[test]
fn concurrent_start_stop_settles_stopped() {
    let (pwm, probe, _) = ramp();
    let pwm = Arc::new(pwm);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pwm = Arc::clone(&pwm);
            thread::spawn(move || {
                for _ in 0..5 {
                    pwm.start().unwrap();
                    thread::sleep(Duration::from_millis(2));
                    pwm.stop().unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(pwm.phase(), RampPhase::Stopped);
    assert!(ends_wound_down(&probe));
    assert_eq!(probe.count(PwmCall::Start), probe.count(PwmCall::Stop));
}
