//! Integration tests for the scheduler crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use fieldcycle_scheduler::{
    AbsoluteScheduler, ClockSource, CycleBody, CycleContext, CycleScheduler, ExitReason, RTError,
    RTSetup, SchedulerConfig, SchedulerError, SchedulingPolicy, WindowStatistics,
};

const PERIOD_NS: u64 = 500_000;

fn inherit_config() -> SchedulerConfig {
    SchedulerConfig::new(PERIOD_NS)
        .with_setup(RTSetup::inherit())
        .with_thread_name("fieldcycle-test")
}

fn wait_for_cycles<B: CycleBody>(worker: &fieldcycle_scheduler::CycleWorker<B>, n: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while worker.cycles_completed() < n {
        assert!(Instant::now() < deadline, "worker did not reach {} cycles", n);
        thread::sleep(Duration::from_millis(1));
    }
}

#[derive(Default)]
struct WakeupLog {
    wakeups: Vec<u64>,
    overruns: u64,
}

impl CycleBody for WakeupLog {
    fn run_cycle(&mut self, ctx: &CycleContext) {
        self.wakeups.push(ctx.wakeup_ns);
    }

    fn on_overrun(&mut self, _ctx: &CycleContext, _exec_ns: u64) {
        self.overruns += 1;
    }
}

#[test]
fn test_scheduler_basic_timing() {
    let mut scheduler = AbsoluteScheduler::new(PERIOD_NS, ClockSource::Monotonic);
    let start = Instant::now();

    for expected in 0..5 {
        match scheduler.wait_for_tick() {
            Ok(ctx) => {
                assert_eq!(ctx.cycle, expected);
                assert!(ctx.actual_ns >= ctx.wakeup_ns);
            }
            Err(RTError::TimingViolation) => return,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert!(start.elapsed() >= Duration::from_nanos(4 * PERIOD_NS));
}

#[test]
fn test_wakeups_are_exact_multiples_of_period() {
    let worker = match CycleScheduler::configure(inherit_config())
        .and_then(|s| s.run(WakeupLog::default()).map_err(|l| l.error))
    {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };
    wait_for_cycles(&worker, 10);
    worker.request_stop();

    let exit = match worker.join() {
        Ok(exit) => exit,
        Err(e) => panic!("join failed: {}", e),
    };
    assert_eq!(exit.reason, ExitReason::Stopped);
    assert!(exit.body.wakeups.len() >= 10);
    for pair in exit.body.wakeups.windows(2) {
        assert_eq!(pair[1] - pair[0], PERIOD_NS);
    }
}

/// Sleeps through `slow_cycle`, recording every wakeup.
struct SlowCycle {
    slow_cycle: u64,
    log: WakeupLog,
}

impl CycleBody for SlowCycle {
    fn run_cycle(&mut self, ctx: &CycleContext) {
        self.log.run_cycle(ctx);
        if ctx.cycle == self.slow_cycle {
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn on_overrun(&mut self, ctx: &CycleContext, exec_ns: u64) {
        self.log.on_overrun(ctx, exec_ns);
    }
}

#[test]
fn test_overrun_is_reported_and_loop_continues() {
    let config = SchedulerConfig::new(200_000).with_setup(RTSetup::inherit());
    let body = SlowCycle {
        slow_cycle: 2,
        log: WakeupLog::default(),
    };

    let worker = match CycleScheduler::configure(config).and_then(|s| s.run(body).map_err(|l| l.error)) {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };

    wait_for_cycles(&worker, 6);
    worker.request_stop();
    let exit = match worker.join() {
        Ok(exit) => exit,
        Err(e) => panic!("join failed: {}", e),
    };

    assert!(exit.body.log.overruns >= 1);
    assert!(exit.statistics.overruns >= 1);
    assert!(exit.statistics.cycles >= 6);

    // Late cycles catch up on the original grid; no wakeup is skipped or shifted.
    let wakeups = &exit.body.log.wakeups;
    assert!(wakeups.len() >= 6);
    for pair in wakeups.windows(2) {
        assert_eq!(pair[1] - pair[0], 200_000);
    }
}

#[derive(Default)]
struct WindowLog {
    windows: Vec<WindowStatistics>,
}

impl CycleBody for WindowLog {
    fn run_cycle(&mut self, _ctx: &CycleContext) {}

    fn on_window(&mut self, ctx: &CycleContext, window: &WindowStatistics) {
        assert_eq!((ctx.cycle + 1) % 5, 0);
        self.windows.push(*window);
    }
}

#[test]
fn test_statistics_windows_drained_and_reset() {
    let config = inherit_config().with_stats_window(5);
    let worker = match CycleScheduler::configure(config)
        .and_then(|s| s.run(WindowLog::default()).map_err(|l| l.error))
    {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };
    wait_for_cycles(&worker, 22);
    worker.request_stop();

    let exit = match worker.join() {
        Ok(exit) => exit,
        Err(e) => panic!("join failed: {}", e),
    };

    let windows = &exit.body.windows;
    assert_eq!(windows.len() as u64, exit.statistics.cycles / 5);
    assert!(windows.len() >= 4);
    for window in windows {
        assert_eq!(window.exec.samples, 5);
        assert_eq!(window.latency.samples, 5);
    }
    // Only the first window lacks a period sample for its first cycle.
    assert_eq!(windows.first().map(|w| w.period.samples), Some(4));
    assert!(windows.iter().skip(1).all(|w| w.period.samples == 5));
    assert_eq!(exit.statistics.window().exec.samples, exit.statistics.cycles % 5);
    assert_eq!(exit.statistics.total.exec.samples, exit.statistics.cycles);
}

#[test]
fn test_stop_via_handle_ends_loop() {
    let worker = match CycleScheduler::configure(inherit_config())
        .and_then(|s| s.run(WakeupLog::default()).map_err(|l| l.error))
    {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };
    let stop = worker.stop_handle();
    stop.request_stop();
    stop.request_stop();

    let exit = match worker.join() {
        Ok(exit) => exit,
        Err(e) => panic!("join failed: {}", e),
    };
    assert_eq!(exit.reason, ExitReason::Stopped);
    assert_eq!(exit.statistics.cycles, exit.body.wakeups.len() as u64);
}

#[test]
fn test_run_duration_bounds_the_run() {
    let config = inherit_config().with_run_duration(Duration::from_millis(10));
    let worker = match CycleScheduler::configure(config)
        .and_then(|s| s.run(WakeupLog::default()).map_err(|l| l.error))
    {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };

    let exit = match worker.join() {
        Ok(exit) => exit,
        Err(e) => panic!("join failed: {}", e),
    };
    assert_eq!(exit.reason, ExitReason::DurationElapsed);
    assert!(!exit.body.wakeups.is_empty());
}

#[test]
fn test_invalid_policy_rejected_before_launch() {
    let config = SchedulerConfig::new(PERIOD_NS).with_setup(
        RTSetup::inherit().with_policy(SchedulingPolicy::FixedPriority { priority: 0 }),
    );
    assert!(matches!(
        CycleScheduler::configure(config),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[test]
fn test_rejected_setup_returns_body() {
    // A deadline budget is refused without CAP_SYS_NICE and everywhere off Linux.
    let setup = RTSetup::inherit().with_policy(SchedulingPolicy::DeadlineBased {
        runtime_ns: 100_000,
        deadline_ns: 500_000,
        period_ns: 500_000,
    });
    let scheduler = match CycleScheduler::configure(SchedulerConfig::new(PERIOD_NS).with_setup(setup)) {
        Ok(s) => s,
        Err(e) => panic!("configure failed: {}", e),
    };

    match scheduler.run(WakeupLog::default()) {
        Ok(worker) => {
            // Privileged environment: the policy was accepted.
            worker.request_stop();
            assert!(worker.join().is_ok());
        }
        Err(launch) => {
            assert!(launch.error.is_setup_rejection(), "{}", launch.error);
            let body = match launch.body {
                Some(body) => body,
                None => panic!("body was not returned"),
            };
            assert!(body.wakeups.is_empty());
        }
    }
}

#[test]
fn test_dropping_worker_stops_it() {
    let counter = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&counter);
    let worker = match CycleScheduler::configure(inherit_config()).and_then(|s| {
        s.run(move |_: &CycleContext| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .map_err(|l| l.error)
    }) {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };
    wait_for_cycles(&worker, 3);
    drop(worker);

    let after_drop = counter.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(5));
    assert_eq!(counter.load(Ordering::Relaxed), after_drop);
}

#[test]
fn test_panicking_body_reported_on_join() {
    let worker = match CycleScheduler::configure(inherit_config()).and_then(|s| {
        s.run(|ctx: &CycleContext| {
            if ctx.cycle == 1 {
                panic!("cycle body failure");
            }
        })
        .map_err(|l| l.error)
    }) {
        Ok(worker) => worker,
        Err(e) => panic!("launch failed: {}", e),
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while !worker.is_finished() {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(worker.join(), Err(SchedulerError::WorkerPanicked)));
}
