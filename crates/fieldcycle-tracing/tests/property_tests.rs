//! Property tests for event classification and metrics

use fieldcycle_tracing::prelude::*;
use proptest::prelude::*;

fn any_cycle_event() -> impl Strategy<Value = CycleTraceEvent> {
    prop_oneof![
        (any::<u64>(), any::<u16>(), any::<u16>()).prop_map(|(cycle, working_counter, expected)| {
            CycleTraceEvent::DomainDegraded {
                cycle,
                working_counter,
                expected,
            }
        }),
        (any::<u64>(), any::<u16>()).prop_map(|(cycle, working_counter)| {
            CycleTraceEvent::DomainRecovered {
                cycle,
                working_counter,
            }
        }),
        (any::<u64>(), any::<u64>(), any::<i64>()).prop_map(|(cycle, hardware_ns, time_base_ns)| {
            CycleTraceEvent::ClockBackwardJump {
                cycle,
                hardware_ns,
                time_base_ns,
            }
        }),
        (any::<u64>(), any::<i64>()).prop_map(|(cycle, adjustment_ns)| {
            CycleTraceEvent::DriftSaturated {
                cycle,
                adjustment_ns,
                clamp_ns: 1000,
            }
        }),
        (any::<u64>(), any::<u64>()).prop_map(|(cycle, exec_ns)| {
            CycleTraceEvent::DeadlineOverrun {
                cycle,
                exec_ns,
                period_ns: 1_000_000,
            }
        }),
        any::<u64>().prop_map(|cycle| CycleTraceEvent::SnapshotDropped { cycle }),
    ]
}

proptest! {
    #[test]
    fn test_cycle_accessor_matches_payload(event in any_cycle_event()) {
        let shown = event.to_string();
        let needle = format!("cycle={}", event.cycle());
        prop_assert!(shown.contains(&needle));
    }

    #[test]
    fn test_category_counters_sum_to_total(events in prop::collection::vec(any_cycle_event(), 0..64)) {
        let sink = RecordingSink::new();
        for event in &events {
            sink.emit_cycle_event(*event);
        }
        let m = sink.metrics();
        prop_assert_eq!(m.cycle_events_emitted, events.len() as u64);
        prop_assert_eq!(
            m.health_events + m.clock_anomalies + m.deadline_overruns + m.snapshots_dropped,
            events.len() as u64
        );
    }
}
