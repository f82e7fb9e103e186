//! Sample topologies and configurations.

use fieldcycle_engine::{CycleConfig, DeviceConfig, PdoRange, Topology};
use fieldcycle_errors::ValidationError;

/// Two-device configuration document, unprivileged, null sink.
pub const SAMPLE_YAML: &str = r#"
cycle:
  period_ns: 1000000
  policy: { kind: inherit }
  lock_memory: false
  filter_window: 4
  drift_clamp_ns: 1000
devices:
  - name: coupler
    position: 0
    vendor_id: 0x00000002
    product_code: 0x044c2c52
    input: { offset: 0, len: 4 }
    output: { offset: 4, len: 4 }
  - name: drive
    position: 1
    vendor_id: 0x0000034e
    product_code: 0x00000001
    input: { offset: 8, len: 6 }
    output: { offset: 14, len: 2 }
observability:
  sink: "null"
"#;

/// Device at bus `position` with inputs at `base` and outputs right after.
pub fn io_device(name: &str, position: u16, base: usize, input_len: usize, output_len: usize) -> DeviceConfig {
    DeviceConfig {
        name: name.to_string(),
        alias: 0,
        position,
        vendor_id: 0x0000_034e,
        product_code: 0x0000_0001,
        assign_activate: 0x0300,
        sync0_shift_ns: 0,
        input: PdoRange::new(base, input_len),
        output: PdoRange::new(base + input_len, output_len),
    }
}

/// The topology of [`SAMPLE_YAML`]: 16 domain bytes.
///
/// # Errors
///
/// Never in practice; propagated from [`Topology::new`].
pub fn sample_topology() -> Result<Topology, ValidationError> {
    Topology::new(vec![
        io_device("coupler", 0, 0, 4, 4),
        io_device("drive", 1, 8, 6, 2),
    ])
}

/// 1 kHz, inherited policy, no memory lock, window 4, clamp 1000 ns.
pub fn unprivileged_config() -> CycleConfig {
    let mut config = CycleConfig::unprivileged(1_000_000);
    config.filter_window = 4;
    config.drift_clamp_ns = 1000;
    config
}

/// [`unprivileged_config`] at `period_ns`.
pub fn sample_config(period_ns: u64) -> CycleConfig {
    let mut config = unprivileged_config();
    config.period_ns = period_ns;
    config
}
