//! Process-data exchange between the cycle worker and non-RT consumers.
//!
//! The worker never blocks on this buffer. Snapshot publication and output
//! pickup both use `try_lock`; on contention the worker drops the snapshot
//! (counted) or keeps the outputs it already holds.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use fieldcycle_errors::ValidationError;
use parking_lot::Mutex;

use crate::topology::Topology;

/// Bytes of one device in one direction.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceData {
    /// Topology index
    pub device: usize,
    /// Process data bytes
    pub bytes: Vec<u8>,
}

impl Clone for DeviceData {
    fn clone(&self) -> Self {
        Self {
            device: self.device,
            bytes: self.bytes.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.device = source.device;
        self.bytes.clone_from(&source.bytes);
    }
}

/// Inputs and outputs of every device, read in one cycle.
///
/// `clone_from` between snapshots of the same shape reuses every buffer.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct ProcessDataSnapshot {
    /// Cycle the data was read in
    pub cycle: u64,
    /// Application time of the read (ns)
    pub app_time_ns: u64,
    /// Input bytes in device order
    pub inputs: Vec<DeviceData>,
    /// Output bytes in device order
    pub outputs: Vec<DeviceData>,
}

impl Clone for ProcessDataSnapshot {
    fn clone(&self) -> Self {
        Self {
            cycle: self.cycle,
            app_time_ns: self.app_time_ns,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.cycle = source.cycle;
        self.app_time_ns = source.app_time_ns;
        self.inputs.clone_from(&source.inputs);
        self.outputs.clone_from(&source.outputs);
    }
}

impl ProcessDataSnapshot {
    /// Zero-filled snapshot shaped after `topology`
    pub fn for_topology(topology: &Topology) -> Self {
        let shape = |len_of: fn(&crate::topology::DeviceConfig) -> usize| {
            topology
                .devices()
                .iter()
                .enumerate()
                .map(|(device, cfg)| DeviceData {
                    device,
                    bytes: vec![0; len_of(cfg)],
                })
                .collect()
        };
        Self {
            cycle: 0,
            app_time_ns: 0,
            inputs: shape(|d| d.input.len),
            outputs: shape(|d| d.output.len),
        }
    }

    /// Concatenated input bytes (`pdo_in_raw`)
    pub fn pdo_in_raw(&self) -> Vec<u8> {
        self.inputs.iter().flat_map(|d| d.bytes.iter().copied()).collect()
    }

    /// Concatenated output bytes (`pdo_out_raw`)
    pub fn pdo_out_raw(&self) -> Vec<u8> {
        self.outputs.iter().flat_map(|d| d.bytes.iter().copied()).collect()
    }

    /// Input bytes of `device`
    pub fn input(&self, device: usize) -> Option<&[u8]> {
        self.inputs.get(device).map(|d| d.bytes.as_slice())
    }

    /// Output bytes of `device`
    pub fn output(&self, device: usize) -> Option<&[u8]> {
        self.outputs.get(device).map(|d| d.bytes.as_slice())
    }
}

/// Output bytes for one device, picked up by the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOutputCommand {
    /// Topology index
    pub device: usize,
    /// New output bytes; must match the device's output length
    pub bytes: Vec<u8>,
}

impl PendingOutputCommand {
    /// Command `bytes` for `device`
    pub fn new(device: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            device,
            bytes: bytes.into(),
        }
    }
}

/// Commanded output image plus a generation that changes on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputImage {
    /// Output bytes per device
    pub devices: Vec<Vec<u8>>,
    /// Bumped on every command and on zeroing
    pub generation: u64,
}

impl OutputImage {
    fn for_topology(topology: &Topology) -> Self {
        Self {
            devices: topology
                .devices()
                .iter()
                .map(|d| vec![0; d.output.len])
                .collect(),
            generation: 0,
        }
    }

    /// True if every byte is zero
    pub fn is_zero(&self) -> bool {
        self.devices.iter().all(|d| d.iter().all(|&b| b == 0))
    }
}

/// Publication counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    /// Snapshots stored in the latest slot
    pub published: u64,
    /// Snapshots dropped because the latest slot was locked
    pub dropped: u64,
    /// Deliveries dropped because a subscriber channel was full
    pub subscriber_drops: u64,
}

/// The one resource shared between the worker and the outside.
#[derive(Debug)]
pub struct ProcessDataBuffer {
    latest: Mutex<Option<ProcessDataSnapshot>>,
    outputs: Mutex<OutputImage>,
    subscribers: Mutex<Vec<Sender<ProcessDataSnapshot>>>,
    output_lens: Vec<usize>,
    published: AtomicU64,
    dropped: AtomicU64,
    subscriber_drops: AtomicU64,
}

impl ProcessDataBuffer {
    /// Buffer shaped after `topology`, outputs zeroed
    pub fn new(topology: &Topology) -> Self {
        Self {
            latest: Mutex::new(None),
            outputs: Mutex::new(OutputImage::for_topology(topology)),
            subscribers: Mutex::new(Vec::new()),
            output_lens: topology.devices().iter().map(|d| d.output.len).collect(),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            subscriber_drops: AtomicU64::new(0),
        }
    }

    /// Most recently published snapshot
    pub fn latest_snapshot(&self) -> Option<ProcessDataSnapshot> {
        self.latest.lock().clone()
    }

    /// Receive every published snapshot through a bounded channel.
    ///
    /// Deliveries to a full channel are dropped; dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self, capacity: usize) -> Receiver<ProcessDataSnapshot> {
        let (tx, rx) = channel::bounded(capacity.max(1));
        self.subscribers.lock().push(tx);
        rx
    }

    /// Store output bytes for one device. Held until replaced.
    ///
    /// # Errors
    ///
    /// Unknown device, or a byte count different from the device's output
    /// length.
    pub fn command_outputs(&self, command: PendingOutputCommand) -> Result<(), ValidationError> {
        let expected = *self.output_lens.get(command.device).ok_or_else(|| {
            ValidationError::out_of_range(
                "device",
                command.device,
                0,
                self.output_lens.len().saturating_sub(1),
            )
        })?;
        if command.bytes.len() != expected {
            return Err(ValidationError::constraint(format!(
                "device {} expects {} output bytes, got {}",
                command.device,
                expected,
                command.bytes.len()
            )));
        }

        let mut image = self.outputs.lock();
        if let Some(slot) = image.devices.get_mut(command.device) {
            *slot = command.bytes;
        }
        image.generation = image.generation.wrapping_add(1);
        Ok(())
    }

    /// Copy of the commanded output image
    pub fn output_image(&self) -> OutputImage {
        self.outputs.lock().clone()
    }

    /// Zero every commanded output byte.
    pub fn zero_outputs(&self) {
        let mut image = self.outputs.lock();
        for device in &mut image.devices {
            device.fill(0);
        }
        image.generation = image.generation.wrapping_add(1);
    }

    /// Publication counters
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            subscriber_drops: self.subscriber_drops.load(Ordering::Relaxed),
        }
    }

    /// Publish from the cycle worker. Never blocks.
    ///
    /// Returns `false` if the latest slot was contended and the snapshot
    /// dropped.
    pub(crate) fn try_publish(&self, snapshot: &ProcessDataSnapshot) -> bool {
        let stored = match self.latest.try_lock() {
            Some(mut slot) => {
                match slot.as_mut() {
                    Some(existing) => existing.clone_from(snapshot),
                    None => *slot = Some(snapshot.clone()),
                }
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        };

        if let Some(mut subscribers) = self.subscribers.try_lock() {
            if !subscribers.is_empty() {
                subscribers.retain(|tx| match tx.try_send(snapshot.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        self.subscriber_drops.fetch_add(1, Ordering::Relaxed);
                        true
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                });
            }
        }
        stored
    }

    /// Refresh `held` from the commanded image if it changed since
    /// `held_generation`. Never blocks; on contention `held` is kept.
    pub(crate) fn try_load_outputs(&self, held: &mut [Vec<u8>], held_generation: &mut u64) -> bool {
        let Some(image) = self.outputs.try_lock() else {
            return false;
        };
        if image.generation != *held_generation {
            for (dst, src) in held.iter_mut().zip(image.devices.iter()) {
                if dst.len() == src.len() {
                    dst.copy_from_slice(src);
                }
            }
            *held_generation = image.generation;
        }
        true
    }

    /// Current output image generation
    pub(crate) fn output_generation(&self) -> u64 {
        self.outputs.lock().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{DeviceConfig, PdoRange};

    fn topology() -> Result<Topology, ValidationError> {
        let device = |name: &str, position: u16, base: usize| DeviceConfig {
            name: name.to_string(),
            alias: 0,
            position,
            vendor_id: 1,
            product_code: 2,
            assign_activate: 0x0300,
            sync0_shift_ns: 0,
            input: PdoRange::new(base, 2),
            output: PdoRange::new(base + 2, 3),
        };
        Topology::new(vec![device("a", 0, 0), device("b", 1, 5)])
    }

    #[test]
    fn test_snapshot_flattening() -> Result<(), ValidationError> {
        let mut snap = ProcessDataSnapshot::for_topology(&topology()?);
        snap.inputs[0].bytes.copy_from_slice(&[1, 2]);
        snap.inputs[1].bytes.copy_from_slice(&[3, 4]);
        snap.outputs[1].bytes.copy_from_slice(&[7, 8, 9]);

        assert_eq!(snap.pdo_in_raw(), vec![1, 2, 3, 4]);
        assert_eq!(snap.pdo_out_raw(), vec![0, 0, 0, 7, 8, 9]);
        assert_eq!(snap.output(1), Some(&[7u8, 8, 9][..]));
        assert_eq!(snap.input(2), None);
        Ok(())
    }

    #[test]
    fn test_command_outputs_validates() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        assert!(buffer.command_outputs(PendingOutputCommand::new(1, [1, 2, 3])).is_ok());
        assert!(matches!(
            buffer.command_outputs(PendingOutputCommand::new(2, [1, 2, 3])),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            buffer.command_outputs(PendingOutputCommand::new(0, [1])),
            Err(ValidationError::ConstraintViolation(_))
        ));
        assert_eq!(buffer.output_image().devices[1], vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_held_outputs_follow_generation() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        let mut held = vec![vec![0u8; 3], vec![0u8; 3]];
        let mut generation = 0;

        assert!(buffer.try_load_outputs(&mut held, &mut generation));
        assert_eq!(generation, 0);

        buffer.command_outputs(PendingOutputCommand::new(0, [5, 5, 5]))?;
        assert!(buffer.try_load_outputs(&mut held, &mut generation));
        assert_eq!(held[0], vec![5, 5, 5]);

        // No new command: value is held, not zeroed.
        assert!(buffer.try_load_outputs(&mut held, &mut generation));
        assert_eq!(held[0], vec![5, 5, 5]);
        Ok(())
    }

    #[test]
    fn test_contended_outputs_keep_held_copy() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        buffer.command_outputs(PendingOutputCommand::new(0, [9, 9, 9]))?;
        let mut held = vec![vec![1u8; 3], vec![1u8; 3]];
        let mut generation = 0;

        let guard = buffer.outputs.lock();
        assert!(!buffer.try_load_outputs(&mut held, &mut generation));
        drop(guard);
        assert_eq!(held[0], vec![1, 1, 1]);
        Ok(())
    }

    #[test]
    fn test_contended_publish_drops_and_counts() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        let snap = ProcessDataSnapshot::for_topology(&topology()?);

        assert!(buffer.try_publish(&snap));
        let guard = buffer.latest.lock();
        assert!(!buffer.try_publish(&snap));
        drop(guard);

        let stats = buffer.stats();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.dropped, 1);
        Ok(())
    }

    #[test]
    fn test_subscriber_full_and_disconnect() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        let mut snap = ProcessDataSnapshot::for_topology(&topology()?);
        let rx = buffer.subscribe(1);
        let gone = buffer.subscribe(4);
        drop(gone);

        snap.cycle = 1;
        buffer.try_publish(&snap);
        snap.cycle = 2;
        buffer.try_publish(&snap);

        assert_eq!(rx.try_recv().map(|s| s.cycle), Ok(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(buffer.stats().subscriber_drops, 1);
        assert_eq!(buffer.subscribers.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn test_zero_outputs() -> Result<(), ValidationError> {
        let buffer = ProcessDataBuffer::new(&topology()?);
        buffer.command_outputs(PendingOutputCommand::new(1, [1, 2, 3]))?;
        let before = buffer.output_generation();
        buffer.zero_outputs();
        assert!(buffer.output_image().is_zero());
        assert_ne!(buffer.output_generation(), before);
        Ok(())
    }
}
