//! Device topology: the validated (device index → byte range) table.
//!
//! Every device owns one input range and one output range inside the
//! master's domain memory. The table is checked once, before a run starts;
//! after that every accessor is still bounds-checked and returns `None`
//! rather than panicking on a short domain.

use std::collections::HashSet;
use std::ops::Range;

use fieldcycle_errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Byte range inside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdoRange {
    /// Offset from the start of the domain
    pub offset: usize,
    /// Length in bytes, must be > 0
    pub len: usize,
}

impl PdoRange {
    /// Range starting at `offset`
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte, `None` on overflow
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.len)
    }

    /// As a slice range, `None` on overflow
    pub fn as_range(&self) -> Option<Range<usize>> {
        self.end().map(|end| self.offset..end)
    }
}

fn default_assign_activate() -> u16 {
    0x0300
}

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human readable name, unique within the topology
    pub name: String,
    /// Station alias
    #[serde(default)]
    pub alias: u16,
    /// Position on the bus
    pub position: u16,
    /// Vendor identifier
    pub vendor_id: u32,
    /// Product code
    pub product_code: u32,
    /// Distributed-clock AssignActivate word
    #[serde(default = "default_assign_activate")]
    pub assign_activate: u16,
    /// SYNC0 shift relative to the cycle (ns)
    #[serde(default)]
    pub sync0_shift_ns: u32,
    /// Input process data range
    pub input: PdoRange,
    /// Output process data range
    pub output: PdoRange,
}

/// Validated device table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    devices: Vec<DeviceConfig>,
    required_domain_size: usize,
}

impl Topology {
    /// Validate `devices` and build the table.
    ///
    /// # Errors
    ///
    /// Empty topology, duplicate names or bus positions, zero-length or
    /// overflowing ranges.
    pub fn new(devices: Vec<DeviceConfig>) -> Result<Self, ValidationError> {
        fieldcycle_errors::validate!(!devices.is_empty(), ValidationError::required("devices"));

        let mut names = HashSet::new();
        let mut positions = HashSet::new();
        let mut required_domain_size = 0usize;

        for device in &devices {
            if device.name.trim().is_empty() {
                return Err(ValidationError::required("devices[].name"));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ValidationError::not_unique("devices[].name", &device.name));
            }
            if !positions.insert((device.alias, device.position)) {
                return Err(ValidationError::not_unique(
                    "devices[].position",
                    format!("{}:{}", device.alias, device.position),
                ));
            }

            for (direction, range) in [("input", device.input), ("output", device.output)] {
                if range.len == 0 {
                    return Err(ValidationError::constraint(format!(
                        "device '{}' {} range must not be empty",
                        device.name, direction
                    )));
                }
                let end = range.end().ok_or_else(|| {
                    ValidationError::constraint(format!(
                        "device '{}' {} range overflows",
                        device.name, direction
                    ))
                })?;
                required_domain_size = required_domain_size.max(end);
            }
        }

        Ok(Self {
            devices,
            required_domain_size,
        })
    }

    /// Check every range against a domain of `domain_size` bytes.
    ///
    /// # Errors
    ///
    /// The first range that does not fit.
    pub fn check_domain(&self, domain_size: usize) -> Result<(), ValidationError> {
        for (device, entry) in self.devices.iter().enumerate() {
            for (direction, range) in [("input", entry.input), ("output", entry.output)] {
                if range.end().is_none_or(|end| end > domain_size) {
                    return Err(ValidationError::RangeOutOfDomain {
                        device,
                        direction,
                        offset: range.offset,
                        len: range.len,
                        domain_size,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Always false for a validated topology
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Smallest domain that holds every range
    pub fn required_domain_size(&self) -> usize {
        self.required_domain_size
    }

    /// Sum of all input range lengths
    pub fn total_input_len(&self) -> usize {
        self.devices.iter().map(|d| d.input.len).sum()
    }

    /// Sum of all output range lengths
    pub fn total_output_len(&self) -> usize {
        self.devices.iter().map(|d| d.output.len).sum()
    }

    /// Device entry by index
    pub fn device(&self, index: usize) -> Option<&DeviceConfig> {
        self.devices.get(index)
    }

    /// All device entries in index order
    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }

    /// Input bytes of `device` inside `domain`
    #[inline]
    pub fn input<'a>(&self, device: usize, domain: &'a [u8]) -> Option<&'a [u8]> {
        let range = self.devices.get(device)?.input.as_range()?;
        domain.get(range)
    }

    /// Output bytes of `device` inside `domain`
    #[inline]
    pub fn output<'a>(&self, device: usize, domain: &'a [u8]) -> Option<&'a [u8]> {
        let range = self.devices.get(device)?.output.as_range()?;
        domain.get(range)
    }

    /// Mutable output bytes of `device` inside `domain`
    #[inline]
    pub fn output_mut<'a>(&self, device: usize, domain: &'a mut [u8]) -> Option<&'a mut [u8]> {
        let range = self.devices.get(device)?.output.as_range()?;
        domain.get_mut(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, position: u16, input: (usize, usize), output: (usize, usize)) -> DeviceConfig {
        DeviceConfig {
            name: name.to_string(),
            alias: 0,
            position,
            vendor_id: 0x0000_0002,
            product_code: 0x0444_2c52,
            assign_activate: 0x0300,
            sync0_shift_ns: 50_000,
            input: PdoRange::new(input.0, input.1),
            output: PdoRange::new(output.0, output.1),
        }
    }

    fn two_devices() -> Result<Topology, ValidationError> {
        Topology::new(vec![
            device("io0", 0, (0, 4), (4, 2)),
            device("io1", 1, (6, 4), (10, 2)),
        ])
    }

    #[test]
    fn test_required_domain_size() -> Result<(), ValidationError> {
        let topology = two_devices()?;
        assert_eq!(topology.len(), 2);
        assert_eq!(topology.required_domain_size(), 12);
        assert_eq!(topology.total_input_len(), 8);
        assert_eq!(topology.total_output_len(), 4);
        Ok(())
    }

    #[test]
    fn test_empty_topology_rejected() {
        assert_eq!(
            Topology::new(Vec::new()),
            Err(ValidationError::required("devices"))
        );
    }

    #[test]
    fn test_zero_length_range_rejected() {
        let result = Topology::new(vec![device("io0", 0, (0, 0), (4, 2))]);
        assert!(matches!(result, Err(ValidationError::ConstraintViolation(_))));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = Topology::new(vec![
            device("io0", 0, (0, 4), (4, 2)),
            device("io0", 1, (6, 4), (10, 2)),
        ]);
        assert!(matches!(result, Err(ValidationError::NotUnique { .. })));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let result = Topology::new(vec![
            device("io0", 3, (0, 4), (4, 2)),
            device("io1", 3, (6, 4), (10, 2)),
        ]);
        assert!(matches!(result, Err(ValidationError::NotUnique { .. })));
    }

    #[test]
    fn test_check_domain_reports_first_misfit() -> Result<(), ValidationError> {
        let topology = two_devices()?;
        assert!(topology.check_domain(12).is_ok());
        assert_eq!(
            topology.check_domain(11),
            Err(ValidationError::RangeOutOfDomain {
                device: 1,
                direction: "output",
                offset: 10,
                len: 2,
                domain_size: 11,
            })
        );
        Ok(())
    }

    #[test]
    fn test_accessors_are_bounds_checked() -> Result<(), ValidationError> {
        let topology = two_devices()?;
        let mut domain: Vec<u8> = (0u8..12).collect();

        assert_eq!(topology.input(1, &domain), Some(&[6u8, 7, 8, 9][..]));
        assert_eq!(topology.output(0, &domain), Some(&[4u8, 5][..]));
        assert_eq!(topology.input(2, &domain), None);
        assert_eq!(topology.output(1, &domain[..8]), None);

        if let Some(out) = topology.output_mut(1, &mut domain) {
            out.copy_from_slice(&[0xAA, 0xBB]);
        }
        assert_eq!(&domain[10..], &[0xAA, 0xBB]);
        Ok(())
    }
}
