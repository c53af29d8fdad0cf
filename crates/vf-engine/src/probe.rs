//! Accelerator resource probing.

use std::env;
use std::path::Path;

use log::{debug, warn};

/// Snapshot of available accelerator resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceReport {
    pub accelerator_present: bool,
    /// Free accelerator memory, when it could be measured.
    pub memory_bytes: Option<u64>,
}

impl ResourceReport {
    pub fn none() -> Self {
        Self {
            accelerator_present: false,
            memory_bytes: None,
        }
    }
}

/// Pure hardware query. Implementations must not mutate anything and
/// must not fail: inability to inspect the hardware reports no
/// accelerator so downstream logic degrades to the CPU path.
pub trait ResourceProbe: Send + Sync {
    fn probe(&self) -> ResourceReport;
}

/// Default probe for the host system.
///
/// Resolution order: the `VIDFORGE_ACCEL_MEMORY_BYTES` override (used
/// by deployments that know their hardware), then the presence of an
/// NVIDIA kernel driver. Driver presence without a readable memory
/// figure is reported as an accelerator with unknown memory; the
/// loader treats unknown memory as insufficient for on-accelerator
/// execution.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl ResourceProbe for SystemProbe {
    fn probe(&self) -> ResourceReport {
        if let Ok(raw) = env::var("VIDFORGE_ACCEL_MEMORY_BYTES") {
            match raw.trim().parse::<u64>() {
                Ok(0) => return ResourceReport::none(),
                Ok(bytes) => {
                    debug!("accelerator memory override: {bytes} bytes");
                    return ResourceReport {
                        accelerator_present: true,
                        memory_bytes: Some(bytes),
                    };
                }
                Err(e) => warn!("ignoring unparsable VIDFORGE_ACCEL_MEMORY_BYTES: {e}"),
            }
        }

        if Path::new("/proc/driver/nvidia").exists() {
            debug!("NVIDIA driver present, memory unknown");
            return ResourceReport {
                accelerator_present: true,
                memory_bytes: None,
            };
        }

        ResourceReport::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_report_degrades_to_cpu() {
        let report = ResourceReport::none();
        assert!(!report.accelerator_present);
        assert_eq!(report.memory_bytes, None);
    }
}
