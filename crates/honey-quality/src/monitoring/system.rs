use std::sync::Mutex;
use std::thread;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Point-in-time host utilisation in percent. `None` marks a reading the host could not supply.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
}

/// Source of resource readings, swappable for a fixed snapshot in tests.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> ResourceSnapshot;
}

/// Samples the local host through `sysinfo`.
pub struct SysinfoSampler {
    system: Mutex<System>,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample(&self) -> ResourceSnapshot {
        let Ok(mut system) = self.system.lock() else {
            return ResourceSnapshot::default();
        };

        // CPU usage is a delta between two refreshes.
        system.refresh_cpu_usage();
        thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();
        let cpu_percent = Some(f64::from(system.global_cpu_usage()));

        system.refresh_memory();
        let memory_percent = percent(system.used_memory(), system.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let (total, available) = disks.list().iter().fold((0u64, 0u64), |acc, disk| {
            (acc.0 + disk.total_space(), acc.1 + disk.available_space())
        });
        let disk_percent = percent(total.saturating_sub(available), total);

        ResourceSnapshot {
            cpu_percent,
            memory_percent,
            disk_percent,
        }
    }
}

/// Returns the same snapshot on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSampler(pub ResourceSnapshot);

impl ResourceSampler for FixedSampler {
    fn sample(&self) -> ResourceSnapshot {
        self.0
    }
}

fn percent(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_guards_zero_totals() {
        assert_eq!(percent(5, 0), None);
        assert_eq!(percent(25, 100), Some(25.0));
    }

    #[test]
    fn fixed_sampler_repeats_its_snapshot() {
        let snapshot = ResourceSnapshot {
            cpu_percent: Some(12.5),
            memory_percent: None,
            disk_percent: Some(70.0),
        };
        let sampler = FixedSampler(snapshot);
        assert_eq!(sampler.sample(), snapshot);
        assert_eq!(sampler.sample(), snapshot);
    }
}
