//! Injection statistics

use log::info;

use super::types::SimTime;

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionStats {
    /// Injection cycles run (one per vehicle id)
    pub cycles: u32,
    /// Creation commands sent, retries included
    pub submissions: u32,
    pub injected: u32,
    /// Vehicles given up on after every allowed submission failed
    pub failed: u32,
    pub retries: u32,
    /// When the topology was bootstrapped
    pub bootstrap_time: Option<SimTime>,
    pub last_injection_time: Option<SimTime>,
}

impl InjectionStats {
    pub fn success_rate(&self) -> f64 {
        if self.cycles > 0 {
            (self.injected as f64 / self.cycles as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("=== INJECTION COMPLETE ===");
        info!("Injection cycles: {}", self.cycles);
        info!("Total vehicles injected: {}", self.injected);
        info!("Total vehicles failed: {}", self.failed);
        info!("Insertion retries: {}", self.retries);
        if let Some(time) = self.bootstrap_time {
            info!("Topology loaded at: {:.3}s", time);
        }
        if let Some(time) = self.last_injection_time {
            info!("Last injection at: {:.3}s", time);
        }
        info!("Success rate: {:.1}%", self.success_rate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = InjectionStats {
            cycles: 4,
            injected: 3,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(InjectionStats::default().success_rate(), 0.0);
    }
}
