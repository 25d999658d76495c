//! Post-apply ROI monitoring: watches a rolling window of ROI samples per
//! agent and triggers a demotion (preemption, run through the allocation
//! path in reverse) when ROI turns and stays negative.

use chrono::Utc;
use sentinel_types::{Promotion, PromotionAction, PromotionId, PromotionStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub struct RoiMonitor {
    window_size: usize,
    samples: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl RoiMonitor {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            samples: Mutex::new(HashMap::new()),
        }
    }

    /// Records one ROI sample for `agent_id`. Returns a demotion
    /// (`PromotionAction::Demote`) once the full window is negative on
    /// average.
    pub fn record(&self, agent_id: &str, roi: f64) -> Option<Promotion> {
        let mut samples = self.samples.lock().expect("roi monitor lock poisoned");
        let window = samples.entry(agent_id.to_string()).or_default();
        window.push_back(roi);
        while window.len() > self.window_size {
            window.pop_front();
        }

        if window.len() < self.window_size {
            return None;
        }

        let average: f64 = window.iter().sum::<f64>() / window.len() as f64;
        if average >= 0.0 {
            return None;
        }

        window.clear();
        Some(Promotion {
            id: PromotionId::generate(),
            agent_id: agent_id.to_string(),
            action: PromotionAction::Demote,
            rationale: format!("average ROI {average:.3} over {} windows is negative", self.window_size),
            confidence: 1.0,
            status: PromotionStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demotes_after_window_of_negative_roi() {
        let monitor = RoiMonitor::new(3);
        assert!(monitor.record("agent-1", -1.0).is_none());
        assert!(monitor.record("agent-1", -2.0).is_none());
        let demotion = monitor.record("agent-1", -3.0).unwrap();
        assert_eq!(demotion.action, PromotionAction::Demote);
    }

    #[test]
    fn a_positive_sample_keeps_it_from_demoting() {
        let monitor = RoiMonitor::new(3);
        monitor.record("agent-1", -1.0);
        monitor.record("agent-1", -2.0);
        assert!(monitor.record("agent-1", 5.0).is_none());
    }
}
