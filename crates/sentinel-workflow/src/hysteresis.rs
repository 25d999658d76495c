//! N-window hysteresis for promotion decisions: a score must clear the
//! threshold for `window_size` consecutive evaluation windows before a
//! `Promotion` fires, so a single lucky window can't trigger one.

use chrono::Utc;
use sentinel_types::{EvalScore, Promotion, PromotionAction, PromotionId, PromotionStatus};
use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_WINDOW: usize = 3;

pub struct PromotionTracker {
    threshold: f64,
    window_size: usize,
    streaks: Mutex<HashMap<String, usize>>,
}

impl PromotionTracker {
    pub fn new(threshold: f64, window_size: usize) -> Self {
        Self {
            threshold,
            window_size: window_size.max(1),
            streaks: Mutex::new(HashMap::new()),
        }
    }

    /// Records one eval window's score. Returns `Some(Promotion)` exactly
    /// when the streak just reached `window_size`; the streak resets
    /// immediately after so consecutive windows above threshold don't
    /// emit a promotion every single window.
    pub fn record(&self, score: &EvalScore) -> Option<Promotion> {
        let mut streaks = self.streaks.lock().expect("promotion tracker lock poisoned");
        let streak = streaks.entry(score.agent_id.clone()).or_insert(0);

        if score.score >= self.threshold {
            *streak += 1;
        } else {
            *streak = 0;
        }

        if *streak >= self.window_size {
            *streak = 0;
            Some(Promotion {
                id: PromotionId::generate(),
                agent_id: score.agent_id.clone(),
                action: PromotionAction::Promote,
                rationale: format!(
                    "score {:.3} met threshold {:.3} for {} consecutive windows",
                    score.score, self.threshold, self.window_size
                ),
                confidence: score.confidence,
                status: PromotionStatus::Pending,
                created_at: Utc::now(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(agent: &str, value: f64) -> EvalScore {
        EvalScore {
            agent_id: agent.to_string(),
            score: value,
            components: Vec::new(),
            confidence: 0.9,
            window: 0,
        }
    }

    #[test]
    fn promotes_after_n_consecutive_windows() {
        let tracker = PromotionTracker::new(0.8, 3);
        assert!(tracker.record(&score("agent-1", 0.9)).is_none());
        assert!(tracker.record(&score("agent-1", 0.9)).is_none());
        assert!(tracker.record(&score("agent-1", 0.9)).is_some());
    }

    #[test]
    fn a_single_dip_resets_the_streak() {
        let tracker = PromotionTracker::new(0.8, 3);
        tracker.record(&score("agent-1", 0.9));
        tracker.record(&score("agent-1", 0.5));
        assert!(tracker.record(&score("agent-1", 0.9)).is_none());
    }

    #[test]
    fn tracks_agents_independently() {
        let tracker = PromotionTracker::new(0.8, 2);
        tracker.record(&score("agent-1", 0.9));
        assert!(tracker.record(&score("agent-2", 0.9)).is_none());
    }
}
