//! Heuristic health score for a participant.

use serde::{Deserialize, Serialize};

use crate::types::{Participant, SubUnitStatus};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Coarse risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        if score >= 60 {
            RiskLevel::High
        } else if score >= 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            RiskLevel::High => "Multiple risk factors detected",
            RiskLevel::Medium => "Some performance issues",
            RiskLevel::Low => "Mining normally",
        }
    }
}

/// Raw inputs behind the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub inactivity_hours: f64,
    /// Coefficient of variation of the hashrate history
    pub hashrate_variance: f64,
    /// Fraction of workers reported offline
    pub worker_downtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub miner_address: String,
    pub risk_level: RiskLevel,
    /// 0 to 100
    pub score: u32,
    pub reason: String,
    pub factors: RiskFactors,
}

/// Scores `participant` as of `now_millis`.
pub fn assess(participant: &Participant, now_millis: u64) -> RiskAssessment {
    let inactivity_hours =
        now_millis.saturating_sub(participant.last_active) as f64 / MILLIS_PER_HOUR;

    let offline = participant
        .workers
        .iter()
        .filter(|worker| worker.status == SubUnitStatus::Offline)
        .count();
    let worker_downtime = if participant.workers.is_empty() {
        0.0
    } else {
        offline as f64 / participant.workers.len() as f64
    };

    let rates: Vec<f64> = participant
        .hashrate_history
        .iter()
        .map(|point| point.hashrate)
        .collect();
    let hashrate_variance = coefficient_of_variation(&rates);

    let mut score = 0;

    if inactivity_hours > 24.0 {
        score += 40;
    } else if inactivity_hours > 12.0 {
        score += 20;
    }

    if worker_downtime > 0.5 {
        score += 30;
    } else if offline > 0 {
        score += 15;
    }

    if hashrate_variance > 0.5 {
        score += 20;
    } else if hashrate_variance > 0.2 {
        score += 10;
    }

    // luck is a percentage
    if participant.current_luck < 50.0 {
        score += 15;
    } else if participant.current_luck < 75.0 {
        score += 5;
    }

    let score = score.min(100);
    let risk_level = RiskLevel::from_score(score);

    RiskAssessment {
        miner_address: participant.address.clone(),
        risk_level,
        score,
        reason: risk_level.reason().to_string(),
        factors: RiskFactors {
            inactivity_hours,
            hashrate_variance,
            worker_downtime,
        },
    }
}

/// Population standard deviation over mean. Zero for fewer than two samples
/// or a zero mean.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    variance.sqrt() / mean.abs()
}
