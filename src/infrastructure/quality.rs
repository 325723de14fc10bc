use crate::types::THROUGHPUT_SCORE_BASELINE;
use serde::Serialize;

/// Threshold bucketing of the composite quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Excellent,
    Good,
    Poor,
    Unknown,
}

/// Individual factor scores, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityFactors {
    pub latency_score: u8,
    pub stability_score: u8,
    pub throughput_score: u8,
}

/// Composite link-quality score derived from heartbeat timing and
/// reconnection pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionQuality {
    pub status: QualityStatus,
    pub score: u8,
    pub factors: QualityFactors,
}

impl ConnectionQuality {
    /// Score the link from the last measured round-trip latency and the
    /// current reconnection attempt count.
    pub fn evaluate(latency_ms: Option<u64>, attempts: u32, max_attempts: u32) -> Self {
        let factors = QualityFactors {
            latency_score: latency_score(latency_ms),
            stability_score: stability_score(attempts, max_attempts),
            // Placeholder until real traffic accounting exists; any
            // replacement must stay within 0..=100.
            throughput_score: THROUGHPUT_SCORE_BASELINE,
        };

        let sum =
            factors.latency_score as u32 + factors.stability_score as u32 + factors.throughput_score as u32;
        let score = ((sum as f64 / 3.0).round() as u32).min(100) as u8;

        Self {
            status: bucket(score),
            score,
            factors,
        }
    }
}

/// Bucketed latency score; absence of a measurement is not penalized.
fn latency_score(latency_ms: Option<u64>) -> u8 {
    match latency_ms {
        None => 100,
        Some(ms) if ms <= 50 => 100,
        Some(ms) if ms < 100 => 90,
        Some(ms) if ms < 200 => 75,
        Some(ms) if ms < 500 => 50,
        Some(_) => 25,
    }
}

/// Reconnection pressure directly degrades stability.
fn stability_score(attempts: u32, max_attempts: u32) -> u8 {
    if max_attempts == 0 {
        return 100;
    }
    let penalty = (attempts as f64 / max_attempts as f64) * 100.0;
    (100.0 - penalty).max(0.0).round() as u8
}

fn bucket(score: u8) -> QualityStatus {
    match score {
        90..=100 => QualityStatus::Excellent,
        70..=89 => QualityStatus::Good,
        40..=69 => QualityStatus::Poor,
        _ => QualityStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_buckets_are_monotone() {
        assert_eq!(latency_score(Some(40)), 100);
        assert_eq!(latency_score(Some(50)), 100);
        assert_eq!(latency_score(Some(51)), 90);
        assert_eq!(latency_score(Some(99)), 90);
        assert_eq!(latency_score(Some(100)), 75);
        assert_eq!(latency_score(Some(199)), 75);
        assert_eq!(latency_score(Some(200)), 50);
        assert_eq!(latency_score(Some(499)), 50);
        assert_eq!(latency_score(Some(500)), 25);
        assert_eq!(latency_score(Some(10_000)), 25);
    }

    #[test]
    fn unmeasured_latency_is_not_penalized() {
        assert_eq!(latency_score(None), 100);
    }

    #[test]
    fn fast_roundtrip_and_no_retries_is_excellent() {
        let quality = ConnectionQuality::evaluate(Some(40), 0, 5);
        assert_eq!(quality.factors.latency_score, 100);
        assert_eq!(quality.factors.stability_score, 100);
        assert_eq!(quality.score, 100);
        assert_eq!(quality.status, QualityStatus::Excellent);
    }

    #[test]
    fn reconnection_pressure_degrades_stability() {
        assert_eq!(stability_score(0, 5), 100);
        assert_eq!(stability_score(1, 5), 80);
        assert_eq!(stability_score(5, 5), 0);
        assert_eq!(stability_score(7, 5), 0);
        // Degenerate config with no retry budget cannot divide by zero
        assert_eq!(stability_score(0, 0), 100);
    }

    #[test]
    fn score_is_rounded_mean_of_factors() {
        // latency 75, stability 80, throughput 100 -> mean 85 -> good
        let quality = ConnectionQuality::evaluate(Some(150), 1, 5);
        assert_eq!(quality.score, 85);
        assert_eq!(quality.status, QualityStatus::Good);
    }

    #[test]
    fn degraded_links_bucket_downward() {
        // latency 25, stability 20, throughput 100 -> mean 48 -> poor
        let poor = ConnectionQuality::evaluate(Some(800), 4, 5);
        assert_eq!(poor.status, QualityStatus::Poor);

        // latency 25, stability 0, throughput 100 -> mean 42 -> still poor
        let worse = ConnectionQuality::evaluate(Some(800), 5, 5);
        assert_eq!(worse.score, 42);
        assert_eq!(worse.status, QualityStatus::Poor);
    }
}
