use num_bigint::BigInt;

/// Runway below which the on-call engineer is paged: one week.
pub const RUNWAY_ALERT_THRESHOLD_SECS: i64 = 604_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Normal,
    Alerting,
}

/// What to do about a run's runway. Re-evaluated from scratch every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Runway is healthy or undefined.
    None,
    /// Breach outside production: log only.
    LogOnly,
    /// Breach in production: send a page.
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    pub state: AlertState,
    pub escalation: Escalation,
}

pub fn evaluate(runway_in_seconds: &BigInt) -> AlertState {
    if *runway_in_seconds < BigInt::from(RUNWAY_ALERT_THRESHOLD_SECS) {
        AlertState::Alerting
    } else {
        AlertState::Normal
    }
}

/// Decide escalation for a run. An undefined runway (zero emission rate) never alerts.
pub fn decide(runway_in_seconds: Option<&BigInt>, is_production: bool) -> AlertDecision {
    let state = runway_in_seconds.map_or(AlertState::Normal, evaluate);
    let escalation = match (state, is_production) {
        (AlertState::Normal, _) => Escalation::None,
        (AlertState::Alerting, true) => Escalation::Page,
        (AlertState::Alerting, false) => Escalation::LogOnly,
    };
    AlertDecision { state, escalation }
}

pub fn summary(runway_in_seconds: &BigInt) -> String {
    format!("Runway is less than 1 week. Runway: {}", runway_in_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn test_just_under_threshold_pages_in_production() {
        let decision = decide(Some(&secs(604_799)), true);
        assert_eq!(decision.state, AlertState::Alerting);
        assert_eq!(decision.escalation, Escalation::Page);
    }

    #[test]
    fn test_threshold_itself_is_normal() {
        let decision = decide(Some(&secs(604_800)), true);
        assert_eq!(decision.state, AlertState::Normal);
        assert_eq!(decision.escalation, Escalation::None);
    }

    #[test]
    fn test_breach_outside_production_is_logged_only() {
        let decision = decide(Some(&secs(100)), false);
        assert_eq!(decision.state, AlertState::Alerting);
        assert_eq!(decision.escalation, Escalation::LogOnly);
    }

    #[test]
    fn test_negative_runway_alerts() {
        assert_eq!(evaluate(&secs(-3_600)), AlertState::Alerting);
    }

    #[test]
    fn test_undefined_runway_never_alerts() {
        assert_eq!(decide(None, true).escalation, Escalation::None);
    }

    #[test]
    fn test_summary_text() {
        assert_eq!(
            summary(&secs(3_600)),
            "Runway is less than 1 week. Runway: 3600"
        );
    }
}
