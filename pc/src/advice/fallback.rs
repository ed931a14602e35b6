//! Deterministic local fallbacks around the advice service

use std::time::Duration;

use tracing::{debug, warn};

use super::error::{AdviceError, Degradation, FallbackReason};
use super::service::{AdviceService, BreakdownRequest, CandidateTask};
use crate::domain::MicroStep;

/// Generic steps used when no breakdown could be obtained
pub const FALLBACK_STEPS: [(&str, u32); 3] = [
    ("note the first tiny action", 2),
    ("gather what's needed", 5),
    ("set a timer and start", 10),
];

/// A value plus the degradation it was produced under, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advised<T> {
    pub value: T,
    pub degradation: Option<Degradation>,
}

impl<T> Advised<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            degradation: None,
        }
    }

    fn degraded(value: T, degradation: Degradation) -> Self {
        Self {
            value,
            degradation: Some(degradation),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// The whole trimmed input as a single candidate task
pub fn fallback_tasks(trimmed: &str) -> Vec<CandidateTask> {
    vec![CandidateTask::new(trimmed)]
}

/// Three generic low-demand steps
pub fn fallback_steps(request: &BreakdownRequest) -> Vec<MicroStep> {
    let due_by = request.due.to_string();
    FALLBACK_STEPS
        .iter()
        .map(|(text, mins)| MicroStep::new(*text, due_by.clone(), *mins))
        .collect()
}

/// Call `parse` and fall back on error, timeout or an empty answer
pub async fn parse_with_fallback(
    service: &dyn AdviceService,
    raw_text: &str,
    timeout: Duration,
) -> Advised<Vec<CandidateTask>> {
    let trimmed = raw_text.trim();
    debug!(len = trimmed.len(), "parse_with_fallback: called");

    let error = match tokio::time::timeout(timeout, service.parse(trimmed)).await {
        Err(_) => AdviceError::Timeout(timeout),
        Ok(Err(e)) => e,
        Ok(Ok(outcome)) => {
            let tasks: Vec<CandidateTask> = outcome
                .tasks
                .into_iter()
                .filter_map(|t| {
                    let text = t.text.trim().to_string();
                    (!text.is_empty()).then_some(CandidateTask { id: t.id, text })
                })
                .collect();

            if tasks.is_empty() {
                AdviceError::Empty
            } else if !outcome.ai_used {
                let reason = outcome.fallback_reason.unwrap_or(FallbackReason::ApiError);
                warn!(%reason, "parse_with_fallback: service answered without AI");
                return Advised::degraded(tasks, Degradation::new(reason, "advice service used its own fallback"));
            } else {
                debug!(count = tasks.len(), "parse_with_fallback: parsed");
                return Advised::clean(tasks);
            }
        }
    };

    let degradation = error.degradation();
    warn!(reason = %degradation.reason, error = %error, "parse_with_fallback: using local fallback");
    Advised::degraded(fallback_tasks(trimmed), degradation)
}

/// Call `breakdown` and fall back on error, timeout or an empty answer
pub async fn breakdown_with_fallback(
    service: &dyn AdviceService,
    request: &BreakdownRequest,
    timeout: Duration,
) -> Advised<Vec<MicroStep>> {
    debug!(task = %request.task_name, energy = %request.energy, "breakdown_with_fallback: called");

    let error = match tokio::time::timeout(timeout, service.breakdown(request)).await {
        Err(_) => AdviceError::Timeout(timeout),
        Ok(Err(e)) => e,
        Ok(Ok(outcome)) => {
            let steps: Vec<MicroStep> = outcome.steps.into_iter().filter(|s| !s.text.trim().is_empty()).collect();
            if steps.is_empty() {
                AdviceError::Empty
            } else {
                return Advised::clean(steps);
            }
        }
    };

    let degradation = error.degradation();
    warn!(task = %request.task_name, reason = %degradation.reason, error = %error, "breakdown_with_fallback: using local fallback");
    Advised::degraded(fallback_steps(request), degradation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::mock::MockAdvisor;
    use crate::advice::{BreakdownOutcome, ParseOutcome, UnavailableAdvisor};
    use crate::domain::{DueDate, EnergyLevel};

    const TIMEOUT: Duration = Duration::from_secs(20);

    fn request() -> BreakdownRequest {
        BreakdownRequest {
            task_name: "clean the kitchen".to_string(),
            due: DueDate::Today,
            energy: EnergyLevel::Medium,
        }
    }

    #[tokio::test]
    async fn test_parse_failure_yields_trimmed_input() {
        let advisor = UnavailableAdvisor::no_api_key();
        let advised = parse_with_fallback(&advisor, "  buy milk and call mom \n", TIMEOUT).await;

        assert_eq!(advised.value.len(), 1);
        assert_eq!(advised.value[0].text, "buy milk and call mom");
        let degradation = advised.degradation.unwrap();
        assert_eq!(degradation.reason, FallbackReason::NoApiKey);
    }

    #[tokio::test]
    async fn test_parse_success_is_clean() {
        let advisor = MockAdvisor::new().with_tasks(&["buy milk", " ", "call mom"]);
        let advised = parse_with_fallback(&advisor, "buy milk and call mom", TIMEOUT).await;

        assert!(!advised.is_degraded());
        let texts: Vec<_> = advised.value.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["buy milk", "call mom"]);
    }

    #[tokio::test]
    async fn test_parse_empty_answer_is_parse_error() {
        let advisor = MockAdvisor::new().with_parse(Ok(ParseOutcome::from_ai(vec![])));
        let advised = parse_with_fallback(&advisor, "sort taxes", TIMEOUT).await;
        assert_eq!(advised.value[0].text, "sort taxes");
        assert_eq!(advised.degradation.unwrap().reason, FallbackReason::ParseError);
    }

    #[tokio::test]
    async fn test_parse_service_side_fallback_stays_visible() {
        let advisor = MockAdvisor::new().with_parse(Ok(ParseOutcome {
            tasks: vec![CandidateTask::new("sort taxes")],
            ai_used: false,
            fallback_reason: Some(FallbackReason::RateLimited),
        }));
        let advised = parse_with_fallback(&advisor, "sort taxes", TIMEOUT).await;
        assert_eq!(advised.degradation.unwrap().reason, FallbackReason::RateLimited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_timeout_falls_back() {
        let advisor = MockAdvisor::new()
            .with_tasks(&["never seen"])
            .with_delay(Duration::from_secs(60));
        let advised = parse_with_fallback(&advisor, "water plants", TIMEOUT).await;
        assert_eq!(advised.value[0].text, "water plants");
        assert_eq!(advised.degradation.unwrap().reason, FallbackReason::ApiError);
    }

    #[tokio::test]
    async fn test_breakdown_failure_yields_three_generic_steps() {
        let advisor = MockAdvisor::new().with_breakdown(Err(AdviceError::RateLimited {
            retry_after: Duration::from_secs(30),
        }));
        let advised = breakdown_with_fallback(&advisor, &request(), TIMEOUT).await;

        let texts: Vec<_> = advised.value.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["note the first tiny action", "gather what's needed", "set a timer and start"]
        );
        assert!(advised.value.iter().all(|s| s.due_by == "today"));
        assert_eq!(advised.degradation.unwrap().reason, FallbackReason::RateLimited);
    }

    #[tokio::test]
    async fn test_breakdown_empty_answer_falls_back() {
        let advisor = MockAdvisor::new().with_breakdown(Ok(BreakdownOutcome { steps: vec![] }));
        let advised = breakdown_with_fallback(&advisor, &request(), TIMEOUT).await;
        assert_eq!(advised.value.len(), 3);
        assert!(advised.is_degraded());
    }

    #[tokio::test]
    async fn test_breakdown_success_passes_steps_through() {
        let advisor = MockAdvisor::new().with_steps(&["clear the counter", "run the dishwasher"]);
        let advised = breakdown_with_fallback(&advisor, &request(), TIMEOUT).await;
        assert!(!advised.is_degraded());
        assert_eq!(advised.value.len(), 2);
        assert_eq!(advisor.breakdown_requests()[0].task_name, "clean the kitchen");
    }
}
