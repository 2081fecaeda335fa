use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thirtyfour::WebDriver;

use crate::error::{HarnessError, HarnessResult, NavigationAttempt};
use crate::expect::{self, Poll, PollResult, poll_until};
use crate::locator::Locator;

/// How long each candidate probe may take before we move on.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The signal that a page is stable enough to assert against. Different
/// pages have different ready signals (a chart library mounting, an app
/// container bootstrapping), so the condition is chosen per scenario.
#[derive(Clone, Debug)]
pub enum ReadyCondition {
    /// A specific element is present and visible.
    ElementVisible(Locator),
    /// The document finished loading and no new resource fetches were
    /// observed across consecutive polls.
    NetworkSettle,
    /// A text fragment appeared in the rendered body.
    BodyContainsText(String),
}

impl fmt::Display for ReadyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyCondition::ElementVisible(locator) => write!(f, "{locator} visible"),
            ReadyCondition::NetworkSettle => write!(f, "network settled"),
            ReadyCondition::BodyContainsText(fragment) => {
                write!(f, "body contains \"{fragment}\"")
            }
        }
    }
}

/// What to do when the ready signal never arrives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadinessPolicy {
    /// Treat it as fatal for the scenario.
    Abort,
    /// Log the observed state and keep going; the step expectations will
    /// fail with better diagnostics if the page really is broken.
    DumpAndContinue,
}

#[derive(Clone, Debug)]
pub struct Readiness {
    pub condition: ReadyCondition,
    pub policy: ReadinessPolicy,
}

#[derive(Clone, Debug)]
pub struct NavigationPlan {
    /// Candidate URLs tried in order; the first non-not-found response wins.
    pub candidates: Vec<String>,
    pub readiness: Readiness,
    pub ready_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct NavigationResult {
    pub status_code: u16,
    pub final_url: String,
}

#[derive(Clone, Debug)]
pub enum ReadinessOutcome {
    Ready,
    TimedOut { last_observed: Option<String> },
}

#[derive(Clone, Debug)]
pub struct NavigationOutcome {
    pub result: NavigationResult,
    pub readiness: ReadinessOutcome,
}

/// Pick the first candidate that does not answer not-found. WebDriver does
/// not expose navigation status codes, so candidates are probed with a
/// plain HTTP GET before the browser is pointed at the winner.
pub async fn probe_candidates(candidates: &[String]) -> HarnessResult<NavigationResult> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    let mut attempts = Vec::new();
    for url in candidates {
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    attempts.push(NavigationAttempt {
                        url: url.clone(),
                        status: Some(status.as_u16()),
                        error: None,
                    });
                    continue;
                }
                return Ok(NavigationResult {
                    status_code: status.as_u16(),
                    final_url: url.clone(),
                });
            }
            Err(err) => {
                attempts.push(NavigationAttempt {
                    url: url.clone(),
                    status: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    Err(HarnessError::Navigation { attempts })
}

/// Load the first reachable candidate and wait for the scenario's ready
/// signal. A timed-out ready signal is reported, not raised — the caller
/// applies the scenario's [`ReadinessPolicy`].
pub async fn navigate(driver: &WebDriver, plan: &NavigationPlan) -> HarnessResult<NavigationOutcome> {
    let result = probe_candidates(&plan.candidates).await?;
    driver.goto(&result.final_url).await?;

    let readiness = wait_until_ready(driver, &plan.readiness.condition, plan.ready_timeout).await?;
    Ok(NavigationOutcome { result, readiness })
}

async fn wait_until_ready(
    driver: &WebDriver,
    condition: &ReadyCondition,
    timeout: Duration,
) -> HarnessResult<ReadinessOutcome> {
    let result = match condition {
        ReadyCondition::ElementVisible(locator) => {
            poll_until(timeout, || async {
                let matches = locator.resolve_all(driver).await?;
                for element in &matches {
                    if element.is_displayed().await? {
                        return Ok(Poll::Ready(()));
                    }
                }
                Ok(Poll::Pending(Some(if matches.is_empty() {
                    format!("{locator} not present")
                } else {
                    format!("{locator} present but not visible")
                })))
            })
            .await?
        }
        ReadyCondition::NetworkSettle => return wait_for_network_settle(driver, timeout).await,
        ReadyCondition::BodyContainsText(fragment) => {
            poll_until(timeout, || async {
                let matches = Locator::css("body").resolve_all(driver).await?;
                let Some(body) = matches.first() else {
                    return Ok(Poll::Pending(Some("document has no body".to_owned())));
                };
                let text = body.text().await?;
                if text.contains(fragment) {
                    Ok(Poll::Ready(()))
                } else {
                    Ok(Poll::Pending(Some(expect::truncate_observed(&text))))
                }
            })
            .await?
        }
    };

    Ok(match result {
        PollResult::Satisfied { .. } => ReadinessOutcome::Ready,
        PollResult::TimedOut { last_observed, .. } => ReadinessOutcome::TimedOut { last_observed },
    })
}

/// Spacing between settle probes. Wide enough that an unchanged
/// resource-entry count between two probes means no request landed in
/// between.
const SETTLE_INTERVAL: Duration = Duration::from_millis(500);

/// Ready once the document is complete and the resource-entry count stops
/// moving between consecutive probes.
async fn wait_for_network_settle(
    driver: &WebDriver,
    timeout: Duration,
) -> HarnessResult<ReadinessOutcome> {
    let start = std::time::Instant::now();
    let mut previous: Option<u64> = None;
    let mut last_observed = None;
    loop {
        let (state, resources): (String, u64) = driver
            .execute(
                "return [document.readyState, \
                 window.performance.getEntriesByType('resource').length];",
                Vec::new(),
            )
            .await?
            .convert()?;

        if state == "complete" && previous == Some(resources) {
            return Ok(ReadinessOutcome::Ready);
        }

        last_observed = Some(format!("readyState={state}, {resources} resource(s) fetched"));
        previous = Some(resources);

        if start.elapsed() >= timeout {
            return Ok(ReadinessOutcome::TimedOut { last_observed });
        }
        tokio::time::sleep(SETTLE_INTERVAL).await;
    }
}
