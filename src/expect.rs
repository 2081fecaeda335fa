use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use thirtyfour::WebDriver;
use tokio::time::sleep;

use crate::error::HarnessResult;
use crate::locator::Locator;

/// How often predicates are re-evaluated against the live DOM. Not
/// user-visible; timeouts are the configuration surface.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cap on observed text carried into diagnostics.
const OBSERVED_TEXT_LIMIT: usize = 2_000;

#[derive(Clone, Debug)]
pub enum Predicate {
    /// Element exists with a non-zero rendered size and no hiding style.
    Visible,
    /// No match, or every match is not rendered.
    Hidden,
    /// Case-sensitive substring match against rendered text, re-read on
    /// every poll (text may be produced asynchronously).
    ContainsText(String),
    /// Exact string match against a named attribute.
    AttributeEquals { name: String, value: String },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Visible => write!(f, "is visible"),
            Predicate::Hidden => write!(f, "is hidden"),
            Predicate::ContainsText(fragment) => write!(f, "contains text \"{fragment}\""),
            Predicate::AttributeEquals { name, value } => {
                write!(f, "has attribute {name}=\"{value}\"")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Expectation {
    pub locator: Locator,
    pub predicate: Predicate,
    pub timeout: Duration,
}

impl Expectation {
    pub fn new(locator: Locator, predicate: Predicate, timeout: Duration) -> Self {
        Self {
            locator,
            predicate,
            timeout,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.locator, self.predicate)
    }
}

/// Result of one polled check.
#[derive(Clone, Debug)]
pub struct ExpectOutcome {
    pub satisfied: bool,
    pub elapsed: Duration,
    /// What the DOM looked like on the final unsatisfied poll.
    pub last_observed: Option<String>,
}

/// One probe evaluation inside [`poll_until`].
pub enum Poll<T> {
    Ready(T),
    Pending(Option<String>),
}

/// Terminal state of a [`poll_until`] run.
pub enum PollResult<T> {
    Satisfied { value: T, elapsed: Duration },
    TimedOut { last_observed: Option<String>, elapsed: Duration },
}

/// Re-run `probe` at [`POLL_INTERVAL`] until it reports ready or `timeout`
/// elapses. Returns immediately on the first ready evaluation; probes at
/// least once even with a zero timeout. Probe errors abort the poll — a
/// failing driver is not a pending condition.
pub async fn poll_until<T, F, Fut>(timeout: Duration, mut probe: F) -> HarnessResult<PollResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Poll<T>>>,
{
    let start = Instant::now();
    let mut last_observed = None;
    loop {
        match probe().await? {
            Poll::Ready(value) => {
                return Ok(PollResult::Satisfied {
                    value,
                    elapsed: start.elapsed(),
                });
            }
            Poll::Pending(observed) => {
                if observed.is_some() {
                    last_observed = observed;
                }
            }
        }
        if start.elapsed() >= timeout {
            return Ok(PollResult::TimedOut {
                last_observed,
                elapsed: start.elapsed(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Evaluate `expectation` against the live DOM, polling until it holds or
/// its timeout elapses. A timed-out expectation is reported, never retried;
/// a UI that never satisfies it indicates a defect, not transient slowness.
pub async fn expect(driver: &WebDriver, expectation: &Expectation) -> HarnessResult<ExpectOutcome> {
    let result = poll_until(expectation.timeout, || {
        evaluate(driver, &expectation.locator, &expectation.predicate)
    })
    .await?;

    Ok(match result {
        PollResult::Satisfied { elapsed, .. } => ExpectOutcome {
            satisfied: true,
            elapsed,
            last_observed: None,
        },
        PollResult::TimedOut {
            last_observed,
            elapsed,
        } => ExpectOutcome {
            satisfied: false,
            elapsed,
            last_observed,
        },
    })
}

async fn evaluate(
    driver: &WebDriver,
    locator: &Locator,
    predicate: &Predicate,
) -> HarnessResult<Poll<()>> {
    let matches = locator.resolve_all(driver).await?;

    match predicate {
        Predicate::Visible => {
            for element in &matches {
                if element.is_displayed().await? {
                    return Ok(Poll::Ready(()));
                }
            }
            Ok(Poll::Pending(Some(if matches.is_empty() {
                "no matching element".to_owned()
            } else {
                format!("{} match(es), none visible", matches.len())
            })))
        }
        Predicate::Hidden => {
            for element in &matches {
                if element.is_displayed().await? {
                    return Ok(Poll::Pending(Some("element is visible".to_owned())));
                }
            }
            Ok(Poll::Ready(()))
        }
        Predicate::ContainsText(fragment) => {
            let Some(element) = matches.first() else {
                return Ok(Poll::Pending(Some("no matching element".to_owned())));
            };
            let text = element.text().await?;
            if text.contains(fragment) {
                Ok(Poll::Ready(()))
            } else {
                Ok(Poll::Pending(Some(truncate_observed(&text))))
            }
        }
        Predicate::AttributeEquals { name, value } => {
            let Some(element) = matches.first() else {
                return Ok(Poll::Pending(Some("no matching element".to_owned())));
            };
            match element.attr(name).await? {
                Some(observed) if &observed == value => Ok(Poll::Ready(())),
                Some(observed) => Ok(Poll::Pending(Some(format!("{name}=\"{observed}\"")))),
                None => Ok(Poll::Pending(Some(format!("{name} is absent")))),
            }
        }
    }
}

pub fn truncate_observed(text: &str) -> String {
    if text.len() <= OBSERVED_TEXT_LIMIT {
        return text.to_owned();
    }
    let mut cut = OBSERVED_TEXT_LIMIT;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}… ({} bytes total)", &text[..cut], text.len())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn poll_returns_as_soon_as_the_probe_is_ready() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::from_secs(5), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= 3 {
                Poll::Ready(n)
            } else {
                Poll::Pending(None)
            })
        })
        .await
        .unwrap();

        match result {
            PollResult::Satisfied { value, elapsed } => {
                assert_eq!(value, 3);
                assert!(elapsed < Duration::from_secs(1));
            }
            PollResult::TimedOut { .. } => panic!("probe should have satisfied"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_timeout_carries_the_last_observed_state() {
        let calls = AtomicU32::new(0);
        let result = poll_until::<(), _, _>(Duration::from_millis(120), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Poll::Pending(Some(format!("attempt {n}"))))
        })
        .await
        .unwrap();

        match result {
            PollResult::TimedOut { last_observed, .. } => {
                let seen = last_observed.unwrap();
                assert!(seen.starts_with("attempt "));
                assert_ne!(seen, "attempt 1", "should have re-polled");
            }
            PollResult::Satisfied { .. } => panic!("probe never satisfies"),
        }
    }

    #[tokio::test]
    async fn zero_timeout_still_probes_once() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Poll::Ready(()))
        })
        .await
        .unwrap();

        assert!(matches!(result, PollResult::Satisfied { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_errors_abort_the_poll() {
        let result = poll_until::<(), _, _>(Duration::from_secs(5), || async {
            Err(crate::error::HarnessError::Launch("driver gone".into()))
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn truncation_keeps_char_boundaries() {
        let text = "é".repeat(1_500);
        let truncated = truncate_observed(&text);
        assert!(truncated.contains("bytes total"));
        assert!(truncated.len() < text.len());
    }

    #[test]
    fn describe_reads_naturally() {
        let expectation = Expectation::new(
            Locator::css("#debug-panel"),
            Predicate::Hidden,
            Duration::from_secs(5),
        );
        assert_eq!(expectation.describe(), "css `#debug-panel` is hidden");
    }
}
