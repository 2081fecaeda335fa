use std::time::Duration;

use crate::args::ScenarioKind;
use crate::expect::{Expectation, Predicate};
use crate::locator::Locator;
use crate::navigate::{Readiness, ReadinessPolicy, ReadyCondition};
use crate::scenario::{ScenarioSpec, Step};

/// Page locations the visualization has been served from. Which one is live
/// depends on how the server roots the tree, so scenarios carry both and
/// navigation picks the first that answers.
pub const PRIMARY_PAGE: &str = "/vector-similarity.html";
pub const NESTED_PAGE: &str = "/visualization/vector-similarity.html";

/// Timeouts applied when building scenario steps; both come from the CLI.
#[derive(Copy, Clone, Debug)]
pub struct Timings {
    pub expect: Duration,
    pub ready: Duration,
}

pub fn builtin(kind: ScenarioKind, timings: Timings) -> ScenarioSpec {
    match kind {
        ScenarioKind::Visualization => visualization(timings),
        ScenarioKind::Calculator => calculator(timings),
        ScenarioKind::DebugToggle => debug_toggle(timings),
        ScenarioKind::SortToggle => sort_toggle(timings),
    }
}

fn expect_step(locator: Locator, predicate: Predicate, timings: Timings) -> Step {
    Step::Expect(Expectation::new(locator, predicate, timings.expect))
}

/// Static page audit: headings, the benchmark chart, the outlier tables and
/// the comparison matrix, finished with a full-page evidence shot. The
/// similarity table renders asynchronously, so readiness keys off its
/// metric names appearing in the body; on timeout the observed body text is
/// dumped and the step expectations produce the precise diagnosis.
fn visualization(timings: Timings) -> ScenarioSpec {
    ScenarioSpec {
        kind: ScenarioKind::Visualization,
        paths: vec![PRIMARY_PAGE, NESTED_PAGE],
        readiness: Readiness {
            condition: ReadyCondition::BodyContainsText("normalizedCosineSimilarity".into()),
            policy: ReadinessPolicy::DumpAndContinue,
        },
        ready_timeout: timings.ready,
        steps: vec![
            expect_step(
                Locator::heading("Vector Similarity Analysis"),
                Predicate::Visible,
                timings,
            ),
            expect_step(
                Locator::heading("Performance Benchmark"),
                Predicate::Visible,
                timings,
            ),
            expect_step(
                Locator::css("#benchmark-chart svg"),
                Predicate::Visible,
                timings,
            ),
            expect_step(
                Locator::heading("Outlier Resiliency"),
                Predicate::Visible,
                timings,
            ),
            expect_step(
                Locator::css("#outliers-container table").first(),
                Predicate::Visible,
                timings,
            ),
            expect_step(
                Locator::heading("Comparison Demo Matrix"),
                Predicate::Visible,
                timings,
            ),
            expect_step(Locator::css("#demo-matrix table"), Predicate::Visible, timings),
            Step::Capture {
                checkpoint: "overview".into(),
                full_page: true,
            },
        ],
    }
}

/// Calculator round trip with a fixed input pair chosen so the results are
/// known: [1,0,1] and [0,1,0] are orthogonal, so cosine similarity is
/// 0.0000 and euclidean similarity is 1/(1+√3) = 0.2679 at four decimal
/// places.
fn calculator(timings: Timings) -> ScenarioSpec {
    let results = Locator::test_id("calculator-results");
    ScenarioSpec {
        kind: ScenarioKind::Calculator,
        paths: vec![NESTED_PAGE, PRIMARY_PAGE],
        readiness: Readiness {
            condition: ReadyCondition::NetworkSettle,
            policy: ReadinessPolicy::Abort,
        },
        ready_timeout: timings.ready,
        steps: vec![
            expect_step(
                Locator::text("Interactive Similarity Calculator"),
                Predicate::Visible,
                timings,
            ),
            Step::Fill {
                locator: Locator::css("textarea").first(),
                text: "1, 0, 1".into(),
            },
            Step::Fill {
                locator: Locator::css("textarea").last(),
                text: "0, 1, 0".into(),
            },
            Step::Click {
                locator: Locator::button("Calculate Similarities"),
            },
            expect_step(results.clone(), Predicate::Visible, timings),
            expect_step(
                results.clone(),
                Predicate::ContainsText("cosineSimilarity".into()),
                timings,
            ),
            expect_step(
                results.clone(),
                Predicate::ContainsText("0.0000".into()),
                timings,
            ),
            expect_step(
                results.clone(),
                Predicate::ContainsText("euclideanSimilarity".into()),
                timings,
            ),
            expect_step(
                results,
                Predicate::ContainsText("0.2679".into()),
                timings,
            ),
            Step::Capture {
                checkpoint: "results".into(),
                full_page: true,
            },
        ],
    }
}

/// The debug panel must be hidden on a plain load and become visible after
/// exactly one click of the toggle.
fn debug_toggle(timings: Timings) -> ScenarioSpec {
    let panel = Locator::css("#debug-panel");
    ScenarioSpec {
        kind: ScenarioKind::DebugToggle,
        paths: vec![NESTED_PAGE, PRIMARY_PAGE],
        readiness: Readiness {
            condition: ReadyCondition::ElementVisible(Locator::css("canvas")),
            policy: ReadinessPolicy::Abort,
        },
        ready_timeout: timings.ready,
        steps: vec![
            expect_step(panel.clone(), Predicate::Hidden, timings),
            Step::Click {
                locator: Locator::button("Debug"),
            },
            expect_step(panel, Predicate::Visible, timings),
            Step::Capture {
                checkpoint: "debug-open".into(),
                full_page: false,
            },
        ],
    }
}

/// Clicking the same column header cycles the sort direction with period
/// two: ascending, descending, and back to ascending on the third click.
/// Each state is observable through the directional indicator in the
/// header.
fn sort_toggle(timings: Timings) -> ScenarioSpec {
    let header = Locator::test_id("outliers-table")
        .first()
        .within(Locator::test_id("header-0"));
    ScenarioSpec {
        kind: ScenarioKind::SortToggle,
        paths: vec![PRIMARY_PAGE, NESTED_PAGE],
        readiness: Readiness {
            condition: ReadyCondition::ElementVisible(Locator::css("#app")),
            policy: ReadinessPolicy::Abort,
        },
        ready_timeout: timings.ready,
        steps: vec![
            expect_step(header.clone(), Predicate::Visible, timings),
            Step::Click {
                locator: header.clone(),
            },
            expect_step(
                header.clone(),
                Predicate::ContainsText("↑".into()),
                timings,
            ),
            Step::Capture {
                checkpoint: "sorted-asc".into(),
                full_page: false,
            },
            Step::Click {
                locator: header.clone(),
            },
            expect_step(
                header.clone(),
                Predicate::ContainsText("↓".into()),
                timings,
            ),
            Step::Capture {
                checkpoint: "sorted-desc".into(),
                full_page: false,
            },
            Step::Click {
                locator: header.clone(),
            },
            expect_step(header, Predicate::ContainsText("↑".into()), timings),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> Timings {
        Timings {
            expect: Duration::from_secs(5),
            ready: Duration::from_secs(10),
        }
    }

    #[test]
    fn orthogonal_vectors_format_to_the_expected_strings() {
        let cosine = 0.0_f64;
        assert_eq!(format!("{cosine:.4}"), "0.0000");

        let euclidean = 1.0 / (1.0 + 3.0_f64.sqrt());
        assert_eq!(format!("{euclidean:.4}"), "0.2679");
    }

    #[test]
    fn calculator_asserts_both_metric_values() {
        let spec = builtin(ScenarioKind::Calculator, timings());
        let expected_fragments: Vec<String> = spec
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Expect(expectation) => match &expectation.predicate {
                    Predicate::ContainsText(fragment) => Some(fragment.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        for fragment in ["cosineSimilarity", "0.0000", "euclideanSimilarity", "0.2679"] {
            assert!(
                expected_fragments.iter().any(|seen| seen == fragment),
                "missing assertion on {fragment}"
            );
        }
    }
}
