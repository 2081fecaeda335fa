//! Structural properties of the built-in scenarios: step ordering, the sort
//! cycle, and evidence-path uniqueness.

use std::collections::HashSet;
use std::time::Duration;

use camino::Utf8Path;

use vizcheck::args::{DEFAULT_SCENARIOS, ScenarioKind};
use vizcheck::capture::{evidence_path, failure_path};
use vizcheck::expect::Predicate;
use vizcheck::scenario::Step;
use vizcheck::scenarios::{self, NESTED_PAGE, PRIMARY_PAGE, Timings};

fn timings() -> Timings {
    Timings {
        expect: Duration::from_secs(5),
        ready: Duration::from_secs(10),
    }
}

#[test]
fn every_scenario_asserts_before_it_interacts_and_captures_evidence() {
    for kind in DEFAULT_SCENARIOS {
        let spec = scenarios::builtin(kind, timings());
        assert!(!spec.paths.is_empty(), "{kind} has no candidate paths");
        assert!(
            matches!(spec.steps.first(), Some(Step::Expect(_))),
            "{kind} should open with an expectation"
        );
        assert!(
            spec.steps
                .iter()
                .any(|step| matches!(step, Step::Capture { .. })),
            "{kind} records no evidence"
        );
    }
}

#[test]
fn visualization_falls_back_to_the_nested_page_path() {
    let spec = scenarios::builtin(ScenarioKind::Visualization, timings());
    assert_eq!(spec.paths, vec![PRIMARY_PAGE, NESTED_PAGE]);
}

#[test]
fn sort_indicator_cycles_with_period_two() {
    let spec = scenarios::builtin(ScenarioKind::SortToggle, timings());

    let mut clicks = 0;
    let mut indicators = Vec::new();
    for step in &spec.steps {
        match step {
            Step::Click { .. } => clicks += 1,
            Step::Expect(expectation) => {
                if let Predicate::ContainsText(fragment) = &expectation.predicate {
                    indicators.push((clicks, fragment.clone()));
                }
            }
            _ => {}
        }
    }

    // One directional assertion after each click: ascending, descending,
    // then ascending again on the third click.
    assert_eq!(
        indicators,
        vec![
            (1, "↑".to_string()),
            (2, "↓".to_string()),
            (3, "↑".to_string()),
        ]
    );
}

#[test]
fn debug_panel_is_asserted_hidden_before_the_toggle_click() {
    let spec = scenarios::builtin(ScenarioKind::DebugToggle, timings());

    let hidden_index = spec
        .steps
        .iter()
        .position(|step| {
            matches!(
                step,
                Step::Expect(expectation) if matches!(expectation.predicate, Predicate::Hidden)
            )
        })
        .expect("debug scenario asserts the panel is hidden");
    let click_index = spec
        .steps
        .iter()
        .position(|step| matches!(step, Step::Click { .. }))
        .expect("debug scenario clicks the toggle");
    let visible_index = spec
        .steps
        .iter()
        .position(|step| {
            matches!(
                step,
                Step::Expect(expectation) if matches!(expectation.predicate, Predicate::Visible)
            )
        })
        .expect("debug scenario asserts the panel became visible");

    assert!(hidden_index < click_index);
    assert!(click_index < visible_index);
}

#[test]
fn evidence_paths_are_unique_across_all_scenarios() {
    let artifacts = Utf8Path::new("artifacts");
    let mut paths = HashSet::new();

    for kind in DEFAULT_SCENARIOS {
        let spec = scenarios::builtin(kind, timings());
        let name = spec.name();

        assert!(
            paths.insert(failure_path(artifacts, &name)),
            "failure path for {name} collides"
        );
        for step in &spec.steps {
            if let Step::Capture { checkpoint, .. } = step {
                assert!(
                    paths.insert(evidence_path(artifacts, &name, checkpoint)),
                    "evidence path {name}/{checkpoint} collides"
                );
            }
        }
    }
}
