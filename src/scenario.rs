use std::fmt;
use std::time::Duration;

use crate::args::ScenarioKind;
use crate::expect::Expectation;
use crate::locator::Locator;
use crate::navigate::Readiness;

/// One entry in a scenario's ordered script.
#[derive(Clone, Debug)]
pub enum Step {
    Expect(Expectation),
    Fill { locator: Locator, text: String },
    Click { locator: Locator },
    Capture { checkpoint: String, full_page: bool },
}

impl Step {
    pub fn describe(&self) -> String {
        match self {
            Step::Expect(expectation) => format!("expect {}", expectation.describe()),
            Step::Fill { locator, text } => format!("fill {locator} with \"{text}\""),
            Step::Click { locator } => format!("click {locator}"),
            Step::Capture { checkpoint, .. } => format!("capture \"{checkpoint}\""),
        }
    }
}

/// A named verification run: candidate page paths, a ready signal, and the
/// steps executed strictly in order.
#[derive(Clone, Debug)]
pub struct ScenarioSpec {
    pub kind: ScenarioKind,
    /// Candidate page paths joined onto the base URL, tried in order.
    pub paths: Vec<&'static str>,
    pub readiness: Readiness,
    pub ready_timeout: Duration,
    pub steps: Vec<Step>,
}

impl ScenarioSpec {
    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}

/// Where in a scenario a failure happened. Navigation precedes the step
/// list, so it gets its own reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepRef {
    Navigation,
    Step(usize),
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRef::Navigation => write!(f, "navigation"),
            StepRef::Step(index) => write!(f, "step {}", index + 1),
        }
    }
}

/// A scenario has exactly one outcome; the first failing step aborts the
/// rest.
#[derive(Clone, Debug)]
pub enum ScenarioOutcome {
    Passed,
    Failed { step: StepRef, reason: String },
}

#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: ScenarioOutcome,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::Predicate;

    #[test]
    fn step_descriptions_read_naturally() {
        let step = Step::Expect(Expectation::new(
            Locator::css("#debug-panel"),
            Predicate::Visible,
            Duration::from_secs(5),
        ));
        assert_eq!(step.describe(), "expect css `#debug-panel` is visible");

        let step = Step::Fill {
            locator: Locator::css("textarea").first(),
            text: "1, 0, 1".into(),
        };
        assert_eq!(step.describe(), "fill first(css `textarea`) with \"1, 0, 1\"");
    }

    #[test]
    fn step_refs_render_one_based() {
        assert_eq!(StepRef::Navigation.to_string(), "navigation");
        assert_eq!(StepRef::Step(0).to_string(), "step 1");
        assert_eq!(StepRef::Step(6).to_string(), "step 7");
    }
}
