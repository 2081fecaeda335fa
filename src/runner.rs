use std::collections::HashSet;
use std::time::{Duration, Instant};

use color_eyre::eyre::{Result, bail, eyre};
use indicatif::ProgressBar;
use thirtyfour::WebDriver;

use crate::args::HarnessArgs;
use crate::capture;
use crate::error::{HarnessError, HarnessResult};
use crate::expect;
use crate::interact;
use crate::logger::{Logger, summarize_reports};
use crate::navigate::{NavigationPlan, ReadinessOutcome, ReadinessPolicy, navigate};
use crate::scenario::{ScenarioOutcome, ScenarioReport, ScenarioSpec, Step, StepRef};
use crate::scenarios::{self, Timings};
use crate::server::start_static_server;
use crate::session::{self, SessionConfig};

pub fn run(mut args: HarnessArgs) -> Result<()> {
    let logger = Logger::new();

    if args.base_url.is_none() && args.serve_dir.is_none() {
        bail!("either --base-url or --serve-dir is required");
    }
    if let Some(base) = &args.base_url {
        url::Url::parse(base).map_err(|err| eyre!("invalid --base-url `{base}`: {err}"))?;
    }

    let mut seen = HashSet::new();
    args.scenarios.retain(|kind| seen.insert(*kind));
    if args.scenarios.is_empty() {
        bail!("no scenarios selected");
    }

    let timings = Timings {
        expect: Duration::from_millis(args.timeout),
        ready: Duration::from_millis(args.ready_timeout),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let logger_clone = logger.clone();
    runtime.block_on(async move {
        let mut reports = Vec::new();

        for kind in &args.scenarios {
            let spec = scenarios::builtin(*kind, timings);
            logger_clone.blank();
            logger_clone.scenario_banner(&spec.name(), spec.steps.len());

            match run_scenario(&logger_clone, &args, spec).await {
                Ok(report) => reports.push(report),
                Err(err) if err.is_infrastructure() => {
                    // The browser or server never came up; later scenarios
                    // would fail the same way, so stop here.
                    logger_clone.error(format!("aborting run: {err}"));
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }

        if summarize_reports(&logger_clone, &reports) {
            Ok(())
        } else {
            bail!("verification failed");
        }
    })
}

/// Run one scenario inside its own session (and server, when self-hosting).
/// Both are torn down on every exit path before the report is returned.
async fn run_scenario(
    logger: &Logger,
    args: &HarnessArgs,
    spec: ScenarioSpec,
) -> HarnessResult<ScenarioReport> {
    let started = Instant::now();
    let name = spec.name();

    let server = match &args.serve_dir {
        Some(dir) => Some(start_static_server(dir, args.port).await?),
        None => None,
    };
    let base_url = match (&server, &args.base_url) {
        (Some(server), _) => server.base_url(),
        (None, Some(url)) => url.trim_end_matches('/').to_owned(),
        (None, None) => {
            return Err(HarnessError::Server(
                "no --base-url or --serve-dir given".into(),
            ));
        }
    };
    if let Some(server) = &server {
        logger.detail(None, format!("serving static assets at {}", server.base_url()));
    }

    let config = SessionConfig {
        headless: args.headless,
        driver_binary: args.driver.clone(),
        endpoint: args.webdriver.clone(),
        port: args.webdriver_port,
    };
    let session = match session::acquire(&config).await {
        Ok(session) => session,
        Err(err) => {
            if let Some(server) = server {
                server.stop().await;
            }
            return Err(err);
        }
    };
    logger.detail(
        None,
        format!("connected to WebDriver at {}", session.webdriver_url),
    );

    let progress = logger.step_progress(spec.steps.len(), &name);
    let outcome = drive(
        logger,
        progress.as_ref(),
        session.driver(),
        args,
        &spec,
        &base_url,
    )
    .await;

    // Cleanup runs unconditionally, pass or fail.
    if let Err(err) = session.release().await {
        logger.warn(format!("session release failed: {err}"));
    }
    if let Some(server) = server {
        server.stop().await;
    }

    let summary = match &outcome {
        ScenarioOutcome::Passed => format!("passed in {:.2}s", started.elapsed().as_secs_f64()),
        ScenarioOutcome::Failed { step, .. } => format!("failed at {step}"),
    };
    logger.finish_progress(progress, summary.clone());
    match &outcome {
        ScenarioOutcome::Passed => logger.success(format!("{name} {summary}")),
        ScenarioOutcome::Failed { .. } => logger.error(format!("{name} {summary}")),
    }

    Ok(ScenarioReport {
        name,
        outcome,
        duration: started.elapsed(),
    })
}

/// Navigate, then walk the steps strictly in order; the first failing step
/// aborts the rest. Every failure path records a diagnostic screenshot
/// before returning.
async fn drive(
    logger: &Logger,
    progress: Option<&ProgressBar>,
    driver: &WebDriver,
    args: &HarnessArgs,
    spec: &ScenarioSpec,
    base_url: &str,
) -> ScenarioOutcome {
    let name = spec.name();
    let plan = NavigationPlan {
        candidates: spec
            .paths
            .iter()
            .map(|path| format!("{base_url}{path}"))
            .collect(),
        readiness: spec.readiness.clone(),
        ready_timeout: spec.ready_timeout,
    };

    match navigate(driver, &plan).await {
        Ok(outcome) => {
            logger.detail(
                progress,
                format!(
                    "loaded {} ({})",
                    outcome.result.final_url, outcome.result.status_code
                ),
            );
            if let ReadinessOutcome::TimedOut { last_observed } = outcome.readiness {
                match spec.readiness.policy {
                    ReadinessPolicy::Abort => {
                        let err = HarnessError::ReadinessTimeout {
                            condition: spec.readiness.condition.to_string(),
                            timeout_ms: spec.ready_timeout.as_millis() as u64,
                            last_observed,
                        };
                        let reason = err.to_string();
                        logger.step_fail(progress, "readiness", &reason);
                        record_failure(logger, progress, driver, args, &name).await;
                        return ScenarioOutcome::Failed {
                            step: StepRef::Navigation,
                            reason,
                        };
                    }
                    ReadinessPolicy::DumpAndContinue => {
                        logger.warn_with_progress(
                            progress,
                            format!(
                                "ready signal ({}) not seen within {}ms; continuing",
                                spec.readiness.condition,
                                spec.ready_timeout.as_millis()
                            ),
                        );
                        if let Some(seen) = last_observed {
                            logger.detail(progress, format!("last observed: {seen}"));
                        }
                    }
                }
            }
        }
        Err(err) => {
            let reason = err.to_string();
            logger.step_fail(progress, "navigation", &reason);
            record_failure(logger, progress, driver, args, &name).await;
            return ScenarioOutcome::Failed {
                step: StepRef::Navigation,
                reason,
            };
        }
    }

    for (index, step) in spec.steps.iter().enumerate() {
        let description = step.describe();
        logger.step_start(progress, &description);
        let step_started = Instant::now();

        match execute_step(driver, args, step, &name).await {
            Ok(()) => {
                let elapsed_ms = step_started.elapsed().as_secs_f64() * 1000.0;
                logger.step_pass(progress, &description, elapsed_ms);
            }
            Err(err) => {
                let reason = err.to_string();
                logger.step_fail(progress, &description, &reason);
                record_failure(logger, progress, driver, args, &name).await;
                return ScenarioOutcome::Failed {
                    step: StepRef::Step(index),
                    reason,
                };
            }
        }
    }

    ScenarioOutcome::Passed
}

async fn execute_step(
    driver: &WebDriver,
    args: &HarnessArgs,
    step: &Step,
    scenario: &str,
) -> HarnessResult<()> {
    match step {
        Step::Expect(expectation) => {
            let outcome = expect::expect(driver, expectation).await?;
            if outcome.satisfied {
                Ok(())
            } else {
                Err(HarnessError::ExpectationTimeout {
                    expectation: expectation.describe(),
                    timeout_ms: expectation.timeout.as_millis() as u64,
                    last_observed: outcome.last_observed,
                })
            }
        }
        Step::Fill { locator, text } => interact::fill(driver, locator, text).await,
        Step::Click { locator } => interact::click(driver, locator).await,
        Step::Capture {
            checkpoint,
            full_page,
        } => {
            let path = capture::evidence_path(&args.artifacts, scenario, checkpoint);
            capture::capture(driver, &path, *full_page).await
        }
    }
}

/// Best-effort diagnostic screenshot on the failure path. Uses a path
/// disjoint from checkpoint evidence so failed runs never clobber the
/// evidence of passing ones.
async fn record_failure(
    logger: &Logger,
    progress: Option<&ProgressBar>,
    driver: &WebDriver,
    args: &HarnessArgs,
    scenario: &str,
) {
    let path = capture::failure_path(&args.artifacts, scenario);
    match capture::capture(driver, &path, true).await {
        Ok(()) => logger.detail(progress, format!("failure evidence written to {path}")),
        Err(err) => logger.warn_with_progress(
            progress,
            format!("could not capture failure evidence: {err}"),
        ),
    }
}
