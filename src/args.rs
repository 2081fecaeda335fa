use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use strum_macros::Display;

pub const EVIDENCE_DIR: &str = "evidence";
pub const FAILURE_DIR: &str = "failures";

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 720;

pub const DEFAULT_SCENARIOS: [ScenarioKind; 4] = [
    ScenarioKind::Visualization,
    ScenarioKind::Calculator,
    ScenarioKind::DebugToggle,
    ScenarioKind::SortToggle,
];

#[derive(Copy, Clone, Debug, ValueEnum, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ScenarioKind {
    /// Page load: headings, benchmark chart, tables, similarity matrix.
    Visualization,
    /// Interactive similarity calculator round trip.
    Calculator,
    /// Debug panel hidden by default, visible after one click.
    DebugToggle,
    /// Column sort indicator cycles ascending/descending.
    SortToggle,
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Drive a headless browser against the vector-similarity visualization and verify it behaves"
)]
pub struct HarnessArgs {
    /// Scenarios to run (comma-separated).
    #[arg(
        long = "scenario",
        value_enum,
        value_delimiter = ',',
        default_values_t = DEFAULT_SCENARIOS
    )]
    pub scenarios: Vec<ScenarioKind>,
    /// Base URL of an already-running server hosting the visualization.
    #[arg(long, conflicts_with = "serve_dir")]
    pub base_url: Option<String>,
    /// Serve this directory tree ourselves instead of targeting --base-url.
    #[arg(long)]
    pub serve_dir: Option<Utf8PathBuf>,
    /// Preferred HTTP port for the self-hosted server (0 chooses a free
    /// port).
    #[arg(long, default_value_t = 0)]
    pub port: u16,
    /// Path to the chromedriver binary when spawning automatically.
    #[arg(long, default_value = "chromedriver")]
    pub driver: String,
    /// Connect to an existing WebDriver endpoint instead of launching
    /// chromedriver.
    #[arg(long)]
    pub webdriver: Option<String>,
    /// Override the chromedriver port (random free port by default).
    #[arg(long)]
    pub webdriver_port: Option<u16>,
    /// Run Chrome in headless mode (set to false to show the browser).
    #[arg(long, default_value_t = true)]
    pub headless: bool,
    /// Timeout for each expectation (milliseconds).
    #[arg(long, default_value_t = 10_000)]
    pub timeout: u64,
    /// Timeout for the per-scenario readiness condition (milliseconds).
    #[arg(long = "ready-timeout", default_value_t = 15_000)]
    pub ready_timeout: u64,
    /// Root directory for screenshot evidence.
    #[arg(long, default_value = "artifacts")]
    pub artifacts: Utf8PathBuf,
}
