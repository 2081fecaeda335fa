use std::net::Ipv4Addr;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use thirtyfour::common::capabilities::chromium::ChromiumLikeCapabilities;
use thirtyfour::common::capabilities::desiredcapabilities::CapabilitiesHelper;
use thirtyfour::{Capabilities, DesiredCapabilities, WebDriver};
use tokio::time::sleep;

use crate::args::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::{HarnessError, HarnessResult};

const CONNECT_ATTEMPTS: u32 = 40;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub headless: bool,
    /// chromedriver binary to spawn when no endpoint is given.
    pub driver_binary: String,
    /// Existing WebDriver endpoint to attach to instead of spawning.
    pub endpoint: Option<String>,
    /// Fixed port for the spawned chromedriver (random free port by
    /// default).
    pub port: Option<u16>,
}

/// An isolated browser execution context. One scenario run owns exactly one
/// session; sessions are never shared because page state is scenario-local.
pub struct Session {
    driver: WebDriver,
    child: Option<Child>,
    pub webdriver_url: String,
}

/// Launch (or attach to) a WebDriver endpoint and open a browser session.
/// Launch failures are fatal for the run and are never retried beyond the
/// bounded connect loop; a partially started driver process is killed
/// before the error surfaces.
pub async fn acquire(config: &SessionConfig) -> HarnessResult<Session> {
    if let Some(url) = &config.endpoint {
        let driver = connect(url, config.headless).await?;
        return Ok(Session {
            driver,
            child: None,
            webdriver_url: url.clone(),
        });
    }

    let port = match config.port {
        Some(port) => port,
        None => pick_free_port()?,
    };
    let mut child = spawn_driver_process(&config.driver_binary, port)?;
    let url = format!("http://127.0.0.1:{port}");

    match connect(&url, config.headless).await {
        Ok(driver) => Ok(Session {
            driver,
            child: Some(child),
            webdriver_url: url,
        }),
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(err)
        }
    }
}

impl Session {
    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    /// Quit the browser session and terminate the driver process. Consuming
    /// `self` makes a double release unrepresentable; the `Drop` impl covers
    /// early-return and panic paths by killing the child process.
    pub async fn release(mut self) -> HarnessResult<()> {
        let quit = self.driver.clone().quit().await;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        quit.map_err(HarnessError::from)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub fn pick_free_port() -> HarnessResult<u16> {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

fn spawn_driver_process(binary: &str, port: u16) -> HarnessResult<Child> {
    let mut cmd = Command::new(binary);
    cmd.arg(format!("--port={port}"));
    cmd.arg("--disable-dev-shm-usage");
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.spawn()
        .map_err(|err| HarnessError::Launch(format!("failed to launch {binary}: {err}")))
}

async fn connect(url: &str, headless: bool) -> HarnessResult<WebDriver> {
    let caps: Capabilities = {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.set_disable_gpu()?;
        if headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg(&format!(
            "--window-size={},{}",
            VIEWPORT_WIDTH, VIEWPORT_HEIGHT
        ))?;
        caps.add_arg("--disable-infobars")?;
        caps.add_arg("--no-first-run")?;
        caps.add_arg("--no-default-browser-check")?;
        caps.add_arg("--force-device-scale-factor=1")?;
        caps.add_arg("--hide-scrollbars")?;
        caps.accept_insecure_certs(true)?;
        caps.into()
    };

    let mut last_err = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match WebDriver::new(url, caps.clone()).await {
            Ok(driver) => return Ok(driver),
            Err(err) => {
                last_err = Some(err);
                sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }

    Err(HarnessError::Launch(match last_err {
        Some(err) => format!("failed to connect to WebDriver at {url}: {err}"),
        None => format!("failed to connect to WebDriver at {url}"),
    }))
}
