use camino::{Utf8Path, Utf8PathBuf};
use thirtyfour::WebDriver;
use tokio::fs as async_fs;

use crate::args::{EVIDENCE_DIR, FAILURE_DIR, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::{HarnessError, HarnessResult};

/// Take a screenshot and write it to `path`, creating any missing parent
/// directories. Overwrites are deliberate: re-runs refresh the evidence at
/// the same path.
pub async fn capture(driver: &WebDriver, path: &Utf8Path, full_page: bool) -> HarnessResult<()> {
    let png = if full_page {
        capture_full_page(driver).await?
    } else {
        driver.screenshot_as_png().await?
    };
    png_dimensions(&png)?;
    write_artifact(path, &png).await
}

/// WebDriver screenshots cover the viewport only, so a full-page shot sizes
/// the window to the document scroll size first and restores the standard
/// viewport afterwards.
async fn capture_full_page(driver: &WebDriver) -> HarnessResult<Vec<u8>> {
    let (width, height): (u64, u64) = driver
        .execute(
            "return [document.documentElement.scrollWidth, \
             document.documentElement.scrollHeight];",
            Vec::new(),
        )
        .await?
        .convert()?;

    let width = (width as u32).max(VIEWPORT_WIDTH);
    let height = (height as u32).max(VIEWPORT_HEIGHT);
    driver.set_window_rect(0, 0, width, height).await?;

    let shot = driver.screenshot_as_png().await;
    let restore = driver
        .set_window_rect(0, 0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .await;

    let png = shot?;
    restore?;
    Ok(png)
}

pub async fn write_artifact(path: &Utf8Path, bytes: &[u8]) -> HarnessResult<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent.as_std_path()).await?;
    }
    async_fs::write(path.as_std_path(), bytes).await?;
    Ok(())
}

/// Evidence recorded at a scenario checkpoint on the success path.
pub fn evidence_path(artifacts: &Utf8Path, scenario: &str, checkpoint: &str) -> Utf8PathBuf {
    artifacts
        .join(EVIDENCE_DIR)
        .join(scenario)
        .join(format!("{}.png", sanitize_component(checkpoint)))
}

/// Diagnostic shot taken when a scenario fails. Lives under a different
/// directory than checkpoint evidence so the two can never collide.
pub fn failure_path(artifacts: &Utf8Path, scenario: &str) -> Utf8PathBuf {
    artifacts
        .join(FAILURE_DIR)
        .join(format!("{}.png", sanitize_component(scenario)))
}

fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => ch,
            _ => '_',
        })
        .collect()
}

/// Sanity-check the capture really is a PNG and report its size.
pub fn png_dimensions(data: &[u8]) -> HarnessResult<(u32, u32)> {
    const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    if data.len() < 24 {
        return Err(HarnessError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "screenshot PNG is truncated",
        )));
    }
    if !data.starts_with(&PNG_MAGIC) {
        return Err(HarnessError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "unexpected screenshot format",
        )));
    }
    if &data[12..16] != b"IHDR" {
        return Err(HarnessError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing PNG header chunk",
        )));
    }

    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Ok((width, height))
}
