use thirtyfour::{WebDriver, WebElement};

use crate::error::{HarnessError, HarnessResult};
use crate::locator::Locator;

/// Click the single actionable element the locator resolves to. No implicit
/// waiting happens here; any resulting state change is verified by a
/// subsequent expectation, keeping act and assert separate.
pub async fn click(driver: &WebDriver, locator: &Locator) -> HarnessResult<()> {
    let element = resolve_actionable(driver, locator).await?;
    element.click().await?;
    Ok(())
}

/// Replace the contents of the single actionable input the locator resolves
/// to.
pub async fn fill(driver: &WebDriver, locator: &Locator, text: &str) -> HarnessResult<()> {
    let element = resolve_actionable(driver, locator).await?;
    element.clear().await?;
    element.send_keys(text).await?;
    Ok(())
}

/// Interactions require exactly one visible, enabled target at call time.
/// Zero or ambiguous matches are fatal for the step.
async fn resolve_actionable(driver: &WebDriver, locator: &Locator) -> HarnessResult<WebElement> {
    let mut matches = locator.resolve_all(driver).await?;
    let element = match matches.len() {
        0 => {
            return Err(HarnessError::Locator {
                locator: locator.to_string(),
                reason: "no matching element".into(),
            });
        }
        1 => matches.remove(0),
        n => {
            return Err(HarnessError::Locator {
                locator: locator.to_string(),
                reason: format!("matched {n} elements; interactions require exactly one"),
            });
        }
    };

    if !element.is_displayed().await? {
        return Err(HarnessError::Locator {
            locator: locator.to_string(),
            reason: "element is not visible".into(),
        });
    }
    if !element.is_enabled().await? {
        return Err(HarnessError::Locator {
            locator: locator.to_string(),
            reason: "element is disabled".into(),
        });
    }
    Ok(element)
}
