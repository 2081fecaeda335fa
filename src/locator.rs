use std::fmt;

use thirtyfour::{By, WebDriver, WebElement};

use crate::error::{HarnessError, HarnessResult};

/// Ordinal pick out of a multi-element match.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pick {
    First,
    Last,
}

/// Roles we address by accessible name. The pages under test only expose
/// headings and buttons this way.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Heading,
    Button,
}

/// An abstract reference to page element(s). Locators are stateless and are
/// re-resolved against the live DOM on every use; the DOM mutates between
/// interactions, so element handles are never cached.
#[derive(Clone, Debug)]
pub enum Locator {
    /// Raw CSS selector.
    Css(String),
    /// Role plus accessible-name fragment.
    Role { role: Role, name: String },
    /// `data-testid` attribute lookup.
    TestId(String),
    /// Any element with a direct text node containing the fragment.
    Text(String),
    /// Ordinal selection out of whatever the inner locator matches.
    Nth(Box<Locator>, Pick),
    /// Descendant lookup scoped to the first match of the outer locator.
    Within(Box<Locator>, Box<Locator>),
}

/// Wire-level selector a leaf locator translates to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    fn into_by(self) -> By {
        match self {
            Selector::Css(selector) => By::Css(selector),
            Selector::XPath(xpath) => By::XPath(xpath),
        }
    }
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn heading(name: impl Into<String>) -> Self {
        Locator::Role {
            role: Role::Heading,
            name: name.into(),
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Locator::Role {
            role: Role::Button,
            name: name.into(),
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId(id.into())
    }

    pub fn text(fragment: impl Into<String>) -> Self {
        Locator::Text(fragment.into())
    }

    pub fn first(self) -> Self {
        Locator::Nth(Box::new(self), Pick::First)
    }

    pub fn last(self) -> Self {
        Locator::Nth(Box::new(self), Pick::Last)
    }

    /// Scope `descendant` to the first element this locator matches.
    pub fn within(self, descendant: Locator) -> Self {
        Locator::Within(Box::new(self), Box::new(descendant))
    }

    /// The selector for leaf variants. Composite variants (`Nth`, `Within`)
    /// resolve through [`Locator::resolve_all`] instead.
    pub fn leaf_selector(&self) -> Option<Selector> {
        match self {
            Locator::Css(selector) => Some(Selector::Css(selector.clone())),
            Locator::TestId(id) => {
                Some(Selector::Css(format!("[data-testid={}]", css_string(id))))
            }
            Locator::Role { role, name } => {
                let name = xpath_string(name);
                // Relative XPath so the same selector works from the document
                // root and from an element context.
                let xpath = match role {
                    Role::Heading => format!(
                        ".//*[self::h1 or self::h2 or self::h3 or self::h4 or self::h5 or self::h6][contains(normalize-space(.), {name})]"
                    ),
                    Role::Button => format!(
                        ".//button[contains(normalize-space(.), {name})] | .//input[(@type='button' or @type='submit') and contains(@value, {name})]"
                    ),
                };
                Some(Selector::XPath(xpath))
            }
            Locator::Text(fragment) => Some(Selector::XPath(format!(
                ".//*[text()[contains(normalize-space(.), {})]]",
                xpath_string(fragment)
            ))),
            Locator::Nth(_, _) | Locator::Within(_, _) => None,
        }
    }

    /// Re-evaluate this locator against the live DOM.
    pub async fn resolve_all(&self, driver: &WebDriver) -> HarnessResult<Vec<WebElement>> {
        match self {
            Locator::Nth(inner, pick) => {
                let mut matches = Box::pin(inner.resolve_all(driver)).await?;
                let picked = match pick {
                    Pick::First => {
                        if matches.is_empty() {
                            None
                        } else {
                            Some(matches.remove(0))
                        }
                    }
                    Pick::Last => matches.pop(),
                };
                Ok(picked.into_iter().collect())
            }
            Locator::Within(ancestor, descendant) => {
                let selector =
                    descendant
                        .leaf_selector()
                        .ok_or_else(|| HarnessError::Locator {
                            locator: self.to_string(),
                            reason: "scoped lookups only support simple descendant selectors"
                                .into(),
                        })?;
                let mut ancestors = Box::pin(ancestor.resolve_all(driver)).await?;
                if ancestors.is_empty() {
                    return Ok(Vec::new());
                }
                let scope = ancestors.remove(0);
                Ok(scope.find_all(selector.into_by()).await?)
            }
            _ => {
                let selector = self
                    .leaf_selector()
                    .expect("leaf variants always produce a selector");
                Ok(driver.find_all(selector.into_by()).await?)
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{selector}`"),
            Locator::Role { role, name } => {
                let role = match role {
                    Role::Heading => "heading",
                    Role::Button => "button",
                };
                write!(f, "{role} \"{name}\"")
            }
            Locator::TestId(id) => write!(f, "testid `{id}`"),
            Locator::Text(fragment) => write!(f, "text \"{fragment}\""),
            Locator::Nth(inner, Pick::First) => write!(f, "first({inner})"),
            Locator::Nth(inner, Pick::Last) => write!(f, "last({inner})"),
            Locator::Within(ancestor, descendant) => write!(f, "{descendant} within {ancestor}"),
        }
    }
}

/// Quote a value for use inside a CSS attribute selector.
fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a value as an XPath string literal. XPath 1.0 has no escaping, so a
/// value containing both quote kinds needs concat().
fn xpath_string(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_becomes_attribute_selector() {
        assert_eq!(
            Locator::test_id("outliers-table").leaf_selector(),
            Some(Selector::Css(r#"[data-testid="outliers-table"]"#.into()))
        );
    }

    #[test]
    fn heading_xpath_is_relative_and_quoted() {
        let Some(Selector::XPath(xpath)) =
            Locator::heading("Vector Similarity Analysis").leaf_selector()
        else {
            panic!("expected an XPath selector");
        };
        assert!(xpath.starts_with(".//"));
        assert!(xpath.contains("'Vector Similarity Analysis'"));
    }

    #[test]
    fn composites_have_no_leaf_selector() {
        assert_eq!(Locator::css("textarea").first().leaf_selector(), None);
        let scoped = Locator::test_id("outliers-table").within(Locator::test_id("header-0"));
        assert_eq!(scoped.leaf_selector(), None);
    }

    #[test]
    fn xpath_string_handles_both_quote_kinds() {
        assert_eq!(xpath_string("plain"), "'plain'");
        assert_eq!(xpath_string("it's"), "\"it's\"");
        assert_eq!(xpath_string(r#"a'b"c"#), r#"concat('a', "'", 'b"c')"#);
    }

    #[test]
    fn display_describes_composites() {
        let locator = Locator::test_id("outliers-table")
            .first()
            .within(Locator::test_id("header-0"));
        assert_eq!(
            locator.to_string(),
            "testid `header-0` within first(testid `outliers-table`)"
        );
    }
}
