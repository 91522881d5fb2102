use crate::browser::{BrowserSession, PageExtractor};
use crate::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const MOBILE_SCRIPT: &str = r#"(() => {
  const viewportMeta = document.querySelector('meta[name="viewport"]');
  const fontSize = document.body ? parseFloat(window.getComputedStyle(document.body).fontSize) : NaN;
  return {
    hasViewportMeta: !!viewportMeta,
    viewportContent: viewportMeta ? viewportMeta.getAttribute('content') : null,
    touchTargets: document.querySelectorAll('button, a, input, [onclick]').length,
    textSize: isNaN(fontSize) ? null : fontSize,
    contentWidth: document.documentElement.scrollWidth,
    viewportWidth: window.innerWidth,
    hasHamburgerMenu: !!document.querySelector('[class*="hamburger"], [class*="menu-toggle"], [class*="nav-toggle"]'),
    hasMobileSpecificElements: !!document.querySelector('[class*="mobile"], [class*="touch"]')
  };
})()"#;

/// Horizontal overflow tolerated before a page counts as non-responsive.
const RESPONSIVE_SLACK_PX: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MobileSnapshot {
    pub has_viewport_meta: bool,
    pub viewport_content: Option<String>,
    pub touch_targets: usize,
    pub text_size: Option<f64>,
    pub content_width: u32,
    pub viewport_width: u32,
    pub has_hamburger_menu: bool,
    pub has_mobile_specific_elements: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileReport {
    pub has_viewport_meta: bool,
    pub viewport_content: Option<String>,
    pub touch_targets: usize,
    /// Computed body font size in CSS pixels
    pub text_size: Option<f64>,
    pub content_width: u32,
    pub viewport_width: u32,
    pub width_ratio: f64,
    pub is_responsive: bool,
    pub has_hamburger_menu: bool,
    pub has_mobile_specific_elements: bool,
}

impl From<MobileSnapshot> for MobileReport {
    fn from(s: MobileSnapshot) -> Self {
        let width_ratio = if s.viewport_width == 0 {
            0.0
        } else {
            crate::utils::round2(s.content_width as f64 / s.viewport_width as f64)
        };
        Self {
            is_responsive: s.viewport_width > 0
                && s.content_width <= s.viewport_width + RESPONSIVE_SLACK_PX,
            width_ratio,
            has_viewport_meta: s.has_viewport_meta,
            viewport_content: s.viewport_content,
            touch_targets: s.touch_targets,
            text_size: s.text_size,
            content_width: s.content_width,
            viewport_width: s.viewport_width,
            has_hamburger_menu: s.has_hamburger_menu,
            has_mobile_specific_elements: s.has_mobile_specific_elements,
        }
    }
}

/// Runs inside a session launched with the mobile viewport.
pub struct MobileExtractor;

#[async_trait]
impl PageExtractor for MobileExtractor {
    type Output = MobileReport;

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<MobileReport, ProbeError> {
        session.navigate(url).await?;
        let raw = session.evaluate(MOBILE_SCRIPT).await?;
        let snapshot: MobileSnapshot =
            serde_json::from_value(raw).map_err(|e| ProbeError::ParseError(e.to_string()))?;
        Ok(snapshot.into())
    }
}
