// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Media query evaluation against a simulated viewport
//!
//! Covers the subset used by responsive content rules: media types, width and
//! height ranges, orientation, resolution and the vendor-prefixed
//! device-pixel-ratio features. Feature parentheses are optional, so
//! conditions whose parentheses were stripped by the rule parser still
//! evaluate the same way.

use super::EnvironmentMatcher;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// CSS pixels per inch
const CSS_DPI: f64 = 96.0;
/// Pixels per `em`/`rem` at the default font size
const EM_PX: f64 = 16.0;
const CM_PER_INCH: f64 = 2.54;

static AND_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+and\s+").unwrap());
static NUMERIC_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]*\.?[0-9]+)(?:\s*/\s*([0-9]*\.?[0-9]+))?\s*([a-z]*)$").unwrap()
});

/// Simulated rendering environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
    /// Device pixels per CSS pixel
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// Create a viewport with a device pixel ratio of 1
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    /// Set the device pixel ratio
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Range {
    Min,
    Max,
    Exact,
}

/// [`EnvironmentMatcher`] evaluating media queries against a [`Viewport`]
#[derive(Debug, Default)]
pub struct MediaQueryMatcher {
    viewport: RwLock<Viewport>,
}

impl MediaQueryMatcher {
    /// Create a matcher for the given viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: RwLock::new(viewport),
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        *self.viewport.read()
    }

    /// Replace the viewport, as a window resize would
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.write() = viewport;
    }

    /// Evaluate a comma-separated media query list; any query may match
    pub fn evaluate(&self, query_list: &str) -> bool {
        let viewport = self.viewport();
        let query_list = query_list.trim().to_ascii_lowercase();
        if query_list.is_empty() {
            return true;
        }
        query_list
            .split(',')
            .any(|query| evaluate_query(&viewport, query.trim()))
    }
}

impl EnvironmentMatcher for MediaQueryMatcher {
    fn matches(&self, condition: &str) -> bool {
        let matched = self.evaluate(condition);
        log::trace!("Condition '{condition}' -> {matched}");
        matched
    }
}

fn evaluate_query(viewport: &Viewport, query: &str) -> bool {
    if query.is_empty() {
        return false;
    }

    let (negated, query) = match query.strip_prefix("not ") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, query.strip_prefix("only ").unwrap_or(query).trim_start()),
    };

    let matched = AND_SEPARATOR
        .split(query)
        .enumerate()
        .all(|(index, part)| evaluate_part(viewport, part.trim(), index == 0));

    matched != negated
}

fn evaluate_part(viewport: &Viewport, part: &str, first: bool) -> bool {
    let is_feature = part.starts_with('(') || part.contains(':');
    if first && !is_feature {
        return matches!(part, "all" | "screen");
    }

    let feature = part.trim_start_matches('(').trim_end_matches(')').trim();
    match feature.split_once(':') {
        Some((name, value)) => evaluate_feature(viewport, name.trim(), value.trim()),
        None => false,
    }
}

fn evaluate_feature(viewport: &Viewport, name: &str, value: &str) -> bool {
    let name = normalize_vendor_prefix(name);
    let (range, feature) = if let Some(rest) = name.strip_prefix("min-") {
        (Range::Min, rest)
    } else if let Some(rest) = name.strip_prefix("max-") {
        (Range::Max, rest)
    } else {
        (Range::Exact, name.as_str())
    };

    if feature == "orientation" {
        let landscape = viewport.width >= viewport.height;
        return range == Range::Exact
            && match value {
                "landscape" => landscape,
                "portrait" => !landscape,
                _ => false,
            };
    }

    let actual = match feature {
        "width" | "device-width" => f64::from(viewport.width),
        "height" | "device-height" => f64::from(viewport.height),
        "resolution" | "device-pixel-ratio" => viewport.device_pixel_ratio,
        _ => return false,
    };

    let Some(expected) = parse_value(feature, value) else {
        return false;
    };

    match range {
        Range::Min => actual >= expected,
        Range::Max => actual <= expected,
        Range::Exact => (actual - expected).abs() < f64::EPSILON,
    }
}

/// Fold `-webkit-`, `-o-` and `--moz-` spellings into the standard name
fn normalize_vendor_prefix(name: &str) -> String {
    let name = name
        .strip_prefix("-webkit-")
        .or_else(|| name.strip_prefix("-o-"))
        .or_else(|| name.strip_prefix("-moz-"))
        .unwrap_or(name);
    name.replace("--moz-", "-")
}

/// Convert a feature value to pixels (lengths) or device pixels per CSS
/// pixel (resolutions)
fn parse_value(feature: &str, value: &str) -> Option<f64> {
    let captures = NUMERIC_VALUE.captures(value)?;
    let mut number: f64 = captures.get(1)?.as_str().parse().ok()?;
    if let Some(denominator) = captures.get(2) {
        let denominator: f64 = denominator.as_str().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        number /= denominator;
    }
    let unit = captures.get(3).map_or("", |m| m.as_str());

    match feature {
        "resolution" => match unit {
            "dppx" | "x" => Some(number),
            "dpi" => Some(number / CSS_DPI),
            "dpcm" => Some(number * CM_PER_INCH / CSS_DPI),
            _ => None,
        },
        "device-pixel-ratio" => unit.is_empty().then_some(number),
        _ => match unit {
            "px" | "" => Some(number),
            "em" | "rem" => Some(number * EM_PX),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{
        DEFAULT_CONDITION, LARGE_CONDITION, MEDIUM_CONDITION, RETINA_CONDITION, SMALL_CONDITION,
    };
    use rstest::rstest;

    #[rstest]
    #[case(320, SMALL_CONDITION, true)]
    #[case(640, SMALL_CONDITION, true)]
    #[case(641, SMALL_CONDITION, false)]
    #[case(641, MEDIUM_CONDITION, true)]
    #[case(1024, MEDIUM_CONDITION, true)]
    #[case(1025, MEDIUM_CONDITION, false)]
    #[case(1025, LARGE_CONDITION, true)]
    #[case(800, LARGE_CONDITION, false)]
    #[case(100, DEFAULT_CONDITION, true)]
    fn test_viewport_bands(#[case] width: u32, #[case] condition: &str, #[case] expected: bool) {
        let matcher = MediaQueryMatcher::new(Viewport::new(width, 600));
        assert_eq!(matcher.matches(condition), expected);
    }

    #[test]
    fn test_retina_matches_any_prefix() {
        let matcher = MediaQueryMatcher::new(Viewport::new(800, 600).with_device_pixel_ratio(2.0));
        assert!(matcher.matches(RETINA_CONDITION));
        matcher.set_viewport(Viewport::new(800, 600));
        assert!(!matcher.matches(RETINA_CONDITION));
    }

    #[test]
    fn test_stripped_parentheses_still_evaluate() {
        let matcher = MediaQueryMatcher::new(Viewport::new(500, 600));
        assert!(matcher.matches("only screen and max-width: 640px"));
        assert!(matcher.matches("max-width:40em"));
    }

    #[test]
    fn test_media_types_and_negation() {
        let matcher = MediaQueryMatcher::new(Viewport::default());
        assert!(matcher.matches("all"));
        assert!(!matcher.matches("print"));
        assert!(matcher.matches("not print"));
        assert!(matcher.matches("print, screen"));
        assert!(matcher.matches(""));
    }

    #[test]
    fn test_orientation_and_resolution() {
        let matcher = MediaQueryMatcher::new(Viewport::new(400, 800).with_device_pixel_ratio(3.0));
        assert!(matcher.matches("(orientation: portrait)"));
        assert!(!matcher.matches("(orientation: landscape)"));
        assert!(matcher.matches("(min-resolution: 288dpi)"));
        assert!(matcher.matches("(-o-min-device-pixel-ratio: 5/2)"));
        assert!(!matcher.matches("(max-resolution: 2x)"));
    }

    #[test]
    fn test_unknown_features_never_match() {
        let matcher = MediaQueryMatcher::new(Viewport::default());
        assert!(!matcher.matches("(hover: hover)"));
        assert!(!matcher.matches("(min-width: wide)"));
        assert!(!matcher.matches("small"));
    }
}
