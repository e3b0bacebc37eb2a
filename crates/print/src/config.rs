//! Print options and the per-node customization hook.

use std::fmt;
use std::sync::Arc;

use isoprint_dom::NodeHandle;
use regex::Regex;
use serde::Deserialize;

use crate::error::PrintResult;

/// Properties left out of frozen styles: transitions, animations, scroll
/// and overscroll behavior, cursor, pointer events and intrinsic inline
/// sizing, with or without a vendor prefix.
pub const DEFAULT_EXCLUDE_PATTERN: &str =
    r"^(-(webkit|moz|ms|o)-)?(transition|scroll|overscroll|cursor|animation|inline-size|pointer-events)";

lazy_static::lazy_static! {
    pub static ref DEFAULT_EXCLUDE: Regex =
        Regex::new(DEFAULT_EXCLUDE_PATTERN).expect("default exclusion pattern compiles");
}

/// Style and class about to be assigned to a cloned node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleArgs {
    pub css_text: String,
    pub class_name: String,
}

impl StyleArgs {
    pub fn new(css_text: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            css_text: css_text.into(),
            class_name: class_name.into(),
        }
    }
}

/// What a hook decided for one node
#[derive(Debug, Clone)]
pub enum HookOutcome {
    /// Keep the (possibly edited in place) arguments
    Unchanged,
    /// Use these arguments instead
    Override(StyleArgs),
    /// Put this node in the output instead of the clone
    Replace(NodeHandle),
}

/// Called with the source node, its clone and the default style arguments
pub type NodeHook = Arc<dyn Fn(&NodeHandle, &NodeHandle, &mut StyleArgs) -> HookOutcome + Send + Sync>;

/// Options for one print call
#[derive(Clone)]
pub struct PrintOptions {
    /// Rebuild the target's ancestor chain around the clone
    pub wrap: bool,
    /// Properties matching this pattern are not frozen
    pub exclude_style_pattern: Regex,
    pub on_node: Option<NodeHook>,
    /// Keep the render surface visible and alive after printing
    pub debug: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            wrap: false,
            exclude_style_pattern: DEFAULT_EXCLUDE.clone(),
            on_node: None,
            debug: false,
        }
    }
}

impl fmt::Debug for PrintOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintOptions")
            .field("wrap", &self.wrap)
            .field("exclude_style_pattern", &self.exclude_style_pattern.as_str())
            .field("on_node", &self.on_node.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonOptions {
    #[serde(default)]
    wrap: bool,
    #[serde(default)]
    exclude_style_pattern: Option<String>,
    #[serde(default)]
    debug: bool,
}

impl PrintOptions {
    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn exclude_style_pattern(mut self, pattern: &str) -> PrintResult<Self> {
        self.exclude_style_pattern = Regex::new(pattern)?;
        Ok(self)
    }

    pub fn on_node<F>(mut self, hook: F) -> Self
    where
        F: Fn(&NodeHandle, &NodeHandle, &mut StyleArgs) -> HookOutcome + Send + Sync + 'static,
    {
        self.on_node = Some(Arc::new(hook));
        self
    }

    /// Read `wrap`, `excludeStylePattern` and `debug` from a JSON object.
    /// Other keys are ignored.
    pub fn from_json(json: &str) -> PrintResult<Self> {
        let raw: JsonOptions = serde_json::from_str(json)?;
        let options = PrintOptions::default().wrap(raw.wrap).debug(raw.debug);
        match raw.exclude_style_pattern {
            Some(pattern) => options.exclude_style_pattern(&pattern),
            None => Ok(options),
        }
    }
}

/// A bare hook is shorthand for options with only `on_node` set.
impl<F> From<F> for PrintOptions
where
    F: Fn(&NodeHandle, &NodeHandle, &mut StyleArgs) -> HookOutcome + Send + Sync + 'static,
{
    fn from(hook: F) -> Self {
        PrintOptions::default().on_node(hook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;

    #[test]
    fn test_default_pattern() {
        for name in [
            "transition-duration",
            "-webkit-transition",
            "animation-name",
            "-moz-animation",
            "scroll-behavior",
            "overscroll-behavior-x",
            "cursor",
            "pointer-events",
            "inline-size",
        ] {
            assert!(DEFAULT_EXCLUDE.is_match(name), "{} should be excluded", name);
        }
        for name in ["color", "display", "transform", "background-color", "overflow-x"] {
            assert!(!DEFAULT_EXCLUDE.is_match(name), "{} should be kept", name);
        }
    }

    #[test]
    fn test_from_json() {
        let options =
            PrintOptions::from_json(r#"{"wrap": true, "excludeStylePattern": "^color$", "unknown": 3}"#)
                .unwrap();
        assert!(options.wrap);
        assert!(!options.debug);
        assert!(options.exclude_style_pattern.is_match("color"));
        assert!(options.on_node.is_none());

        let options = PrintOptions::from_json("{}").unwrap();
        assert_eq!(options.exclude_style_pattern.as_str(), DEFAULT_EXCLUDE_PATTERN);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            PrintOptions::from_json(r#"{"excludeStylePattern": "("}"#),
            Err(PrintError::InvalidPattern(_))
        ));
        assert!(matches!(
            PrintOptions::from_json(r#"{"wrap": "yes"}"#),
            Err(PrintError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_closure_is_on_node_sugar() {
        let options: PrintOptions =
            (|_: &NodeHandle, _: &NodeHandle, _: &mut StyleArgs| HookOutcome::Unchanged).into();
        assert!(options.on_node.is_some());
        assert!(!options.wrap);
        assert!(!options.debug);
    }
}
