//! Decides which bodies get rewritten and how.

use std::borrow::Cow;

use tracing::{debug, trace, warn};

use crate::config::{ContentTypeRule, InstrumentConfig};
use crate::hook::HookIdentifier;
use crate::markup::rewrite_inline_scripts;
use crate::source::{instrument_source, ParseError};
use crate::syntax::{Origin, SourceRegion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rewritten,
    Passthrough,
    ParseError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    pub origin: Origin,
    pub error: Option<ParseError>,
}

impl RegionReport {
    pub fn is_rewritten(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct GateOutput<'a> {
    /// Borrowed whenever the body is returned as is.
    pub text: Cow<'a, str>,
    pub outcome: Outcome,
    pub regions: Vec<RegionReport>,
}

impl<'a> GateOutput<'a> {
    fn passthrough(body: &'a str, regions: Vec<RegionReport>) -> Self {
        Self { text: Cow::Borrowed(body), outcome: Outcome::Passthrough, regions }
    }

    pub fn into_text(self) -> Cow<'a, str> {
        self.text
    }
}

pub struct ContentGate {
    rules: Vec<ContentTypeRule>,
    hook: HookIdentifier,
}

impl ContentGate {
    pub fn new(rules: Vec<ContentTypeRule>, hook: HookIdentifier) -> Self {
        Self { rules, hook }
    }

    pub fn from_config(config: &InstrumentConfig) -> Self {
        Self::new(config.content_types.clone(), config.hook_identifier.clone())
    }

    pub fn hook(&self) -> &HookIdentifier {
        &self.hook
    }

    /// First rule, in configured order, whose needle occurs in the header.
    pub fn select(&self, content_type: &str) -> Option<&ContentTypeRule> {
        self.rules.iter().find(|r| content_type.contains(r.match_substring.as_str()))
    }

    /// Rewrites `body` according to `content_type`. Never fails: a region that
    /// does not parse keeps its original text and is reported in `regions`.
    pub fn process<'a>(&self, body: &'a str, content_type: &'a str) -> GateOutput<'a> {
        let Some(rule) = self.select(content_type) else {
            trace!(content_type, "no rule matches, passing through");
            return GateOutput::passthrough(body, vec![]);
        };
        if rule.is_markup {
            self.process_markup(body, content_type)
        } else {
            self.process_script(SourceRegion::whole_body(body, content_type))
        }
    }

    fn instrument(&self, region: &SourceRegion<'_>) -> Result<String, ParseError> {
        let result = instrument_source(region.text, &self.hook);
        match &result {
            Ok(_) => debug!(origin = ?region.origin, bytes = region.text.len(), "rewrote region"),
            Err(err) => warn!(
                origin = ?region.origin,
                content_type = region.content_type,
                %err,
                "region does not parse, leaving it unchanged"
            ),
        }
        result
    }

    fn process_script<'a>(&self, region: SourceRegion<'a>) -> GateOutput<'a> {
        match self.instrument(&region) {
            Ok(text) => GateOutput {
                text: Cow::Owned(text),
                outcome: Outcome::Rewritten,
                regions: vec![RegionReport { origin: region.origin, error: None }],
            },
            Err(err) => GateOutput {
                text: Cow::Borrowed(region.text),
                outcome: Outcome::ParseError,
                regions: vec![RegionReport { origin: region.origin, error: Some(err) }],
            },
        }
    }

    fn process_markup<'a>(&self, body: &'a str, content_type: &str) -> GateOutput<'a> {
        let rewrite = rewrite_inline_scripts(body, |index, text| {
            self.instrument(&SourceRegion::inline_script(text, content_type, index))
        });

        let regions: Vec<RegionReport> = rewrite
            .results
            .into_iter()
            .enumerate()
            .map(|(index, r)| RegionReport { origin: Origin::InlineScript { index }, error: r.err() })
            .collect();

        match rewrite.html {
            Some(html) => GateOutput { text: Cow::Owned(html), outcome: Outcome::Rewritten, regions },
            None if regions.iter().any(|r| r.error.is_some()) => GateOutput {
                text: Cow::Borrowed(body),
                outcome: Outcome::ParseError,
                regions,
            },
            None => GateOutput::passthrough(body, regions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::normalize_source;

    fn gate() -> ContentGate {
        ContentGate::from_config(&InstrumentConfig::default())
    }

    #[test]
    fn unmatched_content_types_pass_through_by_reference() {
        let body = "a[b]";
        let out = gate().process(body, "image/png");
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert!(out.regions.is_empty());
        match out.text {
            Cow::Borrowed(s) => assert!(std::ptr::eq(s, body)),
            Cow::Owned(_) => panic!("body was copied"),
        }
    }

    #[test]
    fn javascript_bodies_are_one_region() {
        let out = gate().process("obj[key];", "text/javascript; charset=utf-8");
        assert_eq!(out.outcome, Outcome::Rewritten);
        assert_eq!(out.regions, vec![RegionReport { origin: Origin::WholeBody, error: None }]);
        assert_eq!(out.text, normalize_source("obj[peekz(key)];").expect("parses"));
    }

    #[test]
    fn content_type_may_be_a_shorter_lived_borrow() {
        let body = "p[q]; r.s;";
        let out = {
            let header = String::from("application/javascript");
            gate().process(body, &header).into_text().into_owned()
        };
        assert_eq!(out, normalize_source("p[peekz(q)]; r.s;").expect("parses"));

        let header = String::from("image/png");
        let passed = gate().process(body, &header);
        assert!(matches!(passed.text, Cow::Borrowed(s) if std::ptr::eq(s, body)));
    }

    #[test]
    fn unparseable_javascript_is_returned_unchanged() {
        let body = "function (";
        let out = gate().process(body, "text/javascript");
        assert_eq!(out.outcome, Outcome::ParseError);
        assert_eq!(out.text, body);
        assert!(out.regions[0].error.is_some());
    }

    #[test]
    fn rules_are_checked_in_order() {
        let hook = HookIdentifier::new("h").expect("valid");
        let gate = ContentGate::new(
            vec![ContentTypeRule::script("javascript"), ContentTypeRule::markup("text")],
            hook,
        );
        assert!(!gate.select("text/javascript").expect("rule").is_markup);
        assert!(gate.select("text/html").expect("rule").is_markup);
        assert!(gate.select("image/gif").is_none());
    }

    #[test]
    fn markup_rewrites_inline_scripts_only() {
        let html = r#"<html><head><script src="https://cdn.test/lib.js"></script></head><body><script>a[b]</script></body></html>"#;
        let out = gate().process(html, "text/html; charset=utf-8");
        assert_eq!(out.outcome, Outcome::Rewritten);
        assert_eq!(out.regions.len(), 1);
        assert!(out.text.contains(r#"<script src="https://cdn.test/lib.js"></script>"#), "{}", out.text);
        let expected = normalize_source("a[peekz(b)]").expect("parses");
        assert!(out.text.contains(&format!("<script>{expected}</script>")), "{}", out.text);
    }

    #[test]
    fn markup_isolates_failing_scripts() {
        let html = "<body><script>if (</script><script>x[y]</script></body>";
        let out = gate().process(html, "text/html");
        assert_eq!(out.outcome, Outcome::Rewritten);
        assert!(out.text.contains("<script>if (</script>"));
        assert!(out.regions[0].error.is_some());
        assert!(out.regions[1].is_rewritten());
        assert_eq!(out.regions[1].origin, Origin::InlineScript { index: 1 });
    }

    #[test]
    fn markup_without_inline_scripts_passes_through() {
        let html = "<p>hello</p>";
        let out = gate().process(html, "text/html");
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert!(matches!(out.text, Cow::Borrowed(_)));
    }

    #[test]
    fn json_data_blocks_pass_through() {
        let html = r#"<body><script type="application/json">{"k": [1, 2]}</script></body>"#;
        let out = gate().process(html, "text/html");
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert!(out.regions.is_empty());
        assert_eq!(out.text, html);
    }

    #[test]
    fn markup_with_only_failures_is_a_parse_error() {
        let html = "<script>{</script>";
        let out = gate().process(html, "text/html");
        assert_eq!(out.outcome, Outcome::ParseError);
        assert_eq!(out.text, html);
    }
}
