//! Glue for hosts that pause responses and hand over the raw body, possibly
//! base64-encoded, with its headers. Decodes, runs the gate, re-encodes the
//! same way.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::config::InstrumentConfig;
use crate::error::InterceptError;
use crate::gate::{ContentGate, Outcome};

#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ResponseBody {
    pub body: String,
    pub base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedBody {
    /// Encoded exactly like the input body.
    pub body: String,
    pub outcome: Outcome,
}

pub struct Interceptor {
    gate: ContentGate,
}

impl Interceptor {
    pub fn new(gate: ContentGate) -> Self {
        Self { gate }
    }

    pub fn from_config(config: &InstrumentConfig) -> Self {
        Self::new(ContentGate::from_config(config))
    }

    pub fn gate(&self) -> &ContentGate {
        &self.gate
    }

    /// Content type of the response if some rule selects it.
    fn eligible_content_type<'h>(&self, headers: &'h [Header]) -> Option<&'h str> {
        headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.as_str())
            .find(|v| self.gate.select(v).is_some())
    }

    pub fn maybe_modify_response(
        &self,
        original: &ResponseBody,
        headers: &[Header],
    ) -> Result<InterceptedBody, InterceptError> {
        let Some(content_type) = self.eligible_content_type(headers) else {
            return Ok(InterceptedBody { body: original.body.clone(), outcome: Outcome::Passthrough });
        };

        let decoded: Cow<'_, str> = if original.base64_encoded {
            let bytes = STANDARD.decode(original.body.as_bytes())?;
            Cow::Owned(String::from_utf8(bytes)?)
        } else {
            Cow::Borrowed(original.body.as_str())
        };

        let out = self.gate.process(&decoded, content_type);
        debug!(content_type, outcome = ?out.outcome, "processed response");

        let body = match (&out.text, original.base64_encoded) {
            // untouched: hand back the original bytes verbatim
            (Cow::Borrowed(_), _) => original.body.clone(),
            (Cow::Owned(text), true) => STANDARD.encode(text),
            (Cow::Owned(text), false) => text.clone(),
        };
        Ok(InterceptedBody { body, outcome: out.outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::normalize_source;

    fn headers(content_type: &str) -> Vec<Header> {
        vec![
            Header { name: "Cache-Control".into(), value: "no-store".into() },
            Header { name: "Content-Type".into(), value: content_type.into() },
        ]
    }

    fn interceptor() -> Interceptor {
        Interceptor::from_config(&InstrumentConfig::default())
    }

    #[test]
    fn plain_bodies_are_rewritten() {
        let body = ResponseBody { body: "o[k];".into(), base64_encoded: false };
        let out = interceptor()
            .maybe_modify_response(&body, &headers("text/javascript"))
            .expect("intercepts");
        assert_eq!(out.outcome, Outcome::Rewritten);
        assert_eq!(out.body, normalize_source("o[peekz(k)];").expect("parses"));
    }

    #[test]
    fn base64_bodies_are_reencoded() {
        let body = ResponseBody { body: STANDARD.encode("o[k];"), base64_encoded: true };
        let out = interceptor()
            .maybe_modify_response(&body, &headers("text/javascript"))
            .expect("intercepts");
        let decoded = String::from_utf8(STANDARD.decode(out.body).expect("base64")).expect("utf8");
        assert_eq!(decoded, normalize_source("o[peekz(k)];").expect("parses"));
    }

    #[test]
    fn ineligible_responses_are_not_decoded() {
        // not valid base64, but the content type never selects it
        let body = ResponseBody { body: "%%%".into(), base64_encoded: true };
        let out = interceptor()
            .maybe_modify_response(&body, &headers("image/png"))
            .expect("passes through");
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert_eq!(out.body, "%%%");
    }

    #[test]
    fn missing_content_type_passes_through() {
        let body = ResponseBody { body: "o[k]".into(), base64_encoded: false };
        let out = interceptor().maybe_modify_response(&body, &[]).expect("passes through");
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert_eq!(out.body, "o[k]");
    }

    #[test]
    fn parse_errors_return_the_original_encoding() {
        let encoded = STANDARD.encode("function (");
        let body = ResponseBody { body: encoded.clone(), base64_encoded: true };
        let out = interceptor()
            .maybe_modify_response(&body, &headers("text/javascript"))
            .expect("intercepts");
        assert_eq!(out.outcome, Outcome::ParseError);
        assert_eq!(out.body, encoded);
    }

    #[test]
    fn malformed_base64_is_an_error() {
        let body = ResponseBody { body: "not base64!".into(), base64_encoded: true };
        let err = interceptor()
            .maybe_modify_response(&body, &headers("text/javascript"))
            .expect_err("bad base64");
        assert!(matches!(err, InterceptError::Base64(_)));
    }
}
