//! The runtime side of the rewrite: the global function every wrapped key
//! is passed through.
//!
//! The hook is identity on its argument. For the two prototype-sensitive
//! keys it additionally emits a one-way report; emission never blocks and
//! never fails the access. [`ReportingHook`] is the host-side model of that
//! behaviour (for hosts that route the binding back into Rust) and
//! [`installer_script`] is the in-page version.

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use swc_core::ecma::ast::Ident;

use crate::error::ConfigError;

pub const SENSITIVE_KEYS: [&str; 2] = ["__proto__", "constructor"];

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

/// Name of the global function rewritten code calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HookIdentifier(String);

impl HookIdentifier {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if !IDENTIFIER_RE.is_match(&name) {
            return Err(ConfigError::InvalidHookIdentifier { name, reason: "not an ASCII identifier" });
        }
        // reserved words match the pattern but cannot be called by name
        if Ident::verify_symbol(&name).is_err() {
            return Err(ConfigError::InvalidHookIdentifier { name, reason: "reserved word" });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HookIdentifier {
    fn default() -> Self {
        Self(crate::config::DEFAULT_HOOK_IDENTIFIER.to_string())
    }
}

impl fmt::Display for HookIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HookIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        HookIdentifier::new(raw).map_err(serde::de::Error::custom)
    }
}

pub fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS.contains(&key)
}

// -----------------------------------------------------------------------------
// Host-side model
// -----------------------------------------------------------------------------

/// The runtime value a wrapped access passes to the hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookArg {
    Text(String),
    Number(f64),
    /// Symbol with its optional description.
    Symbol(Option<String>),
    Other,
}

/// Wire payload: `{"arg": <key>, "url": <document location>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub arg: String,
    pub url: String,
}

impl Report {
    pub fn to_wire(&self) -> String {
        // two string fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }
}

/// Fire-and-forget report delivery. Implementations must not block the
/// caller, must not panic and have no way to signal failure.
pub trait ReportSink {
    fn deliver(&self, report: Report);
}

impl ReportSink for Sender<Report> {
    fn deliver(&self, report: Report) {
        // receiver gone: nobody is listening, drop it
        let _ = self.send(report);
    }
}

/// Logs every report at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn deliver(&self, report: Report) {
        tracing::warn!(arg = %report.arg, url = %report.url, "sensitive computed key");
    }
}

pub struct ReportingHook<S> {
    sink: S,
}

impl<S: ReportSink> ReportingHook<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns `key` unchanged. Reports it first when it is a sensitive
    /// string.
    pub fn invoke(&self, key: HookArg, location: &str) -> HookArg {
        if let HookArg::Text(text) = &key {
            if is_sensitive(text) {
                self.sink.deliver(Report { arg: text.clone(), url: location.to_string() });
            }
        }
        key
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

// -----------------------------------------------------------------------------
// In-page installer
// -----------------------------------------------------------------------------

/// Script a frame host evaluates in every frame before the frame's own
/// scripts. Defines `hook` as a non-writable, non-enumerable,
/// non-configurable global; evaluating it twice in the same frame is a
/// no-op.
pub fn installer_script(hook: &HookIdentifier, endpoint: &str) -> String {
    let name = serde_json::to_string(hook.as_str()).unwrap_or_else(|_| "\"\"".into());
    let endpoint = serde_json::to_string(endpoint).unwrap_or_else(|_| "\"\"".into());
    let keys = serde_json::to_string(&SENSITIVE_KEYS).unwrap_or_else(|_| "[]".into());
    format!(
        "(function(){{try{{\
var g=(typeof globalThis!=='undefined'?globalThis:window);\
var n={name};\
if(Object.prototype.hasOwnProperty.call(g,n))return;\
var s={keys};var e={endpoint};\
var r=function(k){{try{{\
var b=JSON.stringify({{arg:k,url:String(g.location&&g.location.href)}});\
if(g.navigator&&typeof g.navigator.sendBeacon==='function'){{g.navigator.sendBeacon(e,b);}}\
else if(typeof g.fetch==='function'){{g.fetch(e,{{method:'POST',body:b,keepalive:true,mode:'no-cors'}}).catch(function(){{}});}}\
}}catch(_e){{}}}};\
var h=function(k){{if(typeof k==='string'){{for(var i=0;i<s.length;i++){{if(s[i]===k){{r(k);break;}}}}}}return k;}};\
Object.defineProperty(g,n,{{value:h,writable:false,enumerable:false,configurable:false}});\
}}catch(_e){{}}}})();"
    )
}
