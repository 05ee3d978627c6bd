//! Instruments script text so that every computed property access
//! (`object[expr]`) routes its key through a named runtime hook before the
//! access completes.
//!
//! The pipeline is `ContentGate` → `source::parse_program` →
//! `transform::rewrite` → `source::print_program`. The hook itself is
//! installed into each frame by a [`frame::FrameHost`] using the script
//! produced by [`hook::installer_script`].

pub mod config;
pub mod error;
pub mod frame;
pub mod gate;
pub mod hook;
pub mod intercept;
mod markup;
pub mod source;
pub mod syntax;
pub mod transform;

pub use config::{ContentTypeRule, InstrumentConfig};
pub use error::{ConfigError, InterceptError};
pub use frame::{FrameHost, FrameId, FrameSetup, Installation};
pub use gate::{ContentGate, GateOutput, Outcome, RegionReport};
pub use hook::{HookArg, HookIdentifier, Report, ReportSink, ReportingHook, SENSITIVE_KEYS};
pub use intercept::{Header, InterceptedBody, Interceptor, ResponseBody};
pub use source::{instrument_source, ParseError};
pub use syntax::{Origin, SourceRegion, SyntaxNode};
pub use transform::{rewrite, rewrite_expr, ComputedAccessRewriter};
