//! Parse and print. The rewriter never sees text, only swc trees.

use swc_core::{
    common::{sync::Lrc, FileName, Globals, SourceFile, SourceMap, Span, Spanned, GLOBALS},
    ecma::{
        ast::{EsVersion, Program},
        codegen::to_code_default,
        parser::{parse_file_as_program, EsSyntax, Syntax},
    },
};

use crate::hook::HookIdentifier;
use crate::transform::rewrite;

/// The region's text is not a valid script or module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at {line}:{col} (bytes {lo}..{hi}): {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offsets relative to the start of the region.
    pub lo: u32,
    pub hi: u32,
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    fn at(cm: &SourceMap, fm: &SourceFile, span: Span, message: String) -> Self {
        let base = fm.start_pos.0;
        let (line, col) = if span.is_dummy() {
            (0, 0)
        } else {
            let loc = cm.lookup_char_pos(span.lo());
            (loc.line, loc.col_display)
        };
        Self {
            message,
            lo: span.lo().0.saturating_sub(base),
            hi: span.hi().0.saturating_sub(base),
            line,
            col,
        }
    }
}

/// Parses `text` as a script, or as a module when it contains module syntax.
///
/// Errors the parser recovers from are still reported: a region either
/// parses cleanly or is left alone.
pub fn parse_program(text: &str) -> Result<(Lrc<SourceMap>, Program), ParseError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon.into(), text.to_string());

    let mut recovered = vec![];
    let parsed = parse_file_as_program(
        &fm,
        Syntax::Es(EsSyntax::default()),
        EsVersion::EsNext,
        None,
        &mut recovered,
    );

    let program = match parsed {
        Ok(program) => program,
        Err(err) => {
            let message = err.kind().msg().to_string();
            return Err(ParseError::at(&cm, &fm, err.span(), message));
        }
    };
    if let Some(err) = recovered.into_iter().next() {
        let message = err.kind().msg().to_string();
        return Err(ParseError::at(&cm, &fm, err.span(), message));
    }
    Ok((cm, program))
}

pub fn print_program(cm: Lrc<SourceMap>, program: &Program) -> String {
    to_code_default(cm, None, program)
}

/// Parse, rewrite and print one region.
pub fn instrument_source(text: &str, hook: &HookIdentifier) -> Result<String, ParseError> {
    GLOBALS.set(&Globals::new(), || {
        let (cm, program) = parse_program(text)?;
        let program = rewrite(program, hook);
        Ok(print_program(cm, &program))
    })
}

/// Parse and print without rewriting. Used to compare rewritten output
/// against hand-written expectations in the same printed form.
pub fn normalize_source(text: &str) -> Result<String, ParseError> {
    GLOBALS.set(&Globals::new(), || {
        let (cm, program) = parse_program(text)?;
        Ok(print_program(cm, &program))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_module_syntax() {
        let (_, program) = parse_program("import x from 'y'; x[k];").expect("parses");
        assert!(matches!(program, Program::Module(_)));
        let (_, program) = parse_program("x[k];").expect("parses");
        assert!(matches!(program, Program::Script(_)));
    }

    #[test]
    fn reports_offsets_relative_to_the_region() {
        let Err(err) = parse_program("let a = ;") else { panic!("`let a = ;` parsed") };
        assert!(err.lo <= 9, "lo = {}", err.lo);
        assert_eq!(err.line, 1);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn normalizing_is_stable() {
        let once = normalize_source("a [ b ]  ;x.y").expect("parses");
        let twice = normalize_source(&once).expect("parses");
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_text_is_an_empty_program() {
        assert_eq!(normalize_source("").expect("parses").trim(), "");
    }
}
