//! Output formatting for emitted TypeScript.
//!
//! Each file is parsed as a TypeScript module with `oxc_parser` and printed
//! back with `oxc_codegen`, so the written layout is canonical and every
//! formatted file is known to parse. Syntax errors are reported as a
//! [`FormatError`]; the generator keeps the raw text in that case.

use crate::error::FormatError;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Formats emitted TypeScript.
///
/// # Errors
/// Returns [`FormatError::Syntax`] if `source` does not parse as a
/// TypeScript module.
pub fn format_typescript(source: &str) -> Result<String, FormatError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(FormatError::Syntax {
            errors: ret.errors.len(),
            message: ret
                .errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
        });
    }
    Ok(Codegen::new().build(&ret.program).code)
}
