use std::error::Error;

use naga::front::{glsl, wgsl};
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::diagnostics::Diagnostic;
use crate::shader_kind::ShaderKind;

// AIDEV-NOTE: Validate shader compilation using naga without GPU device
pub fn validate_shader(kind: ShaderKind, source: &str) -> Result<naga::Module, Vec<Diagnostic>> {
    let module = match kind.glsl_stage() {
        Some(stage) => glsl::Frontend::default()
            .parse(&glsl::Options::from(stage), source)
            .map_err(|errors| glsl_diagnostics(errors, source))?,
        None => wgsl::parse_str(source).map_err(|error| vec![wgsl_diagnostic(&error, source)])?,
    };

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(error) = validator.validate(&module) {
        let message = error_chain(error.as_inner());
        let diagnostic = match error.location(source) {
            Some(loc) => Diagnostic::at(loc.line_number, loc.line_position, message),
            None => Diagnostic::new(message),
        };
        return Err(vec![diagnostic]);
    }

    Ok(module)
}

fn glsl_diagnostics(errors: glsl::ParseErrors, source: &str) -> Vec<Diagnostic> {
    errors
        .errors
        .into_iter()
        .map(|error| {
            let message = error.kind.to_string();
            if error.meta.is_defined() {
                let loc = error.meta.location(source);
                Diagnostic::at(loc.line_number, loc.line_position, message)
            } else {
                Diagnostic::new(message)
            }
        })
        .collect()
}

fn wgsl_diagnostic(error: &wgsl::ParseError, source: &str) -> Diagnostic {
    let mut message = error.message().to_string();
    for (_, label) in error.labels() {
        if !label.is_empty() {
            message.push('\n');
            message.push_str(label);
        }
    }

    match error.location(source) {
        Some(loc) => Diagnostic::at(loc.line_number, loc.line_position, message),
        None => Diagnostic::new(message),
    }
}

fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push('\n');
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
