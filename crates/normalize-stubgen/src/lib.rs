//! Test stubs for Go interfaces.
//!
//! `normalize-stubgen` reads a Go package, finds an interface by name and
//! writes a stub type implementing it: every call is recorded with its
//! arguments and results are handed out from per-method queues configured
//! by the test.
//!
//! # Architecture
//!
//! ```text
//!  package dir        IR                stub data         Go source
//! ─────────────    ─────────────    ────────────────    ──────────────
//! *.go ─> loader ─> InterfaceDecl ─> StubSpec ────────> GoStubWriter ─> format_go
//!    (input/loader)  (input/go)       (stub.rs)         (output/go)     (format.rs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use normalize_stubgen::{StubOptions, generate_stub};
//!
//! let source = generate_stub(Path::new("internal/ref"), "Thinger", &StubOptions::default())?;
//! std::fs::write("internal/ref/stub_thinger.go", source)?;
//! ```
//!
//! The stub for `Thinger` is `StubThinger`. A test queues results with
//! `stub.OnThing().Return(err)` and inspects `stub.ThingCalls` afterwards.

pub mod format;
pub mod helpers;
pub mod input;
pub mod ir;
pub mod options;
pub mod output;
pub mod printer;
pub mod stub;
pub mod syntax;

use std::path::Path;
use tracing::debug;

// Re-exports: IR types
pub use ir::{
    ChannelDir, Import, InterfaceDecl, MethodSignature, Parameter, StubMethodData, StubSpec,
    TypeExpr,
};

// Re-exports: pipeline stages
pub use format::{FormatError, StructureEq, SyntaxView, format_go};
pub use input::{ExtractError, LoadError, ProjectUnit, SourceFile, find_interface, load_package};
pub use options::{ExhaustedPolicy, StubOptions};
pub use output::{GoStubWriter, RenderError, render_stub};
pub use syntax::Diagnostic;

/// Error from any stage of stub generation.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Generate the stub source for `interface_name` in the package at `input_dir`.
///
/// Nothing is written to disk; the caller decides where the source goes.
#[tracing::instrument(level = "debug", skip(options), fields(dir = %input_dir.display()))]
pub fn generate_stub(
    input_dir: &Path,
    interface_name: &str,
    options: &StubOptions,
) -> Result<String, StubError> {
    let unit = load_package(input_dir)?;
    let decl = find_interface(&unit, interface_name)?;
    let spec = StubSpec::from_interface(&decl);
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string_pretty(&spec) {
            Ok(json) => debug!("stubgen: stub data\n{}", json),
            Err(e) => debug!("stubgen: cannot dump stub data: {}", e),
        }
    }

    let source = render_stub(&spec, options)?;
    if !options.format {
        return Ok(source);
    }
    Ok(format_go(&source)?)
}
