//! Output writers - emit stub data as source code.

pub mod go;

pub use go::{GoStubWriter, HEADER, render_stub};

/// Error rendering stub data.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot pair {left} item(s) with {right}")]
    Mismatch { left: usize, right: usize },

    #[error("{name:?} is not a usable Go identifier for {role}")]
    InvalidIdentifier { role: &'static str, name: String },

    #[error("generated name {name} is declared twice")]
    Collision { name: String },
}
