//! Input side: load a Go package and extract an interface from it.

pub mod go;
pub mod loader;

pub use go::{ExtractError, find_interface};
pub use loader::{LoadError, ProjectUnit, SourceFile, load_package};
