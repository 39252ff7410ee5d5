//! String helpers used while rendering.

use crate::output::RenderError;

/// Join items with a separator.
pub fn join<S: AsRef<str>>(items: &[S], sep: &str) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// [`join`] with the separator first, for call sites that build the
/// separator from context.
pub fn joinl<S: AsRef<str>>(sep: &str, items: &[S]) -> String {
    join(items, sep)
}

/// Pair two equally long lists through `f`.
///
/// Unequal lengths break the data contract between normalization and
/// rendering and are reported instead of truncated.
pub fn zip<A, B, F>(a: &[A], b: &[B], f: F) -> Result<Vec<String>, RenderError>
where
    F: Fn(&A, &B) -> String,
{
    if a.len() != b.len() {
        return Err(RenderError::Mismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| f(x, y)).collect())
}
