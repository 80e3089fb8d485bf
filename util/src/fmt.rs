//! Formatting helpers shared by the `Debug` implementations of the arrays and tables.
use std::fmt;

/// A value that is formatted by calling a closure, returned by [`fmt_with`].
#[derive(Clone, Copy)]
pub struct FmtWith<F>(F);

impl<F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result> fmt::Debug for FmtWith<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(f)
    }
}

impl<F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result> fmt::Display for FmtWith<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(f)
    }
}

/// Wraps a closure writing to a [`fmt::Formatter`] into a value implementing both
/// [`fmt::Display`] and [`fmt::Debug`].
pub fn fmt_with<F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result>(closure: F) -> FmtWith<F> {
    FmtWith(closure)
}

/// Formats the `(index, element)` pairs produced by `get_iter` as a map from index to element.
///
/// ```
/// use fractal_util::fmt::fmt_indexed;
///
/// let pairs = [(3, 'a'), (70, 'b')];
/// let shown = fmt_indexed(|| pairs.iter().map(|(index, element)| (*index, element)));
/// assert_eq!(format!("{shown:?}"), "{3: 'a', 70: 'b'}");
/// ```
pub fn fmt_indexed<E: fmt::Debug, I: IntoIterator<Item = (u64, E)>>(
    get_iter: impl Fn() -> I,
) -> impl fmt::Display + fmt::Debug {
    fmt_with(move |f| f.debug_map().entries(get_iter()).finish())
}

/// Formats the items produced by `get_iter` as a list.
pub fn fmt_list<I: IntoIterator<Item = impl fmt::Debug>>(
    get_iter: impl Fn() -> I,
) -> impl fmt::Display + fmt::Debug {
    fmt_with(move |f| f.debug_list().entries(get_iter()).finish())
}
