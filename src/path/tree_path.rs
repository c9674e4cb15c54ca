use snafu::prelude::*;

pub const SEPARATOR: char = '/';

/// A validated, borrowed tree path.
///
/// A path is one or more non-empty segments joined by a single `/`. It may
/// start with one leading `/` and never ends with one. The leading `/`, if
/// present, belongs to the root component: `"/a/b"` lives under the root
/// `"/a"`, while `"a/b"` lives under the root `"a"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("{raw}")]
pub struct TreePath<'a> {
    raw: &'a str,
}

impl<'a> TreePath<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, PathError> {
        let body = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
        ensure!(!body.is_empty(), EmptySnafu);
        ensure!(!body.ends_with(SEPARATOR), TrailingSlashSnafu { path: raw });
        ensure!(
            body.split(SEPARATOR).all(|segment| !segment.is_empty()),
            EmptySegmentSnafu { path: raw }
        );
        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// The optional leading separator plus the first segment.
    pub fn root_component(&self) -> &'a str {
        let start = usize::from(self.raw.starts_with(SEPARATOR));
        match self.raw[start..].find(SEPARATOR) {
            Some(end) => &self.raw[..start + end],
            None => self.raw,
        }
    }

    pub fn is_root(&self) -> bool {
        self.root_component().len() == self.raw.len()
    }

    /// Everything after `ancestor` and the separator that follows it, if
    /// `ancestor` is a strict ancestor of this path.
    pub fn remainder_below(&self, ancestor: &str) -> Option<&'a str> {
        self.raw
            .strip_prefix(ancestor)?
            .strip_prefix(SEPARATOR)
            .filter(|rest| !rest.is_empty())
    }

    /// The path one level below `ancestor` on the way down to this path.
    pub fn next_step_below(&self, ancestor: &str) -> Option<&'a str> {
        let rest = self.remainder_below(ancestor)?;
        let step = rest.find(SEPARATOR).unwrap_or(rest.len());
        Some(&self.raw[..ancestor.len() + 1 + step])
    }
}

impl<'a> TryFrom<&'a str> for TreePath<'a> {
    type Error = PathError;

    fn try_from(raw: &'a str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

/// Whether `child` is exactly one segment below `parent`.
pub fn is_direct_child(parent: &str, child: &str) -> bool {
    child
        .strip_prefix(parent)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .is_some_and(|segment| !segment.is_empty() && !segment.contains(SEPARATOR))
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum PathError {
    #[snafu(display("Path has no segments"))]
    EmptyError,
    #[snafu(display("Path '{}' ends with a separator", path))]
    TrailingSlashError { path: String },
    #[snafu(display("Path '{}' contains an empty segment", path))]
    EmptySegmentError { path: String },
}
