use thiserror::Error;

/// Errors returned by hierarchy mutations on [`ChildList`](crate::ChildList)
/// and [`Tree`](crate::Tree).
///
/// All of them describe a misuse by the caller (a bad position, a missing
/// handle, a stale reference). None of them leave the structure partially
/// modified.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// A null handle, or a handle that no longer refers to a live node.
    #[error("unable to use a nil node handle")]
    NilArgument,

    #[error("position {position} is out of bounds for {len} length children")]
    IndexOutOfBounds { position: usize, len: usize },

    #[error("unable to locate node")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, TreeError>;
