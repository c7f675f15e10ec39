use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Page size must be a positive integer, got {0}")]
pub struct InvalidPageSize(pub usize);

/// Upper bound on the number of items requested per round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    pub const DEFAULT: PageSize = PageSize::of(100);

    /// Const constructor for compile-time page sizes; zero fails to compile in const context.
    pub const fn of(size: usize) -> Self {
        match NonZeroUsize::new(size) {
            Some(size) => PageSize(size),
            None => panic!("page size must be positive"),
        }
    }

    pub fn new(size: usize) -> Result<Self, InvalidPageSize> {
        NonZeroUsize::new(size)
            .map(PageSize)
            .ok_or(InvalidPageSize(size))
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::DEFAULT
    }
}

impl From<NonZeroUsize> for PageSize {
    fn from(size: NonZeroUsize) -> Self {
        PageSize(size)
    }
}

impl TryFrom<usize> for PageSize {
    type Error = InvalidPageSize;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        PageSize::new(size)
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
