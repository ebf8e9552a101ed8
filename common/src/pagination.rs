//! Abstractions for page-number pagination.

use std::num::NonZeroU32;

use derive_more::Display;

/// Number of a page, starting from `1`.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Number(NonZeroU32);

impl Number {
    /// The first page.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Creates a new [`Number`], if the provided `num` is not zero.
    #[must_use]
    pub const fn new(num: u32) -> Option<Self> {
        match NonZeroU32::new(num) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the numeric value of this [`Number`].
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Indicates whether this [`Number`] points to the first page.
    #[must_use]
    pub const fn is_first(self) -> bool {
        self.0.get() == 1
    }

    /// Returns the [`Number`] of the page following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Clamps this [`Number`] into `[1, total_pages]`.
    ///
    /// Zero `total_pages` clamps to the [`Number::FIRST`] page.
    #[must_use]
    pub fn clamp_to(self, total_pages: u32) -> Self {
        Self::new(self.get().min(total_pages)).unwrap_or(Self::FIRST)
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Number of items on a page.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Size(NonZeroU32);

impl Size {
    /// Creates a new [`Size`], if the provided `size` is not zero.
    #[must_use]
    pub const fn new(size: u32) -> Option<Self> {
        match NonZeroU32::new(size) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the numeric value of this [`Size`].
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Calculates how many pages of this [`Size`] the `total_count` items
    /// occupy.
    #[must_use]
    pub fn total_pages(self, total_count: u64) -> u32 {
        u32::try_from(total_count.div_ceil(u64::from(self.get())))
            .unwrap_or(u32::MAX)
    }

    /// Returns the [`Range`] of items the page with the provided [`Number`]
    /// occupies.
    #[must_use]
    pub fn range(self, page: Number) -> Range {
        let limit = u64::from(self.get());
        Range {
            offset: u64::from(page.get() - 1) * limit,
            limit,
        }
    }
}

/// Range of items to select.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Range {
    /// Number of items to skip.
    pub offset: u64,

    /// Maximum number of items to take.
    pub limit: u64,
}

/// A page of items.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// [`Number`] of this [`Page`].
    pub number: Number,

    /// Total number of pages available.
    pub total_pages: u32,

    /// Total number of items on all the pages.
    pub total_count: u64,
}

impl<I> Page<I> {
    /// Creates a [`Page`] representing an empty result.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            number: Number::FIRST,
            total_pages: 0,
            total_count: 0,
        }
    }

    /// Indicates whether there is a [`Page`] after this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number.get() < self.total_pages
    }
}

/// Order of items.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Order {
    /// Ascending order.
    Ascending,

    /// Descending order.
    Descending,
}

impl Order {
    /// Returns SQL keyword representing this [`Order`].
    #[cfg(feature = "postgres")]
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($item:ty) => {
        #[doc = "A [`Page`] of items."]
        pub type Page = $crate::pagination::Page<$item>;

        #[doc = "Number of a [`Page`]."]
        pub type PageNumber = $crate::pagination::Number;

        #[doc = "Number of items on a [`Page`]."]
        pub type PageSize = $crate::pagination::Size;

        #[doc = "Range of items occupied by a [`Page`]."]
        pub type Range = $crate::pagination::Range;
    };
}
