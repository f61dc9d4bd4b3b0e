//! Version model and version range algebra.
//!
//! A [`Version`] is an ordered sequence of non-negative numeric components
//! plus an optional *extra* tag list; a non-empty extra marks a pre-release.
//! Trailing zero components are insignificant, so `1`, `1.0` and `1.0.0` all
//! compare equal.
//!
//! A [`VersionRange`] is a sorted set of disjoint version intervals parsed
//! from a rich expression grammar (`^1.2`, `~1.2.3`, `1 - 2`, `[1,2)`,
//! `>=1 <3 || >5`, …) that supports union, intersection and membership
//! queries.

pub mod version;
pub mod version_range;

pub use version::{
    FormatError, Number, ParseVersionError, ParseVersionErrorKind, Version,
};
pub use version_range::{
    EmptyIntersection, ParseVersionRangeError, ParseVersionRangeErrorKind, RangeRepresentation,
    VersionRange,
};
