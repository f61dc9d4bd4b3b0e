//! The [`VersionRange`] type: a sorted set of disjoint version intervals
//! with union/intersection algebra and a rich expression grammar.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::version::Version;

mod parse;

pub use parse::{ParseVersionRangeError, ParseVersionRangeErrorKind};

/// The default component count used when printing range endpoints.
const DEFAULT_LEVEL: usize = 3;

/// How [`VersionRange::to_string_mode`] pads endpoint versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeRepresentation {
    /// Every endpoint is padded to at least three components:
    /// `>1.1 <3.3.3.3` prints as `>1.1.0 <3.3.3.3`.
    #[default]
    SameDefaultLevel,
    /// Both endpoints of a pair are padded to the pair's largest real
    /// level: `>1.1 <3` prints as `>1.1 <3.0`.
    SameRealLevel,
    /// Each endpoint prints with its own minimal significant length:
    /// `>1.1.0 <3.0.0` prints as `>1.1 <3`.
    IndividualRealLevel,
}

/// One end of a range interval. `strict` selects the strong relation
/// (`>` / `<`) over the weak one (`>=` / `<=`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Bound {
    pub version: Version,
    pub strict: bool,
}

impl Bound {
    pub(crate) fn weak(version: Version) -> Self {
        Self {
            version,
            strict: false,
        }
    }

    pub(crate) fn strict(version: Version) -> Self {
        Self {
            version,
            strict: true,
        }
    }

    /// The unbounded lower side.
    pub(crate) fn unbounded_below() -> Self {
        Self::weak(Version::min())
    }

    /// The unbounded upper side. The sentinel is excluded so that no
    /// version at or above `max()` is ever admitted.
    pub(crate) fn unbounded_above() -> Self {
        Self::strict(Version::max())
    }
}

/// Picks the later of two lower bounds. On equal versions the strict bound
/// starts later and wins.
fn max_lower<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    match a.version.cmp(&b.version) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => {
            if a.strict {
                a
            } else {
                b
            }
        }
    }
}

/// Picks the earlier of two lower bounds.
fn min_lower<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    let later = max_lower(a, b);
    if std::ptr::eq(later, a) {
        b
    } else {
        a
    }
}

/// Picks the earlier of two upper bounds. On equal versions the strict
/// bound ends earlier and wins.
fn min_upper<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    match a.version.cmp(&b.version) {
        std::cmp::Ordering::Less => a,
        std::cmp::Ordering::Greater => b,
        std::cmp::Ordering::Equal => {
            if a.strict {
                a
            } else {
                b
            }
        }
    }
}

/// Picks the later of two upper bounds.
fn max_upper<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    let earlier = min_upper(a, b);
    if std::ptr::eq(earlier, a) {
        b
    } else {
        a
    }
}

/// A single `[from, to]` interval with explicit strictness on both sides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RangePair {
    pub from: Bound,
    pub to: Bound,
}

impl RangePair {
    /// Validates `from ≤ to`; a single-point interval must be weak on both
    /// sides or it contains nothing.
    pub(crate) fn new(from: Bound, to: Bound) -> Result<Self, ParseVersionRangeErrorKind> {
        match from.version.cmp(&to.version) {
            std::cmp::Ordering::Greater => Err(ParseVersionRangeErrorKind::DescendingOrder),
            std::cmp::Ordering::Equal if from.strict || to.strict => {
                Err(ParseVersionRangeErrorKind::EmptyInterval)
            }
            _ => Ok(Self { from, to }),
        }
    }

    fn contains(&self, version: &Version) -> bool {
        let above_from = if self.from.strict {
            self.from.version < *version
        } else {
            self.from.version <= *version
        };
        let below_to = if self.to.strict {
            *version < self.to.version
        } else {
            *version <= self.to.version
        };
        above_from && below_to
    }

    /// The overlap of two intervals, if any.
    fn intersect(&self, other: &Self) -> Option<Self> {
        let from = max_lower(&self.from, &other.from);
        let to = min_upper(&self.to, &other.to);
        let non_empty = from.version < to.version
            || (from.version == to.version && !from.strict && !to.strict);
        non_empty.then(|| Self {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Fuses two intervals whose closures touch or overlap. `[1,2)` and
    /// `[2,3]` fuse; `[1,2)` and `(2,3]` leave a gap and do not.
    fn fuse(&self, other: &Self) -> Option<Self> {
        let from = max_lower(&self.from, &other.from);
        let to = min_upper(&self.to, &other.to);
        let touches = from.version < to.version
            || (from.version == to.version && (!from.strict || !to.strict));
        touches.then(|| Self {
            from: min_lower(&self.from, &other.from).clone(),
            to: max_upper(&self.to, &other.to).clone(),
        })
    }

    fn to_version(&self) -> Option<Version> {
        (!self.from.strict && !self.to.strict && self.from.version == self.to.version)
            .then(|| self.from.version.clone())
    }

    fn endpoint_levels(&self, representation: RangeRepresentation) -> (usize, usize) {
        match representation {
            RangeRepresentation::SameDefaultLevel => (DEFAULT_LEVEL, DEFAULT_LEVEL),
            RangeRepresentation::SameRealLevel => {
                let level = self
                    .from
                    .version
                    .real_level()
                    .max(self.to.version.real_level());
                (level, level)
            }
            RangeRepresentation::IndividualRealLevel => (
                self.from.version.real_level(),
                self.to.version.real_level(),
            ),
        }
    }

    fn to_string_mode(&self, representation: RangeRepresentation) -> String {
        let print_left = self.from.version > Version::min();
        let print_right = self.to.version < Version::max();
        let (level_left, level_right) = self.endpoint_levels(representation);

        if print_left
            && print_right
            && !self.from.strict
            && !self.to.strict
            && self.from.version == self.to.version
        {
            return format!("={}", self.from.version.to_string_level(level_left));
        }

        let mut out = String::new();
        if print_left {
            out.push('>');
            if !self.from.strict {
                out.push('=');
            }
            out.push_str(&self.from.version.to_string_level(level_left));
        }
        if print_left && print_right {
            out.push(' ');
        }
        if print_right {
            out.push('<');
            if !self.to.strict {
                out.push('=');
            }
            out.push_str(&self.to.version.to_string_level(level_right));
        }
        if out.is_empty() {
            out.push('*');
        }
        out
    }
}

/// A sorted vector of non-overlapping, non-adjacent intervals over
/// [`Version`]s.
///
/// An empty range is legal and means "no version matches". The default
/// value is the universal range, equivalent to parsing `*`.
///
/// ```
/// use bedrock_version::{Version, VersionRange};
///
/// let range: VersionRange = "^1.2.3".parse().unwrap();
/// assert_eq!(range.to_string(), ">=1.2.3 <2.0.0");
/// assert!(range.contains(&Version::new(&[1, 9, 0])));
/// assert!(!range.contains(&Version::new(&[2, 0, 0])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionRange {
    pairs: Vec<RangePair>,
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl VersionRange {
    /// The universal range, containing every version below the sentinel.
    pub fn any() -> Self {
        Self {
            pairs: vec![RangePair {
                from: Bound::unbounded_below(),
                to: Bound::unbounded_above(),
            }],
        }
    }

    /// The empty range, containing nothing.
    pub fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    pub(crate) fn from_pairs(pairs: Vec<RangePair>) -> Self {
        Self {
            pairs: normalize(pairs),
        }
    }

    pub(crate) fn from_pair(pair: RangePair) -> Self {
        Self { pairs: vec![pair] }
    }

    /// Parses a range expression, returning `None` on any parse failure.
    pub fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Returns true when no version matches.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The number of disjoint intervals.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// When the range is a single point interval, the version it contains.
    pub fn to_version(&self) -> Option<Version> {
        match self.pairs.as_slice() {
            [pair] => pair.to_version(),
            _ => None,
        }
    }

    /// Returns true when any interval contains `version`.
    pub fn contains(&self, version: &Version) -> bool {
        self.pairs.iter().any(|pair| pair.contains(version))
    }

    /// Returns true when no interval contains `version`.
    pub fn is_outside(&self, version: &Version) -> bool {
        !self.contains(version)
    }

    /// Returns true when every version of `other` is also in `self`.
    pub fn contains_range(&self, other: &VersionRange) -> bool {
        &(self & other) == other
    }

    /// The union of two ranges; overlapping or touching intervals fuse.
    pub fn union(&self, other: &VersionRange) -> VersionRange {
        let mut pairs = self.pairs.clone();
        pairs.extend(other.pairs.iter().cloned());
        VersionRange {
            pairs: normalize(pairs),
        }
    }

    /// The intersection of two ranges. The result may be empty; this
    /// operation itself never fails.
    pub fn intersect(&self, other: &VersionRange) -> VersionRange {
        let mut pairs = Vec::new();
        for a in &self.pairs {
            for b in &other.pairs {
                if let Some(overlap) = a.intersect(b) {
                    pairs.push(overlap);
                }
            }
        }
        VersionRange {
            pairs: normalize(pairs),
        }
    }

    /// Like [`VersionRange::intersect`] for callers that require a
    /// non-empty result.
    pub fn intersect_nonempty(
        &self,
        other: &VersionRange,
    ) -> Result<VersionRange, EmptyIntersection> {
        let result = self.intersect(other);
        if result.is_empty() {
            Err(EmptyIntersection)
        } else {
            Ok(result)
        }
    }

    /// The smallest version of `versions` inside the range.
    pub fn min_satisfying(&self, versions: &BTreeSet<Version>) -> Option<Version> {
        versions.iter().find(|v| self.contains(v)).cloned()
    }

    /// The largest version of `versions` inside the range.
    pub fn max_satisfying(&self, versions: &BTreeSet<Version>) -> Option<Version> {
        versions.iter().rev().find(|v| self.contains(v)).cloned()
    }

    /// Renders the range with the requested endpoint padding; intervals
    /// join with ` || `, elided sentinel sides, `*` for the universal
    /// range and `=V` for point intervals.
    pub fn to_string_mode(&self, representation: RangeRepresentation) -> String {
        self.pairs
            .iter()
            .map(|pair| pair.to_string_mode(representation))
            .join(" || ")
    }
}

/// Sorts intervals by lower bound and fuses every overlapping or touching
/// neighbor, producing the canonical disjoint list.
fn normalize(mut pairs: Vec<RangePair>) -> Vec<RangePair> {
    pairs.sort();
    let mut out: Vec<RangePair> = Vec::new();
    for pair in pairs {
        if let Some(last) = out.last_mut() {
            if let Some(fused) = last.fuse(&pair) {
                *last = fused;
                continue;
            }
        }
        out.push(pair);
    }
    out
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_mode(RangeRepresentation::SameDefaultLevel))
    }
}

impl BitOr for &VersionRange {
    type Output = VersionRange;

    fn bitor(self, rhs: Self) -> VersionRange {
        self.union(rhs)
    }
}

impl BitAnd for &VersionRange {
    type Output = VersionRange;

    fn bitand(self, rhs: Self) -> VersionRange {
        self.intersect(rhs)
    }
}

impl BitOrAssign<&VersionRange> for VersionRange {
    fn bitor_assign(&mut self, rhs: &VersionRange) {
        *self = self.union(rhs);
    }
}

impl BitAndAssign<&VersionRange> for VersionRange {
    fn bitand_assign(&mut self, rhs: &VersionRange) {
        *self = self.intersect(rhs);
    }
}

impl Serialize for VersionRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        source.parse().map_err(serde::de::Error::custom)
    }
}

/// The intersection of the given ranges is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the intersection of the version ranges is empty")]
pub struct EmptyIntersection;
