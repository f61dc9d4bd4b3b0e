//! The [`Version`] value type: parsing, comparison, formatting and the
//! carry-propagating component stepping that also backs range ceilings.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::{smallvec, SmallVec};

mod format;
pub(crate) mod parse;

pub use format::FormatError;
pub use parse::{ParseVersionError, ParseVersionErrorKind};

/// The integer type backing a single version component.
pub type Number = u64;

/// Inline storage for the common case of up to four components.
pub(crate) type Numbers = SmallVec<[Number; 4]>;

/// A version: at least one numeric component, plus an optional extra tag
/// list whose presence marks a pre-release.
///
/// Components beyond the stored length are implicitly zero, which makes
/// `1 == 1.0 == 1.0.0`. The first four positions are called major, minor,
/// patch and tweak; more positions are allowed and preserved.
#[derive(Clone)]
pub struct Version {
    numbers: Numbers,
    extra: Extra,
}

/// The optional tag list after `-` in a version string.
///
/// Each element is either a numeric token or an identifier token. At the
/// same position a numeric token sorts below an identifier token; a shorter
/// list sharing its prefix with a longer one sorts first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Extra {
    parts: Vec<ExtraPart>,
}

/// A single extra token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ExtraPart {
    Number(Number),
    Ident(Box<str>),
}

impl Ord for ExtraPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ExtraPart::Number(a), ExtraPart::Number(b)) => a.cmp(b),
            (ExtraPart::Ident(a), ExtraPart::Ident(b)) => a.cmp(b),
            // Numeric tokens sort below identifier tokens.
            (ExtraPart::Number(_), ExtraPart::Ident(_)) => Ordering::Less,
            (ExtraPart::Ident(_), ExtraPart::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ExtraPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ExtraPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExtraPart::Number(n) => write!(f, "{n}"),
            ExtraPart::Ident(s) => write!(f, "{s}"),
        }
    }
}

impl Extra {
    /// Returns true when no tags are present.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The number of tags.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub(crate) fn from_parts(parts: Vec<ExtraPart>) -> Self {
        Self { parts }
    }
}

impl Display for Extra {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.iter().format("."))
    }
}

impl Version {
    /// The largest component value a well-formed version is expected to
    /// carry. [`Version::max`] sits one above this ceiling so it compares
    /// greater than every well-formed version.
    pub const fn max_number() -> Number {
        999_999_999
    }

    /// The smallest version, `0`.
    pub fn min() -> Self {
        Self {
            numbers: smallvec![0],
            extra: Extra::default(),
        }
    }

    /// The sentinel upper bound, `max_number() + 1`.
    pub fn max() -> Self {
        Self {
            numbers: smallvec![Self::max_number() + 1],
            extra: Extra::default(),
        }
    }

    /// Creates a version from explicit numeric components.
    ///
    /// # Panics
    ///
    /// Panics when `numbers` is empty; a version has at least one component.
    pub fn new(numbers: &[Number]) -> Self {
        assert!(!numbers.is_empty(), "a version needs at least one component");
        Self {
            numbers: SmallVec::from_slice(numbers),
            extra: Extra::default(),
        }
    }

    /// Creates a version from the numeric components of `base` and a freshly
    /// parsed extra string, e.g. `("1.2", "rc2.3")`.
    pub fn with_extra(base: &Version, extra: &str) -> Result<Self, ParseVersionError> {
        let extra = parse::parse_extra(extra)?;
        Ok(Self {
            numbers: base.numbers.clone(),
            extra,
        })
    }

    pub(crate) fn from_raw(numbers: Numbers, extra: Extra) -> Self {
        debug_assert!(!numbers.is_empty());
        Self { numbers, extra }
    }

    /// The component at `index`, zero when the version is shorter.
    fn get(&self, index: usize) -> Number {
        self.numbers.get(index).copied().unwrap_or(0)
    }

    /// The major component (position 1).
    pub fn major(&self) -> Number {
        self.get(0)
    }

    /// The minor component (position 2).
    pub fn minor(&self) -> Number {
        self.get(1)
    }

    /// The patch component (position 3).
    pub fn patch(&self) -> Number {
        self.get(2)
    }

    /// The tweak component (position 4).
    pub fn tweak(&self) -> Number {
        self.get(3)
    }

    /// The raw numeric components as stored.
    pub fn numbers(&self) -> &[Number] {
        &self.numbers
    }

    /// The extra tag list.
    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    /// Returns true when an extra tag list is present.
    pub fn has_extra(&self) -> bool {
        !self.extra.is_empty()
    }

    /// A version without extra tags is a release.
    pub fn is_release(&self) -> bool {
        self.extra.is_empty()
    }

    /// A version with extra tags is a pre-release and sorts before the
    /// release with the same numeric components.
    pub fn is_pre_release(&self) -> bool {
        !self.extra.is_empty()
    }

    /// The stored component count.
    pub fn level(&self) -> usize {
        self.numbers.len()
    }

    /// The count of significant components: the position of the last
    /// non-zero component, or zero when every component is zero.
    pub fn real_level(&self) -> usize {
        self.numbers
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1)
    }

    /// Prints `max(level, real_level())` dot-joined components followed by
    /// the extra tags when present.
    pub fn to_string_level(&self, level: usize) -> String {
        self.to_string_with(".", level)
    }

    /// Like [`Version::to_string_level`] with a custom separator.
    pub fn to_string_with(&self, delimiter: &str, level: usize) -> String {
        let count = level.max(self.real_level());
        let mut out = (0..count).map(|i| self.get(i)).join(delimiter);
        if !self.extra.is_empty() {
            out.push('-');
            out.push_str(&self.extra.to_string());
        }
        out
    }

    /// Increments the last significant component, carrying left past the
    /// component ceiling. Stepping a pre-release is unspecified.
    pub fn increment(&mut self) {
        debug_assert!(self.is_release(), "cannot increment a pre-release");
        let pos = self.real_level().max(1) - 1;
        bump_with_carry(&mut self.numbers, pos);
    }

    /// Decrements the last significant component. Decrementing the minimum
    /// version is a no-op.
    pub fn decrement(&mut self) {
        debug_assert!(self.is_release(), "cannot decrement a pre-release");
        if let Some(pos) = self.numbers.iter().rposition(|&n| n != 0) {
            self.numbers[pos] -= 1;
        }
    }

    /// The next version obtained by bumping the component at 1-based
    /// position `level` and dropping everything after it. The extra list is
    /// left untouched; range endpoints rely on that.
    ///
    /// Range ceilings bump at the given component count rather than at the
    /// last significant one (`1.0.0` steps to `1.0.1`, where
    /// [`Version::increment`] would step to `2`), so this cannot be phrased
    /// in terms of `increment`; the two share the carry step instead.
    pub(crate) fn next_at_level(&self, level: usize) -> Version {
        let level = level.max(1);
        let mut numbers: Numbers = (0..level).map(|i| self.get(i)).collect();
        bump_with_carry(&mut numbers, level - 1);
        Version {
            numbers,
            extra: self.extra.clone(),
        }
    }
}

/// Bumps `numbers[pos]` by one, carrying left past the component ceiling; a
/// carry out of the leading component lands on the sentinel.
fn bump_with_carry(numbers: &mut Numbers, pos: usize) {
    let mut i = pos;
    loop {
        if numbers[i] == Version::max_number() {
            numbers[i] = 0;
            if i == 0 {
                numbers[0] = Version::max_number() + 1;
                break;
            }
            i -= 1;
        } else {
            numbers[i] += 1;
            break;
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::min()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for pair in self
            .numbers
            .iter()
            .copied()
            .zip_longest(other.numbers.iter().copied())
        {
            let (a, b) = match pair {
                EitherOrBoth::Both(a, b) => (a, b),
                EitherOrBoth::Left(a) => (a, 0),
                EitherOrBoth::Right(b) => (0, b),
            };
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        // Equal numeric sequences: a release sorts above any pre-release.
        match (self.extra.is_empty(), other.extra.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.extra.cmp(&other.extra),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zero components do not affect equality, so they must not
        // affect the hash either.
        let significant = self.real_level();
        for n in &self.numbers[..significant] {
            n.hash(state);
        }
        self.extra.hash(state);
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_level(self.level()))
    }
}

impl Debug for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("numbers", &self.numbers)
            .field("extra", &format_args!("{}", self.extra))
            .finish()
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        source.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::str::FromStr;

    use rand::seq::SliceRandom;

    use super::Version;

    fn v(s: &str) -> Version {
        Version::from_str(s).unwrap()
    }

    #[test]
    fn accessors() {
        let ver = v("1.2.3.4");
        assert_eq!(ver.major(), 1);
        assert_eq!(ver.minor(), 2);
        assert_eq!(ver.patch(), 3);
        assert_eq!(ver.tweak(), 4);

        let ver = v("1.2");
        assert_eq!(ver.major(), 1);
        assert_eq!(ver.minor(), 2);
        assert_eq!(ver.patch(), 0);
        assert_eq!(ver.tweak(), 0);

        let ver = v("00000000000.00000000.000001");
        assert_eq!(ver.major(), 0);
        assert_eq!(ver.minor(), 0);
        assert_eq!(ver.patch(), 1);
    }

    #[test]
    fn trailing_zeros_are_insignificant() {
        assert_eq!(v("0"), v("0.0"));
        assert_eq!(v("0"), v("0.0.0"));
        assert_eq!(v("0"), Version::new(&[0, 0, 0, 0, 0]));
        assert_ne!(v("0"), Version::new(&[0, 0, 1, 0, 0]));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert_eq!(v("1.2.3"), Version::new(&[1, 2, 3, 0, 0]));
        assert_eq!(v("1.2.3.4"), Version::new(&[1, 2, 3, 4, 0]));
    }

    #[test]
    fn pre_release_sorts_before_release() {
        let rc = Version::with_extra(&v("2.14.0"), "rc16").unwrap();
        let release = v("2.14.0");
        assert_ne!(rc, release);
        assert!(rc < release);
        assert!(rc <= release);
        assert!(release > rc);
    }

    #[test]
    fn extra_ordering() {
        let base = v("0.0.0");
        let with = |e: &str| Version::with_extra(&base, e).unwrap();

        assert!(with("rc2.3._a_") > with("rc1.3._a_"));
        assert!(with("rc2.3._a_") > with("beta.3._a_"));
        assert!(with("rc2.3._a_") > with("alpha.3._a_"));
        assert!(with("rc2.3._a_") < with("rc3.3._a_"));
        assert!(with("rc.2.3._a_") < with("rc.3.3._a_"));
        assert_eq!(with("rc.2.3._a_"), with("rc.2.3._a_"));

        // Numeric tokens sort below identifier tokens at the same position.
        assert!(with("1") < with("a"));
        assert!(with("1") < with("2"));
        assert!(with("1.1") < with("1.2"));
        // A shorter extra sharing its prefix sorts first.
        assert!(with("rc") < with("rc.1"));
        assert!(with("1.1.a") < with("1.1.z"));
    }

    #[test]
    fn sort_order_survives_shuffle() {
        let ordered: Vec<Version> = [
            "0.4", "0.5", "0.9.6", "0.960923", "1.0-alpha", "1.0-alpha.1", "1.0-beta", "1.0-rc",
            "1.0", "1.0.1", "1.1", "1996.07.12",
        ]
        .iter()
        .map(|s| v(s))
        .collect();

        let mut shuffled = ordered.clone();
        shuffled.shuffle(&mut rand::thread_rng());
        shuffled.sort();
        assert_eq!(shuffled, ordered);
    }

    #[test]
    fn min_max() {
        assert_eq!(Version::min(), v("0"));
        assert_eq!(Version::max().major(), Version::max_number() + 1);
        assert!(Version::min() < Version::max());
        assert!(v("999999999.999999999.999999999") < Version::max());
    }

    #[test]
    fn levels() {
        assert_eq!(v("15.9.03232.13").level(), 4);
        assert_eq!(v("1.0.0").level(), 3);
        assert_eq!(v("1.0.0").real_level(), 1);
        assert_eq!(v("1.2.3").real_level(), 3);
        assert_eq!(v("0").real_level(), 0);
        assert_eq!(v("1.2.0.4").real_level(), 4);
    }

    #[test]
    fn to_string_levels() {
        let ver = v("0.0.1");
        assert_eq!(ver.to_string(), "0.0.1");
        assert_eq!(ver.to_string_level(5), "0.0.1.0.0");
        assert_eq!(ver.to_string_level(4), "0.0.1.0");
        assert_eq!(ver.to_string_level(3), "0.0.1");
        // Levels below the real level do not truncate.
        assert_eq!(ver.to_string_level(2), "0.0.1");
        assert_eq!(ver.to_string_level(1), "0.0.1");
        assert_eq!(Version::min().to_string_level(0), "");

        assert_eq!(v("1.2.3-rc2.3._a_").to_string(), "1.2.3-rc2.3._a_");
        assert_eq!(v("1-alpha1").to_string_level(3), "1.0.0-alpha1");
        assert_eq!(v("1.2").to_string_with("_", 3), "1_2_0");
    }

    #[test]
    fn increment_decrement() {
        let mut ver = v("1.2");
        ver.increment();
        assert_eq!(ver, v("1.3"));
        ver.decrement();
        assert_eq!(ver, v("1.2"));

        let mut ver = v("1.2.3.4");
        ver.increment();
        assert_eq!(ver, v("1.2.3.5"));

        let mut ver = Version::min();
        ver.decrement();
        assert_eq!(ver, Version::min());
        ver.increment();
        assert_eq!(ver, v("1"));

        let mut ver = v("1.999999999");
        ver.increment();
        assert_eq!(ver, v("2.0"));
    }

    #[test]
    fn with_extra_validation() {
        let base = v("1.2");
        assert!(Version::with_extra(&base, "rc2.3._a_").is_ok());
        assert!(Version::with_extra(&base, "-rc2.3._a_").is_err());
        assert!(Version::with_extra(&base, "beta4-19610-02").is_err());
        assert!(Version::with_extra(&base, "3.4.1-beta4").is_err());

        let ver = Version::with_extra(&base, "e.2.3.4").unwrap();
        assert_eq!(ver.to_string(), "1.2-e.2.3.4");
    }

    fn hash_of(version: &Version) -> u64 {
        let mut hasher = DefaultHasher::new();
        version.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn hash_is_consistent_with_eq() {
        assert_eq!(hash_of(&v("1.2.0")), hash_of(&v("1.2.0.0.0")));
        assert_eq!(hash_of(&v("1.2.0")), hash_of(&v("1.2")));
        assert_ne!(hash_of(&v("1.2.0")), hash_of(&v("1.2.3")));
        assert_ne!(hash_of(&v("1.2.0")), hash_of(&v("1.2.0-rc1")));
    }

    #[test]
    fn serde_round_trip() {
        let ver = v("1.2.3-rc2.3");
        let json = serde_json::to_string(&ver).unwrap();
        assert_eq!(json, "\"1.2.3-rc2.3\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ver);

        assert!(serde_json::from_str::<Version>("\"1..2\"").is_err());
    }
}
