use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, multispace0, multispace1, one_of};
use nom::combinator::{cut, map, opt, value};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use smallvec::SmallVec;
use thiserror::Error;

use super::{Bound, RangePair, VersionRange};
use crate::version::parse as version_parse;
use crate::version::{Number, ParseVersionErrorKind, Version};

/// The longest accepted range expression.
const MAX_RANGE_LENGTH: usize = 32 * 1024;

/// An error that occurred while parsing a string into a [`VersionRange`].
/// It carries the offending input so callers can report it.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid version range '{range}': {kind}")]
pub struct ParseVersionRangeError {
    /// The original input of the parser.
    pub range: String,

    /// The kind of parse error that occurred.
    pub kind: ParseVersionRangeErrorKind,
}

impl ParseVersionRangeError {
    fn new(text: impl Into<String>, kind: ParseVersionRangeErrorKind) -> Self {
        Self {
            range: text.into(),
            kind,
        }
    }
}

/// The kind of error that occurred when parsing a range expression.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseVersionRangeErrorKind {
    /// An endpoint version was malformed.
    #[error("invalid version: {0}")]
    InvalidVersion(#[source] ParseVersionErrorKind),
    /// Expected a version component or a wildcard.
    #[error("expected a version component or wildcard")]
    ExpectedComponent,
    /// A numeric component appeared after a wildcard, e.g. `1.x.2`.
    #[error("numeric components cannot follow a wildcard")]
    ComponentAfterWildcard,
    /// The left endpoint was greater than the right one.
    #[error("the left version must be less than or equal to the right version")]
    DescendingOrder,
    /// A single-point interval with a strict side contains nothing.
    #[error("the interval does not contain any versions")]
    EmptyInterval,
    /// Interval notation with both sides omitted.
    #[error("at least one side of an interval must be given")]
    MissingEndpoints,
    /// An extra tag was attached to a floor below the smallest version.
    #[error("a pre-release tag cannot be attached to the zero version")]
    ExtraBelowMinimum,
    /// The expression exceeds the accepted length.
    #[error("range expression is longer than {MAX_RANGE_LENGTH} bytes")]
    TooLong,
    /// The parser did not consume the whole string.
    #[error("encountered more characters but expected none")]
    ExpectedEof,
    /// An unclassified combinator error.
    #[error("{0:?}")]
    Nom(ErrorKind),
}

impl<'i> ParseError<&'i str> for ParseVersionRangeErrorKind {
    fn from_error_kind(_: &'i str, kind: ErrorKind) -> Self {
        ParseVersionRangeErrorKind::Nom(kind)
    }

    fn append(_: &'i str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'i> FromExternalError<&'i str, ParseVersionRangeErrorKind> for ParseVersionRangeErrorKind {
    fn from_external_error(_: &'i str, _: ErrorKind, e: ParseVersionRangeErrorKind) -> Self {
        e
    }
}

type Kind = ParseVersionRangeErrorKind;
type Input<'i> = &'i str;

/// A version literal inside a range expression. `given` is the number of
/// explicit numeric components; wildcards truncate, so `1.x` has one given
/// component and an all-wildcard literal has none.
#[derive(Debug)]
struct RangeVersion {
    version: Version,
    given: usize,
}

impl RangeVersion {
    fn is_universal(&self) -> bool {
        self.given == 0
    }
}

/// Parses a numeric component; overlong digit runs are committed failures.
fn component_number(input: Input<'_>) -> IResult<Input<'_>, Number, Kind> {
    let (rest, digits) = digit1(input)?;
    match Number::from_str(digits) {
        Ok(value) => Ok((rest, value)),
        Err(e) => Err(nom::Err::Failure(Kind::InvalidVersion(
            ParseVersionErrorKind::InvalidNumeral(e),
        ))),
    }
}

/// Parses a version literal with wildcard components and an optional extra
/// list: `1.2.x`, `*`, `1.0.0-rc1`.
fn range_version(input: Input<'_>) -> IResult<Input<'_>, RangeVersion, Kind> {
    // The leading component is a number or `*`; `x` alone would be
    // indistinguishable from an identifier, so it is only a wildcard in
    // later positions.
    let (mut rest, first) = match alt((
        map(component_number, Some),
        value(None, char::<_, Kind>('*')),
    ))(input)
    {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(Kind::Nom(_))) => {
            return Err(nom::Err::Error(Kind::ExpectedComponent))
        }
        Err(e) => return Err(e),
    };

    let mut numbers: Vec<Number> = Vec::new();
    let mut saw_wildcard = first.is_none();
    if let Some(number) = first {
        numbers.push(number);
    }

    loop {
        let attempt: IResult<Input<'_>, Option<Number>, Kind> = preceded(
            char('.'),
            alt((map(component_number, Some), value(None, one_of("*xX")))),
        )(rest);
        match attempt {
            Ok((r, Some(number))) => {
                if saw_wildcard {
                    return Err(nom::Err::Failure(Kind::ComponentAfterWildcard));
                }
                numbers.push(number);
                rest = r;
            }
            Ok((r, None)) => {
                saw_wildcard = true;
                rest = r;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    let (rest, extra) = opt(preceded(char('-'), |i| {
        version_parse::extra(i).map_err(|e| e.map(Kind::InvalidVersion))
    }))(rest)?;
    let extra = extra.unwrap_or_default();

    let given = numbers.len();
    if given == 0 {
        if !extra.is_empty() {
            return Err(nom::Err::Failure(Kind::ExtraBelowMinimum));
        }
        return Ok((
            rest,
            RangeVersion {
                version: Version::min(),
                given: 0,
            },
        ));
    }

    let version = Version::from_raw(SmallVec::from_vec(numbers), extra);
    Ok((rest, RangeVersion { version, given }))
}

/// The floor bound of a tilde/caret/bare/hyphen factor. An extra attached
/// to an all-zero floor would sit below `Version::min()` and is rejected.
fn floor_of(version: &Version) -> Result<Bound, nom::Err<Kind>> {
    if version.real_level() == 0 && version.has_extra() {
        return Err(nom::Err::Failure(Kind::ExtraBelowMinimum));
    }
    Ok(Bound::weak(version.clone()))
}

/// The ceiling obtained by bumping position `level` of the given numeric
/// components, extra dropped.
fn release_ceiling(version: &Version, level: usize) -> Version {
    Version::new(version.next_at_level(level).numbers())
}

fn pair_range(from: Bound, to: Bound) -> Result<VersionRange, nom::Err<Kind>> {
    RangePair::new(from, to)
        .map(VersionRange::from_pair)
        .map_err(nom::Err::Failure)
}

/// `~V`: floor at V, ceiling at the minor position (or major when only the
/// major was given).
fn tilde_range(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (rest, rv) = preceded(pair(char('~'), multispace0), cut(range_version))(input)?;
    if rv.is_universal() {
        return Ok((rest, VersionRange::any()));
    }
    let from = floor_of(&rv.version)?;
    let to = Bound::strict(release_ceiling(&rv.version, rv.given.min(2)));
    Ok((rest, pair_range(from, to)?))
}

/// `^V`: floor at V, ceiling bumps the leading non-zero component.
fn caret_range(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (rest, rv) = preceded(pair(char('^'), multispace0), cut(range_version))(input)?;
    if rv.is_universal() {
        return Ok((rest, VersionRange::any()));
    }
    let from = floor_of(&rv.version)?;
    let numbers = rv.version.numbers();
    let to = match numbers.iter().position(|&n| n != 0) {
        Some(i) => Bound::strict(release_ceiling(&Version::new(&numbers[..=i]), i + 1)),
        None => Bound::strict(release_ceiling(&rv.version, rv.given)),
    };
    Ok((rest, pair_range(from, to)?))
}

#[derive(Clone, Copy)]
enum Comparator {
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Equals,
    NotEquals,
}

/// `op V` with `op ∈ { <, <=, >, >=, =, ==, != }`.
fn comparator(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (rest, op) = alt((
        value(Comparator::LessEquals, tag("<=")),
        value(Comparator::GreaterEquals, tag(">=")),
        value(Comparator::Equals, tag("==")),
        value(Comparator::NotEquals, tag("!=")),
        value(Comparator::Less, tag("<")),
        value(Comparator::Greater, tag(">")),
        value(Comparator::Equals, tag("=")),
    ))(input)?;
    let (rest, rv) = preceded(multispace0, cut(range_version))(rest)?;
    if rv.is_universal() {
        return Err(nom::Err::Failure(Kind::ExpectedComponent));
    }

    let v = rv.version;
    let range = match op {
        Comparator::Less => pair_range(Bound::unbounded_below(), Bound::strict(v))?,
        Comparator::LessEquals => pair_range(Bound::unbounded_below(), Bound::weak(v))?,
        Comparator::Greater => pair_range(Bound::strict(v), Bound::unbounded_above())?,
        Comparator::GreaterEquals => pair_range(Bound::weak(v), Bound::unbounded_above())?,
        Comparator::Equals => pair_range(Bound::weak(v.clone()), Bound::weak(v))?,
        Comparator::NotEquals => {
            let below = RangePair::new(Bound::unbounded_below(), Bound::strict(v.clone()))
                .map_err(nom::Err::Failure)?;
            let above = RangePair::new(Bound::strict(v), Bound::unbounded_above())
                .map_err(nom::Err::Failure)?;
            VersionRange::from_pairs(vec![below, above])
        }
    };
    Ok((rest, range))
}

/// `[a,b]`, `[a,b)`, `(a,b]`, `(a,b)`; an omitted side is unbounded.
fn interval(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (rest, open) = one_of("[(")(input)?;
    let (rest, (_, left, _, _, _, right, _, close)) = cut(tuple((
        multispace0,
        opt(range_version),
        multispace0,
        char(','),
        multispace0,
        opt(range_version),
        multispace0,
        one_of("])"),
    )))(rest)?;

    if left.is_none() && right.is_none() {
        return Err(nom::Err::Failure(Kind::MissingEndpoints));
    }

    let from = match left {
        Some(rv) if !rv.is_universal() => Bound {
            version: rv.version,
            strict: open == '(',
        },
        _ => Bound::unbounded_below(),
    };
    let to = match right {
        Some(rv) if !rv.is_universal() => Bound {
            version: rv.version,
            strict: close == ')',
        },
        _ => Bound::unbounded_above(),
    };

    Ok((rest, pair_range(from, to)?))
}

/// A bare version or a `V1 - V2` hyphen range. The hyphen needs whitespace
/// on both sides; `1-2` is the version `1` with extra `2`.
fn hyphen_or_bare(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (rest, rv1) = range_version(input)?;
    let (rest, rv2) = opt(preceded(
        tuple((multispace1, char('-'), multispace1)),
        range_version,
    ))(rest)?;

    let range = match rv2 {
        Some(rv2) => {
            let from = if rv1.is_universal() {
                Bound::unbounded_below()
            } else {
                floor_of(&rv1.version)?
            };
            // The right endpoint is bumped at its given length with the
            // extra preserved: `1-2 - 2-1` ends below `3.0.0-1`.
            let to = if rv2.is_universal() {
                Bound::unbounded_above()
            } else {
                Bound::strict(rv2.version.next_at_level(rv2.given))
            };
            pair_range(from, to)?
        }
        None => {
            if rv1.is_universal() {
                VersionRange::any()
            } else {
                let from = floor_of(&rv1.version)?;
                let to = Bound::strict(release_ceiling(&rv1.version, rv1.given));
                pair_range(from, to)?
            }
        }
    };
    Ok((rest, range))
}

fn factor(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    alt((interval, comparator, tilde_range, caret_range, hyphen_or_bare))(input)
}

/// Conjunction separator: `&&`, `,` or plain whitespace.
fn and_separator(input: Input<'_>) -> IResult<Input<'_>, (), Kind> {
    alt((
        value(
            (),
            delimited(multispace0, alt((tag("&&"), tag(","))), multispace0),
        ),
        value((), multispace1),
    ))(input)
}

/// `factor (sep factor)*`, folded by intersection.
fn term(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (mut rest, mut acc) = factor(input)?;
    loop {
        let attempt: IResult<Input<'_>, VersionRange, Kind> =
            preceded(and_separator, factor)(rest);
        match attempt {
            Ok((r, next)) => {
                acc = acc.intersect(&next);
                rest = r;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, acc))
}

/// `term ('||' term)*`, folded by union.
fn expr(input: Input<'_>) -> IResult<Input<'_>, VersionRange, Kind> {
    let (mut rest, mut acc) = term(input)?;
    loop {
        let attempt: IResult<Input<'_>, VersionRange, Kind> = preceded(
            delimited(multispace0, tag("||"), multispace0),
            cut(term),
        )(rest);
        match attempt {
            Ok((r, next)) => {
                acc = acc.union(&next);
                rest = r;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, acc))
}

impl FromStr for VersionRange {
    type Err = ParseVersionRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_RANGE_LENGTH {
            let preview: String = s.chars().take(128).collect();
            return Err(ParseVersionRangeError::new(
                preview,
                ParseVersionRangeErrorKind::TooLong,
            ));
        }

        let trimmed = s.trim();
        if trimmed.is_empty() {
            // An empty expression places no constraint at all.
            return Ok(VersionRange::any());
        }

        match expr(trimmed) {
            Ok(("", range)) => Ok(range),
            Ok(_) => Err(ParseVersionRangeError::new(
                s,
                ParseVersionRangeErrorKind::ExpectedEof,
            )),
            Err(nom::Err::Error(kind) | nom::Err::Failure(kind)) => {
                Err(ParseVersionRangeError::new(s, kind))
            }
            Err(_) => unreachable!("not streaming, so no other error possible"),
        }
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::{ParseVersionRangeErrorKind, VersionRange};
    use crate::version::Version;

    fn r(s: &str) -> VersionRange {
        s.parse().unwrap()
    }

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[rstest]
    #[case("*", "*")]
    #[case("", "*")]
    #[case("   ", "*")]
    #[case("*.x.X.*", "*")]
    #[case("*.x.X.x.*", "*")]
    #[case("1", ">=1.0.0 <2.0.0")]
    #[case("1.x", ">=1.0.0 <2.0.0")]
    #[case("1.*", ">=1.0.0 <2.0.0")]
    #[case("1.*.*.*", ">=1.0.0 <2.0.0")]
    #[case("1.x.x.x", ">=1.0.0 <2.0.0")]
    #[case("1.2", ">=1.2.0 <1.3.0")]
    #[case("1.2.x", ">=1.2.0 <1.3.0")]
    #[case("2.x", ">=2.0.0 <3.0.0")]
    #[case("3.1.x", ">=3.1.0 <3.2.0")]
    #[case("1.2.3", ">=1.2.3 <1.2.4")]
    #[case("1.0.0", ">=1.0.0 <1.0.1")]
    #[case("1.0.1", ">=1.0.1 <1.0.2")]
    #[case("1.0.0.2", ">=1.0.0.2 <1.0.0.3")]
    #[case("1.0.0.01", ">=1.0.0.1 <1.0.0.2")]
    #[case("0.0.2", ">=0.0.2 <0.0.3")]
    #[case("1.2.3.4", ">=1.2.3.4 <1.2.3.5")]
    #[case("1.2.3.4.5.6.7", ">=1.2.3.4.5.6.7 <1.2.3.4.5.6.8")]
    #[case("1.2.3.4.5.6.7-1", ">=1.2.3.4.5.6.7-1 <1.2.3.4.5.6.8")]
    #[case("42.6.7-alpha", ">=42.6.7-alpha <42.6.8")]
    #[case("42.6.7.9-alpha", ">=42.6.7.9-alpha <42.6.7.10")]
    fn bare_versions(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("> 1", ">1.0.0")]
    #[case(">1.2", ">1.2.0")]
    #[case(">1.2.3", ">1.2.3")]
    #[case(">1.2.3.4", ">1.2.3.4")]
    #[case(">= 1.0.0", ">=1.0.0")]
    #[case(">=2.7.1", ">=2.7.1")]
    #[case("< 1", "<1.0.0")]
    #[case("<1.2", "<1.2.0")]
    #[case("<1.2.3.4", "<1.2.3.4")]
    #[case("<= 1", "<=1.0.0")]
    #[case("<=3.1.4 ", "<=3.1.4")]
    #[case(">0.4.2", ">0.4.2")]
    #[case("=1", "=1.0.0")]
    #[case("= 1", "=1.0.0")]
    #[case("== 1.2.3", "=1.2.3")]
    #[case("= 1.2.3", "=1.2.3")]
    #[case("== 1.2.3.4", "=1.2.3.4")]
    #[case("=4.6.6", "=4.6.6")]
    #[case("!= 1", "<1.0.0 || >1.0.0")]
    #[case("!=4.6.6", "<4.6.6 || >4.6.6")]
    #[case("!=4.6.6.8", "<4.6.6.8 || >4.6.6.8")]
    #[case(">1.2.3-alpha.3", ">1.2.3-alpha.3")]
    fn comparators(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("~ 1", ">=1.0.0 <2.0.0")]
    #[case("~1", ">=1.0.0 <2.0.0")]
    #[case("~1.2", ">=1.2.0 <1.3.0")]
    #[case("~1.2.3", ">=1.2.3 <1.3.0")]
    #[case("~1.2.3.4", ">=1.2.3.4 <1.3.0")]
    #[case("~3.1.4", ">=3.1.4 <3.2.0")]
    #[case("~0", "<1.0.0")]
    #[case("~0.2", ">=0.2.0 <0.3.0")]
    #[case("~0.2.3", ">=0.2.3 <0.3.0")]
    #[case("~0.2.3.4", ">=0.2.3.4 <0.3.0")]
    #[case("~1.2.x", ">=1.2.0 <1.3.0")]
    #[case("~1.2.x.*", ">=1.2.0 <1.3.0")]
    #[case("~0.0.x", "<0.1.0")]
    #[case("~0.0", "<0.1.0")]
    #[case("~1.x", ">=1.0.0 <2.0.0")]
    #[case("~0.x", "<1.0.0")]
    #[case("~1.x-x", ">=1.0.0-x <2.0.0")]
    #[case("~1.x-XxXaX", ">=1.0.0-XxXaX <2.0.0")]
    #[case("~1.x.x.x-axa", ">=1.0.0-axa <2.0.0")]
    fn tilde(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("^ 1", ">=1.0.0 <2.0.0")]
    #[case("^1", ">=1.0.0 <2.0.0")]
    #[case("^1.*", ">=1.0.0 <2.0.0")]
    #[case("^1.X", ">=1.0.0 <2.0.0")]
    #[case("^1.2", ">=1.2.0 <2.0.0")]
    #[case("^1.2.3", ">=1.2.3 <2.0.0")]
    #[case("^1.2.3.4", ">=1.2.3.4 <2.0.0")]
    #[case("^3.2.3.4", ">=3.2.3.4 <4.0.0")]
    #[case("^ 0", "<1.0.0")]
    #[case("^0", "<1.0.0")]
    #[case("^ 0.0", "<0.1.0")]
    #[case("^ 0.2", ">=0.2.0 <0.3.0")]
    #[case("^0.2.3.4", ">=0.2.3.4 <0.3.0")]
    #[case("^ 0.0.3", ">=0.0.3 <0.0.4")]
    #[case("^0.0.3.4", ">=0.0.3.4 <0.0.4")]
    #[case("^0.0.3.0", ">=0.0.3 <0.0.4")]
    #[case("^0.0.0.4", ">=0.0.0.4 <0.0.0.5")]
    #[case("^1.2.3-beta.2", ">=1.2.3-beta.2 <2.0.0")]
    #[case("^0.0.3-beta", ">=0.0.3-beta <0.0.4")]
    #[case("^0.0.3.4-beta", ">=0.0.3.4-beta <0.0.4")]
    #[case("^1.2.x", ">=1.2.0 <2.0.0")]
    #[case("^1.2.x.*", ">=1.2.0 <2.0.0")]
    #[case("^0.0.x", "<0.1.0")]
    #[case("^0.0", "<0.1.0")]
    #[case("^1.x", ">=1.0.0 <2.0.0")]
    #[case("^0.x", "<1.0.0")]
    #[case("^0.4.2", ">=0.4.2 <0.5.0")]
    fn caret(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("1 - 2", ">=1.0.0 <3.0.0")]
    #[case("1 - 2.2", ">=1.0.0 <2.3.0")]
    #[case("1.2 - 2", ">=1.2.0 <3.0.0")]
    #[case("1.2 - 2.3", ">=1.2.0 <2.4.0")]
    #[case("1.2.3 - 2", ">=1.2.3 <3.0.0")]
    #[case("1.2.3 - 2.3.4", ">=1.2.3 <2.3.5")]
    #[case("1.2 - 2.3.4", ">=1.2.0 <2.3.5")]
    #[case("1.2.x - 2.3.4", ">=1.2.0 <2.3.5")]
    #[case("1.2.* - 2.3.4", ">=1.2.0 <2.3.5")]
    #[case("1.2.3.* - 2.3.4", ">=1.2.3 <2.3.5")]
    #[case("1.2.3.4 - 2", ">=1.2.3.4 <3.0.0")]
    #[case("1.2.3.4 - 2.3.4.5", ">=1.2.3.4 <2.3.4.6")]
    #[case("   1.2.3 - 2.3    ", ">=1.2.3 <2.4.0")]
    #[case("2.0.0 - 3.1.4", ">=2.0.0 <3.1.5")]
    #[case("0.4 - 2", ">=0.4.0 <3.0.0")]
    #[case("1-2", ">=1.0.0-2 <2.0.0")]
    #[case("1-a", ">=1.0.0-a <2.0.0")]
    #[case("1-2 - 2-1", ">=1.0.0-2 <3.0.0-1")]
    fn hyphen(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("[,2.0]", "<=2.0.0")]
    #[case("[,2.0.*]", "<=2.0.0")]
    #[case("[,2.0.5]", "<=2.0.5")]
    #[case("(,2.0]", "<=2.0.0")]
    #[case("(,2.0)", "<2.0.0")]
    #[case(" ( , 2.0.5 ) ", "<2.0.5")]
    #[case("[1.0,]", ">=1.0.0")]
    #[case(" [ 1.0 , ) ", ">=1.0.0")]
    #[case("(1.0,]", ">1.0.0")]
    #[case("(1,]", ">1.0.0")]
    #[case("(1.x,]", ">1.0.0")]
    #[case("(1.5.*,]", ">1.5.0")]
    #[case(" ( 1.5.X , ) ", ">1.5.0")]
    #[case("[1,2]", ">=1.0.0 <=2.0.0")]
    #[case("[1,2)", ">=1.0.0 <2.0.0")]
    #[case("(1,2]", ">1.0.0 <=2.0.0")]
    #[case("(1,2)", ">1.0.0 <2.0.0")]
    #[case("(1.2.3,2)", ">1.2.3 <2.0.0")]
    #[case("(1.2.3.4,2.0.0.0)", ">1.2.3.4 <2.0.0")]
    #[case("(1,2.3.4.5)", ">1.0.0 <2.3.4.5")]
    #[case("(1,2.3.4.5]", ">1.0.0 <=2.3.4.5")]
    #[case("[5,5]", "=5.0.0")]
    fn intervals(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case(">1 <3||>5 <7", ">1.0.0 <3.0.0 || >5.0.0 <7.0.0")]
    #[case(">=1 <3||>5 <=7", ">=1.0.0 <3.0.0 || >5.0.0 <=7.0.0")]
    #[case(">=2.0.0 <3.1.4", ">=2.0.0 <3.1.4")]
    #[case("<3.1.4 >=2.0.0 ", ">=2.0.0 <3.1.4")]
    #[case("<2.0.0 || >3.1.4", "<2.0.0 || >3.1.4")]
    #[case(">7 >8 >9", ">9.0.0")]
    #[case(">=7 >8 >9", ">9.0.0")]
    #[case(">=7 >8 >=9", ">=9.0.0")]
    #[case(">7 >8 <10", ">8.0.0 <10.0.0")]
    #[case(">7 ||>8 || >9", ">7.0.0")]
    #[case(">=7 || >8 || >9", ">=7.0.0")]
    #[case(">7||>8||<10", "*")]
    #[case(">2 <2", "")]
    #[case("1 - 3 <2", ">=1.0.0 <2.0.0")]
    #[case("1.0.1 1.0.2", "")]
    #[case("1.0.1 1.0.2 1.0.3", "")]
    #[case("1 1.0.1 1.0.2 1.0.3", "")]
    #[case("1 1.0.1 1.0.2 1.0.3 - 1.1", "")]
    #[case("1.0.1 || 1.0.2", ">=1.0.1 <1.0.3")]
    #[case("1.0.1 || 1.0.2 || 1.0.3", ">=1.0.1 <1.0.4")]
    #[case("1.0.0 || 1.0.1 || 1.0.2 || 1.0.3", ">=1.0.0 <1.0.4")]
    #[case("1 || 1.0.1 || 1.0.2 || 1.0.3", ">=1.0.0 <2.0.0")]
    #[case("1 || 1.0.1 || 1.0.2 || 1.0.3 - 2.1", ">=1.0.0 <2.2.0")]
    #[case("[1,4] [2,3]", ">=2.0.0 <=3.0.0")]
    #[case(">= 1.2, < 3.0.0 || >= 4.2.3", ">=1.2.0 <3.0.0 || >=4.2.3")]
    #[case(">= 1.2&&< 3.0.0 || >= 4.2.3", ">=1.2.0 <3.0.0 || >=4.2.3")]
    #[case("<1.1 || >= 1.2&&< 3.0.0 || >= 4.2.3", "<1.1.0 || >=1.2.0 <3.0.0 || >=4.2.3")]
    #[case(
        "^4.8.0 || ^5.7.0 || ^6.2.2 || >=8.0.0",
        ">=4.8.0 <5.0.0 || >=5.7.0 <6.0.0 || >=6.2.2 <7.0.0 || >=8.0.0"
    )]
    #[case(
        "^4.8.0 || ^5.7.0.0 || ^6.2.2 || >8.0.0.0",
        ">=4.8.0 <5.0.0 || >=5.7.0 <6.0.0 || >=6.2.2 <7.0.0 || >8.0.0"
    )]
    #[case("1.x || >=2.5.0 || 5.0.0 - 7.2.3", ">=1.0.0 <2.0.0 || >=2.5.0")]
    #[case("1.x.x.X || >=2.5.0 || 5.0.0 - 7.2.3", ">=1.0.0 <2.0.0 || >=2.5.0")]
    fn expressions(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(r(input).to_string(), expected, "{input}");
    }

    #[rstest]
    #[case("-1")]
    #[case("1 - 2 - 3 || 4")]
    #[case("===1")]
    #[case("master")]
    #[case("master-master")]
    #[case("master || master2")]
    #[case("a b")]
    #[case("a - b - d || c || d || e||f")]
    #[case(">1 <master")]
    #[case(">master <1")]
    #[case("1 - master")]
    #[case("(master,1)")]
    #[case("[master ,master]")]
    #[case("5 - 4")]
    #[case("(5,5]")]
    #[case("[5,5)")]
    #[case("(5,5)")]
    #[case("[5,4]")]
    #[case("(5,4)")]
    #[case("[1.0]")]
    #[case("[1.0,,]")]
    #[case("[1.0,,1.0]")]
    #[case("[1.0,1.0,1.0]")]
    #[case("[1.0,1.0,]")]
    #[case("[,1.0,1.0,]")]
    #[case("[,1.0,1.0]")]
    #[case("[,,]")]
    #[case("[,]")]
    #[case("[]")]
    #[case("1.x.2")]
    #[case("~0.x-x")]
    #[case("~0.x-XX")]
    #[case("~0.x.x.x-axa")]
    fn rejects(#[case] input: &str) {
        assert!(VersionRange::try_parse(input).is_none(), "{input} should not parse");
    }

    #[test]
    fn accepted_edge_cases() {
        assert!(VersionRange::try_parse("5 - 5").is_some());
        assert!(VersionRange::try_parse("[5,5]").is_some());
        assert!(VersionRange::try_parse(">2 <2").is_some());
    }

    #[test]
    fn error_details() {
        let err = "[5,4]".parse::<VersionRange>().unwrap_err();
        assert_eq!(err.range, "[5,4]");
        assert_matches!(err.kind, ParseVersionRangeErrorKind::DescendingOrder);

        // `5 - 4` degenerates to the empty half-open interval `[5,5)`.
        assert_matches!(
            "5 - 4".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::EmptyInterval
        );
        assert_matches!(
            "(5,5]".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::EmptyInterval
        );
        assert_matches!(
            "[,]".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::MissingEndpoints
        );
        assert_matches!(
            "1.x.2".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::ComponentAfterWildcard
        );
        assert_matches!(
            "~0.x-x".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::ExtraBelowMinimum
        );
        assert_matches!(
            "master".parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::ExpectedComponent
        );

        let long = "1 || ".repeat(10_000) + "1";
        assert_matches!(
            long.parse::<VersionRange>().unwrap_err().kind,
            ParseVersionRangeErrorKind::TooLong
        );
    }

    #[test]
    fn upper_sentinel_is_exclusive() {
        let range = r(">1");
        assert!(range.contains(&v("1.0.0.0.0.0.1")));
        assert!(range.contains(&v("999999999")));
        assert!(range.contains(&v("999999999.999999999.999999999")));
        assert!(!range.contains(&v("1")));
        assert!(!range.contains(&v("0.0.0.0.1")));
        assert!(!range.contains(&v("1000000000")));
    }

    #[test]
    fn point_range_membership() {
        let range = r("=1.2.3");
        assert!(range.contains(&v("1.2.3")));
        assert!(range.contains(&v("1.2.3.0.0")));
        assert!(range.contains(&v("1.2.3.0.000.000")));
        assert!(!range.contains(&v("1.2.3.0.0.0.1")));

        let negated = r("!=1.2.3");
        assert!(!negated.contains(&v("1.2.3")));
        assert!(!negated.contains(&v("1.2.3.0.0")));
        assert!(negated.contains(&v("1.2.3.0.0.0.1")));
        assert!(negated.contains(&v("1.2.2.0.0.00.01")));
    }

    #[test]
    fn bare_range_membership() {
        let range = r("1.2.0");
        assert!(range.contains(&v("1.2.0")));
        assert!(range.contains(&v("1.2.0.0")));
        assert!(range.contains(&v("1.2.0.1")));
        assert!(range.contains(&v("1.2.0.4")));
        assert!(!range.contains(&v("1.2.1")));
        assert!(!range.contains(&v("1.2.3")));

        let range = r("1");
        for probe in ["1", "1.0", "1.0.0000", "1.1", "1.0.0.0.0.1"] {
            assert!(range.contains(&v(probe)), "{probe}");
        }
        assert!(!range.contains(&v("2")));
    }

    #[test]
    fn round_trip() {
        for input in [
            "*",
            "1",
            "^1.2.3",
            "~0.2.3",
            "=1.2.3",
            "!=4.6.6.8",
            ">=1.2.0 <3.0.0 || >=4.2.3",
            ">=1.0.0-2 <2.0.0",
            "1.2.3.4 - 2.3.4.5",
        ] {
            let range = r(input);
            assert_eq!(r(&range.to_string()), range, "{input}");
        }
    }
}
