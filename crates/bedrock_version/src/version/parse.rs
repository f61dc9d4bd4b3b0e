use std::num::ParseIntError;
use std::str::FromStr;

use nom::character::complete::{char, digit1, satisfy};
use nom::combinator::{opt, recognize};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::multi::separated_list1;
use nom::sequence::{pair, preceded};
use nom::IResult;
use smallvec::SmallVec;
use thiserror::Error;

use super::{Extra, ExtraPart, Number, Numbers, Version};

/// An error that occurred while parsing a string into a [`Version`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("malformed version string '{version}': {kind}")]
pub struct ParseVersionError {
    /// The original input of the parser.
    pub version: String,

    /// The kind of parse error that occurred.
    pub kind: ParseVersionErrorKind,
}

impl ParseVersionError {
    pub(crate) fn new(text: impl Into<String>, kind: ParseVersionErrorKind) -> Self {
        Self {
            version: text.into(),
            kind,
        }
    }
}

/// The kind of error that occurred when parsing a version string.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseVersionErrorKind {
    /// The string was empty.
    #[error("empty string")]
    Empty,
    /// A numeric component did not fit the component type.
    #[error("invalid number")]
    InvalidNumeral(#[source] ParseIntError),
    /// Expected a numeric component.
    #[error("expected a numeric version component")]
    ExpectedComponent,
    /// Expected an extra token after `-` or `.`.
    #[error("expected an extra token e.g. `rc` or `2`")]
    ExpectedExtraToken,
    /// The parser did not consume the whole string.
    #[error("encountered more characters but expected none")]
    ExpectedEof,
    /// An unclassified combinator error.
    #[error("{0:?}")]
    Nom(ErrorKind),
}

impl<'i> ParseError<&'i str> for ParseVersionErrorKind {
    fn from_error_kind(_: &'i str, kind: ErrorKind) -> Self {
        ParseVersionErrorKind::Nom(kind)
    }

    fn append(_: &'i str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'i> FromExternalError<&'i str, ParseVersionErrorKind> for ParseVersionErrorKind {
    fn from_external_error(_: &'i str, _: ErrorKind, e: ParseVersionErrorKind) -> Self {
        e
    }
}

/// Parses a numeral; fails when the digits do not fit the component type.
pub(crate) fn number(input: &str) -> IResult<&str, Number, ParseVersionErrorKind> {
    let (rest, digits) = digit1(input)?;
    match Number::from_str(digits) {
        Ok(value) => Ok((rest, value)),
        Err(e) => Err(nom::Err::Failure(ParseVersionErrorKind::InvalidNumeral(e))),
    }
}

/// Parses the dot-separated numeric components.
fn numbers(input: &str) -> IResult<&str, Numbers, ParseVersionErrorKind> {
    let (rest, components) = separated_list1(char('.'), number)(input).map_err(|e| {
        e.map(|kind| match kind {
            ParseVersionErrorKind::Nom(_) => ParseVersionErrorKind::ExpectedComponent,
            other => other,
        })
    })?;
    Ok((rest, SmallVec::from_vec(components)))
}

/// Parses a single extra token: an identifier or a numeral.
fn extra_token(input: &str) -> IResult<&str, ExtraPart, ParseVersionErrorKind> {
    let ident = recognize(pair(
        satisfy(|c: char| c == '_' || c.is_ascii_alphabetic()),
        nom::bytes::complete::take_while(|c: char| c == '_' || c.is_ascii_alphanumeric()),
    ));

    match opt(ident)(input)? {
        (rest, Some(ident)) => Ok((rest, ExtraPart::Ident(ident.into()))),
        (_, None) => match number(input) {
            Ok((rest, value)) => Ok((rest, ExtraPart::Number(value))),
            Err(nom::Err::Error(_)) => {
                Err(nom::Err::Error(ParseVersionErrorKind::ExpectedExtraToken))
            }
            Err(e) => Err(e),
        },
    }
}

/// Parses the dot-separated extra tokens.
pub(crate) fn extra(input: &str) -> IResult<&str, Extra, ParseVersionErrorKind> {
    let (rest, parts) = separated_list1(char('.'), extra_token)(input)?;
    Ok((rest, Extra::from_parts(parts)))
}

/// Parses a version: `numbers ('-' extra)?`.
pub(crate) fn version_parser(input: &str) -> IResult<&str, Version, ParseVersionErrorKind> {
    if input.is_empty() {
        return Err(nom::Err::Error(ParseVersionErrorKind::Empty));
    }

    let (rest, numbers) = numbers(input)?;
    let (rest, extra) = opt(preceded(char('-'), nom::combinator::cut(extra)))(rest)?;

    Ok((rest, Version::from_raw(numbers, extra.unwrap_or_default())))
}

/// Parses an extra string on its own, as used by [`Version::with_extra`].
pub(crate) fn parse_extra(input: &str) -> Result<Extra, ParseVersionError> {
    match extra(input) {
        Ok(("", extra)) => Ok(extra),
        Ok(_) => Err(ParseVersionError::new(
            input,
            ParseVersionErrorKind::ExpectedEof,
        )),
        Err(nom::Err::Error(kind) | nom::Err::Failure(kind)) => {
            Err(ParseVersionError::new(input, kind))
        }
        Err(_) => unreachable!("not streaming, so no other error possible"),
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match version_parser(s) {
            Ok(("", version)) => Ok(version),
            Ok(_) => Err(ParseVersionError::new(s, ParseVersionErrorKind::ExpectedEof)),
            Err(nom::Err::Error(kind) | nom::Err::Failure(kind)) => {
                Err(ParseVersionError::new(s, kind))
            }
            Err(_) => unreachable!("not streaming, so no other error possible"),
        }
    }
}
