//! The `{M}.{m}`-style pattern formatter and base-26 letter rendering.

use thiserror::Error;

use super::Version;

/// An error produced by [`Version::format`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormatError {
    /// The pattern contained a placeholder the formatter does not know.
    #[error("unknown format placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),
    /// A `{` without a matching `}`.
    #[error("unterminated format placeholder")]
    Unterminated,
}

/// How a placeholder renders its numeric component.
#[derive(Clone, Copy)]
enum Rendering {
    Decimal,
    UppercaseLetters,
    LowercaseLetters,
}

/// Renders `n` as base-26 letters: `0 → A`, `25 → Z`, `26 → AA`, `27 → AB`.
fn to_letters(mut n: u64, uppercase: bool) -> String {
    let base = if uppercase { b'A' } else { b'a' };
    let mut letters = Vec::new();
    loop {
        letters.push(base + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).expect("letters are ASCII")
}

impl Version {
    /// Formats the version according to `pattern`.
    ///
    /// Placeholders `{M}`, `{m}`, `{p}` and `{t}` select the major, minor,
    /// patch and tweak components; `{e}` the extra tag list. Inside the
    /// braces an optional `L`/`l` renders the component as upper-/lowercase
    /// base-26 letters, and a trailing `o` makes the field optional: it is
    /// skipped entirely beyond [`Version::real_level`] and otherwise printed
    /// with a `.` separator unless it opens the output.
    ///
    /// ```
    /// use bedrock_version::Version;
    ///
    /// let version: Version = "1.2".parse().unwrap();
    /// assert_eq!(version.format("{M}{mo}{po}").unwrap(), "1.2");
    /// assert_eq!(version.format("{ML}{mLo}{pLo}").unwrap(), "B.C");
    /// ```
    pub fn format(&self, pattern: &str) -> Result<String, FormatError> {
        let mut out = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                out.push(c);
                continue;
            }

            let mut body = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => body.push(c),
                    None => return Err(FormatError::Unterminated),
                }
            }

            self.render_placeholder(&body, &mut out)?;
        }

        Ok(out)
    }

    fn render_placeholder(&self, body: &str, out: &mut String) -> Result<(), FormatError> {
        let unknown = || FormatError::UnknownPlaceholder(body.to_string());

        let mut rest = body.chars();
        let component = rest.next().ok_or_else(unknown)?;

        if component == 'e' {
            if rest.next().is_some() {
                return Err(unknown());
            }
            out.push_str(&self.extra().to_string());
            return Ok(());
        }

        let index = match component {
            'M' => 0,
            'm' => 1,
            'p' => 2,
            't' => 3,
            _ => return Err(unknown()),
        };

        let mut rendering = Rendering::Decimal;
        let mut optional = false;
        match rest.next() {
            None => {}
            Some('L') => rendering = Rendering::UppercaseLetters,
            Some('l') => rendering = Rendering::LowercaseLetters,
            Some('o') => optional = true,
            Some(_) => return Err(unknown()),
        }
        if !optional {
            match rest.next() {
                None => {}
                Some('o') => optional = true,
                Some(_) => return Err(unknown()),
            }
        }
        if rest.next().is_some() {
            return Err(unknown());
        }

        if optional && index + 1 > self.real_level() {
            return Ok(());
        }

        let value = self.numbers().get(index).copied().unwrap_or(0);
        let rendered = match rendering {
            Rendering::Decimal => value.to_string(),
            Rendering::UppercaseLetters => to_letters(value, true),
            Rendering::LowercaseLetters => to_letters(value, false),
        };

        if optional && !out.is_empty() {
            out.push('.');
        }
        out.push_str(&rendered);
        Ok(())
    }
}
