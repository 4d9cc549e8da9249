//! nom parsers for the string forms accepted in style records:
//! lengths ("12pt", "1.5cm"), margin shorthands and border shorthands.

use crate::border::{Border, BorderStyle};
use crate::dimension::Margins;
use folio_types::Color;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace1, one_of};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::separated_list1;
use nom::sequence::preceded;
use nom::{IResult, Parser};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleParseError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid value for {property}: '{value}'")]
    InvalidValue { property: String, value: String },
}

fn parse_f32(input: &str) -> IResult<&str, f32> {
    map_res(
        recognize((
            opt(one_of("+-")),
            alt((
                recognize((digit1, opt((char('.'), digit0)))),
                recognize((char('.'), digit1)),
            )),
        )),
        |s: &str| s.parse::<f32>(),
    )
    .parse(input)
}

/// Points per unit. Unitless numbers are points.
fn parse_unit(input: &str) -> IResult<&str, f32> {
    alt((
        value(1.0, tag_no_case("pt")),
        value(0.75, tag_no_case("px")),
        value(72.0, tag_no_case("in")),
        value(72.0 / 2.54, tag_no_case("cm")),
        value(72.0 / 25.4, tag_no_case("mm")),
    ))
    .parse(input)
}

/// Parses a length and converts it to points.
pub fn parse_length(input: &str) -> IResult<&str, f32> {
    map((parse_f32, opt(parse_unit)), |(v, factor)| {
        v * factor.unwrap_or(1.0)
    })
    .parse(input)
}

pub fn parse_lengths(input: &str) -> IResult<&str, Vec<f32>> {
    separated_list1(multispace1, parse_length).parse(input)
}

pub fn parse_color(input: &str) -> IResult<&str, Color> {
    map_res(
        recognize((char('#'), take_while1(|c: char| c.is_ascii_hexdigit()))),
        Color::parse_hex,
    )
    .parse(input)
}

pub fn parse_border_style(input: &str) -> IResult<&str, BorderStyle> {
    alt((
        value(BorderStyle::Solid, tag_no_case("solid")),
        value(BorderStyle::Dashed, tag_no_case("dashed")),
        value(BorderStyle::Dotted, tag_no_case("dotted")),
        value(BorderStyle::Double, tag_no_case("double")),
        value(BorderStyle::None, tag_no_case("none")),
    ))
    .parse(input)
}

/// Parses `"<width> <style> [<color>]"`, e.g. `"0.5pt solid #cccccc"`, or `"none"`.
pub fn parse_border(input: &str) -> IResult<&str, Border> {
    alt((
        map(
            (
                parse_length,
                preceded(multispace1, parse_border_style),
                opt(preceded(multispace1, parse_color)),
            ),
            |(width, style, color)| Border {
                width,
                style,
                color: color.unwrap_or(Color::BLACK),
            },
        ),
        value(Border::none(), tag_no_case("none")),
    ))
    .parse(input)
}

/// Runs a parser over the whole (trimmed) input.
pub fn run_parser<'a, T, P>(mut parser: P, input: &'a str) -> Result<T, StyleParseError>
where
    P: Parser<&'a str, Output = T, Error = nom::error::Error<&'a str>>,
{
    match parser.parse(input.trim()) {
        Ok(("", result)) => Ok(result),
        Ok((rem, _)) => Err(StyleParseError::Parse(format!(
            "Parser did not consume all input. Remainder: '{}'",
            rem
        ))),
        Err(e) => Err(StyleParseError::Parse(e.to_string())),
    }
}

pub fn length(s: &str) -> Result<f32, StyleParseError> {
    run_parser(parse_length, s).map_err(|_| StyleParseError::InvalidValue {
        property: "length".to_string(),
        value: s.to_string(),
    })
}

/// CSS-style margin shorthand: 1, 2, 3 or 4 lengths.
pub fn margins(s: &str) -> Result<Margins, StyleParseError> {
    let values = run_parser(parse_lengths, s)?;
    match values.as_slice() {
        [all] => Ok(Margins::all(*all)),
        [y, x] => Ok(Margins { top: *y, right: *x, bottom: *y, left: *x }),
        [top, x, bottom] => Ok(Margins { top: *top, right: *x, bottom: *bottom, left: *x }),
        [top, right, bottom, left] => Ok(Margins {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        _ => Err(StyleParseError::InvalidValue {
            property: "margin".to_string(),
            value: s.to_string(),
        }),
    }
}

pub fn border(s: &str) -> Result<Border, StyleParseError> {
    run_parser(parse_border, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(length("12").unwrap(), 12.0);
        assert_eq!(length("12pt").unwrap(), 12.0);
        assert!(approx(length("1in").unwrap(), 72.0));
        assert!(approx(length("2.54cm").unwrap(), 72.0));
        assert!(approx(length("25.4mm").unwrap(), 72.0));
        assert!(approx(length(".5in").unwrap(), 36.0));
        assert!(approx(length("-3pt").unwrap(), -3.0));
        assert!(length("twelve").is_err());
        assert!(length("12 pt").is_err());
    }

    #[test]
    fn margin_shorthand() {
        assert_eq!(margins("6pt").unwrap(), Margins::all(6.0));
        let m = margins("1pt 2pt 3pt 4pt").unwrap();
        assert_eq!((m.top, m.right, m.bottom, m.left), (1.0, 2.0, 3.0, 4.0));
        let m = margins("1pt 2pt").unwrap();
        assert_eq!((m.top, m.right, m.bottom, m.left), (1.0, 2.0, 1.0, 2.0));
        assert!(margins("1 2 3 4 5").is_err());
    }

    #[test]
    fn border_shorthand() {
        let b = border("2pt solid #00ff00").unwrap();
        assert_eq!(b.width, 2.0);
        assert_eq!(b.style, BorderStyle::Solid);
        assert_eq!(b.color, Color::rgb(0, 255, 0));

        let b = border("0.5pt dotted").unwrap();
        assert_eq!(b.style, BorderStyle::Dotted);
        assert_eq!(b.color, Color::BLACK);

        assert_eq!(border("none").unwrap().style, BorderStyle::None);
        assert!(border("solid 2pt").is_err());
    }
}
