//! List counter styles and their label rendering.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum ListStyleType {
    #[default]
    Disc,
    Circle,
    Square,
    Dash,
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    None,
}

impl ListStyleType {
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            ListStyleType::Decimal
                | ListStyleType::LowerAlpha
                | ListStyleType::UpperAlpha
                | ListStyleType::LowerRoman
                | ListStyleType::UpperRoman
        )
    }

    /// The hanging label for the item with counter value `n` (1-based).
    pub fn label(&self, n: usize) -> String {
        match self {
            ListStyleType::Disc => "\u{2022}".to_string(),
            ListStyleType::Circle => "o".to_string(),
            ListStyleType::Square => "\u{00b7}".to_string(),
            ListStyleType::Dash => "\u{2013}".to_string(),
            ListStyleType::Decimal => format!("{}.", n),
            ListStyleType::LowerAlpha => format!("{}.", alpha(n)),
            ListStyleType::UpperAlpha => format!("{}.", alpha(n).to_uppercase()),
            ListStyleType::LowerRoman => format!("{}.", roman(n)),
            ListStyleType::UpperRoman => format!("{}.", roman(n).to_uppercase()),
            ListStyleType::None => String::new(),
        }
    }
}

/// a, b, ..., z, aa, ab, ...
fn alpha(mut n: usize) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

fn roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    if n == 0 {
        return "0".to_string();
    }
    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters() {
        assert_eq!(ListStyleType::Decimal.label(3), "3.");
        assert_eq!(ListStyleType::LowerAlpha.label(1), "a.");
        assert_eq!(ListStyleType::LowerAlpha.label(27), "aa.");
        assert_eq!(ListStyleType::UpperRoman.label(14), "XIV.");
        assert_eq!(ListStyleType::LowerRoman.label(1994), "mcmxciv.");
        assert_eq!(ListStyleType::None.label(5), "");
    }

    #[test]
    fn ordered_types() {
        assert!(ListStyleType::Decimal.is_ordered());
        assert!(!ListStyleType::Disc.is_ordered());
    }
}
