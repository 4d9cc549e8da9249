pub mod border;
pub mod dimension;
pub mod font;
pub mod list;
pub mod parsers;
pub mod stylesheet;
pub mod text;

pub use border::{Border, BorderStyle};
pub use dimension::{Margins, PageSize};
pub use font::{FontStyle, FontWeight};
pub use list::ListStyleType;
pub use parsers::StyleParseError;
pub use stylesheet::{ElementStyle, Selector, StyleRule, StyleSheet};
pub use text::{TextAlign, TextDecoration};
