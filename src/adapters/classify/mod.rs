//! Caption / filename classification.

pub mod title_parser;

pub use title_parser::TitleParser;
