/*!
# Codepoint classification for the XML 1.0 grammar

Constants and utilities for matching ranges of codepoints. The character
classes defined here are those of XML 1.0 (not 1.1).
*/
use std::fmt;

/**
# Predicate trait for matching chars
*/
pub trait CharSelector {
	/// Return true if the given char is selected by the selector
	fn select(&self, c: char) -> bool;
}

impl CharSelector for char {
	fn select(&self, c: char) -> bool {
		*self == c
	}
}

impl CharSelector for &'_ [char] {
	fn select(&self, c: char) -> bool {
		for r in self.iter() {
			if *r == c {
				return true;
			}
		}
		false
	}
}

// start to end (incl., because some of our edge points are not valid chars
// in rust)
/// Selects all chars from a range (including both ends)
pub struct CodepointRange(pub char, pub char);

impl CodepointRange {
	pub fn contains(&self, c: char) -> bool {
		return (self.0 <= c) && (c <= self.1);
	}
}

/// Selects all chars from any of the contained ranges
#[derive(Copy)]
pub struct CodepointRanges(pub &'static [CodepointRange]);

impl CharSelector for CodepointRange {
	fn select(&self, c: char) -> bool {
		self.contains(c)
	}
}

impl CharSelector for CodepointRanges {
	fn select(&self, c: char) -> bool {
		contained_in_ranges(c, self.0)
	}
}

pub fn contained_in_ranges(c: char, rs: &[CodepointRange]) -> bool {
	for r in rs.iter() {
		if r.contains(c) {
			return true;
		}
	}
	false
}

impl fmt::Debug for CodepointRanges {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "CodepointRanges(<{} ranges>)", self.0.len())
	}
}

impl Clone for CodepointRanges {
	fn clone(&self) -> Self {
		CodepointRanges(self.0)
	}
}

impl PartialEq for CodepointRanges {
	fn eq(&self, other: &CodepointRanges) -> bool {
		std::ptr::eq(&self.0, &other.0)
	}
}

/// Invalid codepoints for character data (XML 1.0 § 2.2)
///
/// Note that values which are not valid Rust characters are not included in
/// these ranges.
pub const INVALID_XML_CDATA_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x00', '\x08'),
	CodepointRange('\x0b', '\x0c'),
	CodepointRange('\x0e', '\x1f'),
	CodepointRange('\u{fffe}', '\u{ffff}'),
];

const VALID_XML_NAME_START_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

const VALID_XML_NAME_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('-', '-'),
	CodepointRange('.', '.'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('0', '9'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{b7}', '\u{b7}'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{300}', '\u{36f}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{203f}', '\u{2040}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

// XML 1.0 § 2.3 [13]; note that the apostrophe is a valid pubid char, the
// literal scanner excludes it when it is the delimiter.
const VALID_XML_PUBID_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x0a', '\x0a'),
	CodepointRange('\x0d', '\x0d'),
	CodepointRange('\x20', '\x21'), // space and !
	CodepointRange('\x23', '\x25'), // # $ %
	CodepointRange('\x27', '\x3b'), // ' ( ) * + , - . / 0-9 : ;
	CodepointRange('=', '='),
	CodepointRange('?', '@'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('a', 'z'),
];

const VALID_XML_HEXADECIMALS: &'static [CodepointRange] = &[
	CodepointRange('0', '9'),
	CodepointRange('A', 'F'),
	CodepointRange('a', 'f'),
];

/// Valid non-first characters for an XML Name (XML 1.0 § 2.3 \[4a\])
pub static CLASS_XML_NAME: CodepointRanges = CodepointRanges(VALID_XML_NAME_RANGES);

/// Valid first characters for an XML Name (XML 1.0 § 2.3 \[4\])
pub static CLASS_XML_NAMESTART: CodepointRanges = CodepointRanges(VALID_XML_NAME_START_RANGES);

/// See [`INVALID_XML_CDATA_RANGES`]
pub static CLASS_XML_NONCHAR: CodepointRanges = CodepointRanges(INVALID_XML_CDATA_RANGES);

/// Valid characters for a public identifier (XML 1.0 § 2.3 \[13\])
pub static CLASS_XML_PUBID: CodepointRanges = CodepointRanges(VALID_XML_PUBID_RANGES);

/// XML whitespace
pub static CLASS_XML_SPACES: &'static [char] = &[' ', '\t', '\r', '\n'];

/// Valid XML decimal characters (for character references)
pub const CLASS_XML_DECIMAL_DIGITS: CodepointRange = CodepointRange('0', '9');

/// Valid XML hexadecimal characters (for character references)
pub static CLASS_XML_HEXADECIMAL_DIGITS: CodepointRanges =
	CodepointRanges(VALID_XML_HEXADECIMALS);

/// Check whether a char is XML whitespace (XML 1.0 § 2.3 \[3\])
pub fn is_space(c: char) -> bool {
	CLASS_XML_SPACES.select(c)
}

/// Check whether a char may start an XML Name
pub fn is_name_start_char(c: char) -> bool {
	CLASS_XML_NAMESTART.select(c)
}

/// Check whether a char may continue an XML Name or form an Nmtoken
pub fn is_name_char(c: char) -> bool {
	CLASS_XML_NAME.select(c)
}

/// Check whether a char is a valid XML 1.0 `Char` (XML 1.0 § 2.2 \[2\])
pub fn is_xml_char(c: char) -> bool {
	!CLASS_XML_NONCHAR.select(c)
}

/// Check whether a char may appear in a public identifier literal
pub fn is_pubid_char(c: char) -> bool {
	CLASS_XML_PUBID.select(c)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn name_classes_match_plain_ascii_names() {
		for c in "foobar_2342:x".chars() {
			assert!(is_name_char(c));
		}
		assert!(is_name_start_char('f'));
		assert!(is_name_start_char('_'));
		assert!(!is_name_start_char('-'));
		assert!(!is_name_start_char('2'));
	}

	#[test]
	fn nonchar_class_rejects_control_chars() {
		assert!(!is_xml_char('\x00'));
		assert!(!is_xml_char('\x0b'));
		assert!(!is_xml_char('\u{fffe}'));
		assert!(is_xml_char('\t'));
		assert!(is_xml_char('\n'));
		assert!(is_xml_char('\r'));
		assert!(is_xml_char(' '));
		assert!(is_xml_char('\u{10000}'));
	}

	#[test]
	fn pubid_class_matches_the_grammar() {
		for c in "abc XYZ 0123456789 -'()+,./:=?;!*#@$_%\r\n".chars() {
			assert!(is_pubid_char(c), "U+{:04x} must be a pubid char", c as u32);
		}
		assert!(!is_pubid_char('"'));
		assert!(!is_pubid_char('&'));
		assert!(!is_pubid_char('<'));
		assert!(!is_pubid_char('\t'));
		assert!(!is_pubid_char('ä'));
	}

	#[test]
	fn digit_classes() {
		for c in "0123456789".chars() {
			assert!(CLASS_XML_DECIMAL_DIGITS.select(c));
			assert!(CLASS_XML_HEXADECIMAL_DIGITS.select(c));
		}
		for c in "abcdefABCDEF".chars() {
			assert!(!CLASS_XML_DECIMAL_DIGITS.select(c));
			assert!(CLASS_XML_HEXADECIMAL_DIGITS.select(c));
		}
		assert!(!CLASS_XML_HEXADECIMAL_DIGITS.select('g'));
	}
}
