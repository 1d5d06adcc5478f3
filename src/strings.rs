/*!
# Strongly-typed strings for use with XML 1.0 documents

This module defines string- and str-like types which represent pieces of text
as they may occur in XML documents. These types are checked to contain only
text which conforms to the respective grammar in the XML 1.0 specification.

This allows to carry information about the checking which already took place
in the parser to the application, avoiding the need to execute checks
multiple times.

## Type Overview

- [`Name`] and [`NameStr`] represent the `Name` production and are used for
  element, attribute, entity and notation names. Note that names may contain
  colons; the parser is not namespace-aware and only offers
  [`NameStr::split_name`] to split off a prefix.
- [`CData`] and [`CDataStr`] represent strings of XML `Char`s, which are
  slightly more restrictive than Rust `char`. They are used for attribute
  values, text, literals and similar character data.

  Note that [`CData`] strings do not contain references or CDATA sections;
  those are expanded by the lexer.

## Construction

Owned values are constructed using the [`std::convert::TryFrom`] mechanism
from `&str` or [`String`]. [`Name`] converts into [`CData`] without
re-checking via `.into()`; the inverse direction requires `try_into`.
*/
use std::borrow::{Borrow, ToOwned};
use std::convert::TryFrom;
use std::fmt;
use std::ops::Deref;
use std::result::Result as StdResult;

use smartstring::alias::String as SmartString;

use crate::error::{Error, WFError, ERRCTX_UNKNOWN};
use crate::selectors::{is_name_char, is_name_start_char, is_xml_char};

/// Check whether a str is a valid XML 1.0 `Name`.
pub fn validate_name(s: &str) -> StdResult<(), WFError> {
	let mut chars = s.chars();
	match chars.next() {
		// must have at least one char
		None => return Err(WFError::InvalidSyntax("Name must have at least one Char")),
		Some(c) => {
			if !is_name_start_char(c) {
				return Err(WFError::UnexpectedChar(ERRCTX_UNKNOWN, c, None));
			}
		}
	}
	for ch in chars {
		if !is_name_char(ch) {
			return Err(WFError::UnexpectedChar(ERRCTX_UNKNOWN, ch, None));
		}
	}
	Ok(())
}

/// Check whether a str is a valid XML 1.0 `Nmtoken`.
pub fn validate_nmtoken(s: &str) -> StdResult<(), WFError> {
	if s.len() == 0 {
		return Err(WFError::InvalidSyntax("Nmtoken must have at least one Char"));
	}
	for ch in s.chars() {
		if !is_name_char(ch) {
			return Err(WFError::UnexpectedChar(ERRCTX_UNKNOWN, ch, None));
		}
	}
	Ok(())
}

/// Check whether a str consists only of valid XML 1.0 `Char`s.
pub fn validate_cdata(s: &str) -> StdResult<(), WFError> {
	for ch in s.chars() {
		if !is_xml_char(ch) {
			return Err(WFError::InvalidChar(ERRCTX_UNKNOWN, ch as u32, false));
		}
	}
	Ok(())
}

macro_rules! xml_string_type {
	(
		$(#[$outer:meta])*
		pub struct $name:ident($string:ty) use $check:ident => $borrowed:ident;
	) => {
		$(#[$outer])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[repr(transparent)]
		pub struct $name($string);

		impl $name {
			/// Extract the inner string and return it.
			pub fn into_inner(self) -> $string {
				self.0
			}

			/// Obtain a reference to the inner string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}

			/// Construct without checking the grammar.
			///
			/// # Safety
			///
			/// The caller is responsible for ensuring that the passed string
			/// is in fact a valid `
			#[doc = stringify!($name)]
			/// `.
			pub unsafe fn from_string_unchecked<T: Into<$string>>(s: T) -> Self {
				Self(s.into())
			}
		}

		impl Deref for $name {
			type Target = $borrowed;

			fn deref(&self) -> &Self::Target {
				// SAFETY: the inner string was checked on construction and
				// the pair macro guarantees that $borrowed uses the same
				// check.
				unsafe { $borrowed::from_str_unchecked(&self.0) }
			}
		}

		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}

		impl Borrow<$borrowed> for $name {
			fn borrow(&self) -> &$borrowed {
				self.deref()
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl AsRef<$borrowed> for $name {
			fn as_ref(&self) -> &$borrowed {
				self.deref()
			}
		}

		impl TryFrom<&str> for $name {
			type Error = Error;

			fn try_from(other: &str) -> Result<Self, Self::Error> {
				$check(other)?;
				Ok(Self(other.into()))
			}
		}

		impl TryFrom<String> for $name {
			type Error = Error;

			fn try_from(other: String) -> Result<Self, Self::Error> {
				$check(&other)?;
				Ok(Self(other.into()))
			}
		}

		impl From<$name> for String {
			fn from(other: $name) -> String {
				other.0.into()
			}
		}

		impl fmt::Display for $name {
			fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				&self.0 == other
			}
		}

		impl PartialEq<$name> for str {
			fn eq(&self, other: &$name) -> bool {
				&other.0 == self
			}
		}

		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				&self.0 == *other
			}
		}

		impl PartialEq<$name> for &str {
			fn eq(&self, other: &$name) -> bool {
				&other.0 == *self
			}
		}
	};
}

macro_rules! xml_str_type {
	(
		$(#[$outer:meta])*
		pub struct $name:ident(str) use $check:ident => $owned:ident;
	) => {
		$(#[$outer])*
		#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[repr(transparent)]
		pub struct $name(str);

		impl $name {
			/// Construct a reference without checking the grammar.
			///
			/// # Safety
			///
			/// The caller is responsible for ensuring that the passed str is
			/// in fact a valid `
			#[doc = stringify!($name)]
			/// `.
			pub unsafe fn from_str_unchecked(s: &str) -> &Self {
				std::mem::transmute(s)
			}

			/// Obtain a reference to the inner string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl<'x> TryFrom<&'x str> for &'x $name {
			type Error = Error;

			fn try_from(other: &'x str) -> Result<Self, Self::Error> {
				$check(other)?;
				// SAFETY: the grammar was checked right above.
				Ok(unsafe { $name::from_str_unchecked(other) })
			}
		}

		impl ToOwned for $name {
			type Owned = $owned;

			fn to_owned(&self) -> Self::Owned {
				// SAFETY: self conforms to the same check by construction.
				unsafe { $owned::from_string_unchecked(&self.0) }
			}
		}

		impl fmt::Display for $name {
			fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				&self.0 == other
			}
		}

		impl PartialEq<$name> for str {
			fn eq(&self, other: &$name) -> bool {
				&other.0 == self
			}
		}
	};
}

xml_string_type! {
	/// String which conforms to the Name production of XML 1.0.
	///
	/// [`Name`] objects are immutable.
	pub struct Name(SmartString) use validate_name => NameStr;
}

xml_str_type! {
	/// str which conforms to the Name production of XML 1.0.
	pub struct NameStr(str) use validate_name => Name;
}

xml_string_type! {
	/// String which consists only of XML 1.0 Chars.
	///
	/// [`CData`] objects are immutable.
	pub struct CData(String) use validate_cdata => CDataStr;
}

xml_str_type! {
	/// str which consists only of XML 1.0 Chars.
	pub struct CDataStr(str) use validate_cdata => CData;
}

impl NameStr {
	/// Split the name at the first colon.
	///
	/// Returns the prefix (if a colon is present) and the remainder. Any
	/// further colons are left inside the remainder; no validation beyond
	/// the Name grammar (which both parts already satisfy as substrings of
	/// a Name, up to the first-char rule) is performed.
	pub fn split_name(&self) -> (Option<&str>, &str) {
		match self.0.find(':') {
			Some(pos) => (Some(&self.0[..pos]), &self.0[pos + 1..]),
			None => (None, &self.0),
		}
	}
}

impl From<Name> for CData {
	fn from(other: Name) -> CData {
		// Names are always valid character data.
		CData(other.0.as_str().into())
	}
}

impl From<Name> for SmartString {
	fn from(other: Name) -> SmartString {
		other.0
	}
}
