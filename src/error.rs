/*!
# Error types

This module holds the error types returned by the various functions of this
crate.
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

use crate::strings::Name;

pub use crate::errctx::*;

/// [`std::sync::Arc`]-based wrapper around [`std::io::Error`] to allow
/// cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl AsRef<io::Error> for IOErrorWrapper {
	fn as_ref(&self) -> &io::Error {
		&*self.0
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Violation of a well-formedness constraint or the XML 1.0 grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum WFError {
	/// End-of-data encountered during a construct where more input was
	/// expected.
	///
	/// The contents are implementation details.
	InvalidEof(&'static str),

	/// Unicode codepoint which is not allowed in XML 1.0 encountered.
	///
	/// The boolean indicates whether the codepoint came from a character
	/// reference.
	///
	/// The contents are implementation details.
	InvalidChar(&'static str, u32, bool),

	/// Unicode codepoint which was not expected at that point in the
	/// grammar.
	///
	/// The contents are implementation details.
	UnexpectedChar(&'static str, char, Option<&'static [&'static str]>),

	/// Generalized invalid syntactic construct which does not fit into any
	/// of the other categories.
	///
	/// The contents are implementation details.
	InvalidSyntax(&'static str),
}

impl error::Error for WFError {}

impl fmt::Display for WFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			WFError::InvalidEof(ctx) => write!(f, "invalid eof {}", ctx),
			WFError::InvalidChar(ctx, cp, false) => {
				write!(f, "invalid codepoint U+{:x} {}", cp, ctx)
			}
			WFError::InvalidChar(ctx, cp, true) => write!(
				f,
				"character reference expanded to invalid codepoint U+{:x} {}",
				cp, ctx
			),
			WFError::UnexpectedChar(ctx, ch, Some(opts)) if opts.len() > 0 => {
				write!(f, "U+{:x} not allowed {} (expected ", *ch as u32, ctx)?;
				if opts.len() == 1 {
					f.write_str(opts[0])?;
				} else {
					f.write_str("one of: ")?;
					for (i, opt) in opts.iter().enumerate() {
						if i > 0 {
							f.write_str(", ")?;
						}
						f.write_str(*opt)?;
					}
				}
				f.write_str(")")
			}
			WFError::UnexpectedChar(ctx, ch, _) => {
				write!(f, "U+{:x} not allowed {}", *ch as u32, ctx)
			}
			WFError::InvalidSyntax(msg) => write!(f, "invalid syntax: {}", msg),
		}
	}
}

/// Error types which may be returned from the parser or lexer.
///
/// All errors are fatal: after the first error has been returned, the parser
/// or lexer will return the same error indefinitely.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// A violation of the XML 1.0 grammar or a well-formedness constraint
	/// was encountered during lexing.
	NotWellFormed(WFError),

	/// A keyword was encountered where one of a small set of specific
	/// keywords was required (for instance a declaration keyword in the
	/// internal subset which is not one of `ELEMENT`, `ATTLIST`, `ENTITY`
	/// or `NOTATION`).
	///
	/// The offending word is carried verbatim.
	UnknownToken(String),

	/// Reference to an entity which is neither one of the five predefined
	/// entities nor resolvable through the configured entity resolver.
	UnknownEntity(Name),

	/// An invalid Unicode scalar value was encountered during decoding.
	InvalidChar(u32),

	/// A byte which cannot occur at this point of a well-formed sequence of
	/// the given encoding was encountered during decoding.
	InvalidByte(&'static str, u8),

	/// The XML declaration named an encoding which is not among the built-in
	/// set and which the configured handler could not provide a decoder for.
	UnknownEncoding(String),

	/// A size limit was exceeded (see
	/// [`LexerOptions::max_token_length`](crate::LexerOptions)).
	LimitExceeded(&'static str),

	/// Fewer than four bytes of input were available for encoding
	/// autodetection although the end of input was signalled.
	TooFew,

	/// `parse` was called on a parser which has already reported the end of
	/// the document.
	Finished,

	/// An I/O error was reported by the byte source of an I/O-driven
	/// front-end (see `AsyncParser`).
	///
	/// The core parser performs no I/O and never produces this variant
	/// itself.
	IO(IOErrorWrapper),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub(crate) fn wfeof(ctx: &'static str) -> Error {
		Error::NotWellFormed(WFError::InvalidEof(ctx))
	}
}

impl From<WFError> for Error {
	fn from(e: WFError) -> Error {
		Error::NotWellFormed(e)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::NotWellFormed(e) => write!(f, "not-well-formed: {}", e),
			Error::UnknownToken(word) => write!(f, "unknown token: {:?}", word),
			Error::UnknownEntity(name) => write!(f, "unknown entity: {:?}", name.as_str()),
			Error::InvalidChar(cp) => write!(f, "invalid char: U+{:08x}", cp),
			Error::InvalidByte(enc, b) => write!(f, "invalid {} byte: \\x{:02x}", enc, b),
			Error::UnknownEncoding(label) => write!(f, "unknown encoding: {:?}", label),
			Error::LimitExceeded(what) => write!(f, "limit exceeded: {}", what),
			Error::TooFew => f.write_str("not enough bytes to detect the encoding"),
			Error::Finished => f.write_str("parse called on a finished parser"),
			Error::IO(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::NotWellFormed(e) => Some(e),
			Error::IO(e) => Some(&**e),
			_ => None,
		}
	}
}
