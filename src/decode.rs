/*!
# Incremental byte stream decoders

Decoders convert the raw input bytes into Unicode codepoints, one byte at a
time. Each decoder is a small state machine: [`ByteDecoder::feed()`] consumes
exactly one byte and either yields a finished codepoint or asks for more
input. This shape allows the driver to suspend at any byte boundary.

The built-in decoders cover the encodings every XML processor must or
commonly does understand: UTF-8, UTF-16 (both byte orders), UCS-4 (both byte
orders), US-ASCII and ISO 8859-1. Other encodings can be supplied by the
embedder through [`Parser::set_encoding_handler`](crate::Parser).

[`detect_encoding`] implements the guessing logic from Appendix F of the XML
1.0 specification over the first four bytes of the stream.
*/
use std::fmt;

use crate::error::{Error, Result};

/// Byte order of a multi-byte unit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	Big,
	Little,
}

/// Encoding family, used to decide whether an encoding declaration actually
/// changes the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFamily {
	Utf8,
	Utf16,
	Ucs4,
	Ascii,
	Latin1,
}

/// The set of built-in encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Utf8,
	Utf16Be,
	Utf16Le,
	Ucs4Be,
	Ucs4Le,
	Ascii,
	Latin1,
}

impl Encoding {
	/// Return the canonical label of the encoding.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Utf8 => "utf-8",
			Self::Utf16Be => "utf-16be",
			Self::Utf16Le => "utf-16le",
			Self::Ucs4Be => "ucs-4be",
			Self::Ucs4Le => "ucs-4le",
			Self::Ascii => "us-ascii",
			Self::Latin1 => "iso-8859-1",
		}
	}

	/// Resolve an encoding label, compared ASCII-case-insensitively.
	///
	/// Byte-order-agnostic labels (`utf-16`, `ucs-4`) resolve to the
	/// big-endian variant; the driver treats a declaration which stays
	/// within the family of the active encoding as a no-op, so the byte
	/// order detected from the stream wins in that case.
	pub fn from_label(label: &str) -> Option<Encoding> {
		let mut folded = label.to_ascii_lowercase();
		folded.retain(|c| c != '_');
		Some(match folded.as_str() {
			"utf-8" | "utf8" => Self::Utf8,
			"utf-16" | "utf16" | "utf-16be" => Self::Utf16Be,
			"utf-16le" => Self::Utf16Le,
			"ucs-4" | "ucs4" | "iso-10646-ucs-4" | "ucs-4be" => Self::Ucs4Be,
			"ucs-4le" => Self::Ucs4Le,
			"us-ascii" | "ascii" => Self::Ascii,
			"iso-8859-1" | "latin-1" | "latin1" | "iso8859-1" => Self::Latin1,
			_ => return None,
		})
	}

	/// Return the family of the encoding.
	pub fn family(&self) -> EncodingFamily {
		match self {
			Self::Utf8 => EncodingFamily::Utf8,
			Self::Utf16Be | Self::Utf16Le => EncodingFamily::Utf16,
			Self::Ucs4Be | Self::Ucs4Le => EncodingFamily::Ucs4,
			Self::Ascii => EncodingFamily::Ascii,
			Self::Latin1 => EncodingFamily::Latin1,
		}
	}

	/// Construct a fresh decoder for the encoding.
	pub fn new_decoder(&self) -> Box<dyn ByteDecoder> {
		match self {
			Self::Utf8 => Box::new(Utf8Decoder::new()),
			Self::Utf16Be => Box::new(Utf16Decoder::new(Endianness::Big)),
			Self::Utf16Le => Box::new(Utf16Decoder::new(Endianness::Little)),
			Self::Ucs4Be => Box::new(Ucs4Decoder::new(Endianness::Big)),
			Self::Ucs4Le => Box::new(Ucs4Decoder::new(Endianness::Little)),
			Self::Ascii => Box::new(AsciiDecoder()),
			Self::Latin1 => Box::new(Latin1Decoder()),
		}
	}
}

impl fmt::Display for Encoding {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.label())
	}
}

/**
# Per-byte decoder step

A decoder consumes one byte per call and yields a codepoint as soon as one is
complete. Malformed sequences are rejected at the earliest byte at which they
can be detected.
*/
pub trait ByteDecoder {
	/// Feed a single byte.
	///
	/// Returns `Ok(None)` if more bytes are needed to complete the current
	/// codepoint and `Ok(Some(_))` once it is complete.
	fn feed(&mut self, byte: u8) -> Result<Option<char>>;

	/// Return true if the decoder is in the middle of a multi-byte
	/// sequence.
	///
	/// The driver uses this to reject input which ends mid-codepoint.
	fn pending(&self) -> bool;
}

fn checked_scalar(raw: u32) -> Result<char> {
	if raw >= 0xd800 && raw <= 0xdfff {
		return Err(Error::InvalidChar(raw));
	}
	std::char::from_u32(raw).ok_or(Error::InvalidChar(raw))
}

/// Incremental UTF-8 decoder.
///
/// Overlong forms, surrogates and values beyond U+10FFFF are rejected.
pub struct Utf8Decoder {
	acc: u32,
	needed: u8,
	min: u32,
}

impl Utf8Decoder {
	pub fn new() -> Utf8Decoder {
		Utf8Decoder {
			acc: 0,
			needed: 0,
			min: 0,
		}
	}
}

impl ByteDecoder for Utf8Decoder {
	fn feed(&mut self, byte: u8) -> Result<Option<char>> {
		if self.needed == 0 {
			return match byte {
				0x00..=0x7f => Ok(Some(byte as char)),
				// 0xc0 and 0xc1 would always encode overlong forms
				0xc2..=0xdf => {
					self.acc = (byte & 0x1f) as u32;
					self.needed = 1;
					self.min = 0x80;
					Ok(None)
				}
				0xe0..=0xef => {
					self.acc = (byte & 0x0f) as u32;
					self.needed = 2;
					self.min = 0x800;
					Ok(None)
				}
				0xf0..=0xf4 => {
					self.acc = (byte & 0x07) as u32;
					self.needed = 3;
					self.min = 0x10000;
					Ok(None)
				}
				_ => Err(Error::InvalidByte("utf-8", byte)),
			};
		}
		if byte & 0xc0 != 0x80 {
			// reset so that a caught error does not poison the next sequence
			self.needed = 0;
			return Err(Error::InvalidByte("utf-8", byte));
		}
		self.acc = (self.acc << 6) | ((byte & 0x3f) as u32);
		self.needed -= 1;
		if self.needed > 0 {
			return Ok(None);
		}
		let raw = self.acc;
		if raw < self.min || raw > 0x10ffff {
			return Err(Error::InvalidChar(raw));
		}
		Ok(Some(checked_scalar(raw)?))
	}

	fn pending(&self) -> bool {
		self.needed > 0
	}
}

/// Incremental UTF-16 decoder.
///
/// Surrogate pairs are joined across two units; lone surrogates are
/// rejected.
pub struct Utf16Decoder {
	endianness: Endianness,
	first: Option<u8>,
	high: Option<u16>,
}

impl Utf16Decoder {
	pub fn new(endianness: Endianness) -> Utf16Decoder {
		Utf16Decoder {
			endianness: endianness,
			first: None,
			high: None,
		}
	}
}

impl ByteDecoder for Utf16Decoder {
	fn feed(&mut self, byte: u8) -> Result<Option<char>> {
		let first = match self.first.take() {
			None => {
				self.first = Some(byte);
				return Ok(None);
			}
			Some(b) => b,
		};
		let unit = match self.endianness {
			Endianness::Big => ((first as u16) << 8) | (byte as u16),
			Endianness::Little => ((byte as u16) << 8) | (first as u16),
		};
		match self.high.take() {
			Some(high) => {
				if unit >= 0xdc00 && unit <= 0xdfff {
					let raw = 0x10000u32
						+ (((high - 0xd800) as u32) << 10)
						+ ((unit - 0xdc00) as u32);
					Ok(Some(checked_scalar(raw)?))
				} else {
					// high surrogate without a low surrogate
					Err(Error::InvalidChar(high as u32))
				}
			}
			None => {
				if unit >= 0xd800 && unit <= 0xdbff {
					self.high = Some(unit);
					Ok(None)
				} else if unit >= 0xdc00 && unit <= 0xdfff {
					Err(Error::InvalidChar(unit as u32))
				} else {
					Ok(Some(checked_scalar(unit as u32)?))
				}
			}
		}
	}

	fn pending(&self) -> bool {
		self.first.is_some() || self.high.is_some()
	}
}

/// Incremental UCS-4 decoder.
pub struct Ucs4Decoder {
	endianness: Endianness,
	acc: u32,
	have: u8,
}

impl Ucs4Decoder {
	pub fn new(endianness: Endianness) -> Ucs4Decoder {
		Ucs4Decoder {
			endianness: endianness,
			acc: 0,
			have: 0,
		}
	}
}

impl ByteDecoder for Ucs4Decoder {
	fn feed(&mut self, byte: u8) -> Result<Option<char>> {
		match self.endianness {
			Endianness::Big => {
				self.acc = (self.acc << 8) | (byte as u32);
			}
			Endianness::Little => {
				self.acc |= (byte as u32) << (8 * self.have);
			}
		}
		self.have += 1;
		if self.have < 4 {
			return Ok(None);
		}
		let raw = self.acc;
		self.acc = 0;
		self.have = 0;
		Ok(Some(checked_scalar(raw)?))
	}

	fn pending(&self) -> bool {
		self.have > 0
	}
}

/// US-ASCII decoder; bytes ≥ 0x80 are rejected.
pub struct AsciiDecoder();

impl ByteDecoder for AsciiDecoder {
	fn feed(&mut self, byte: u8) -> Result<Option<char>> {
		if byte < 0x80 {
			Ok(Some(byte as char))
		} else {
			Err(Error::InvalidByte("us-ascii", byte))
		}
	}

	fn pending(&self) -> bool {
		false
	}
}

/// ISO 8859-1 decoder; every byte maps to the codepoint of the same value.
pub struct Latin1Decoder();

impl ByteDecoder for Latin1Decoder {
	fn feed(&mut self, byte: u8) -> Result<Option<char>> {
		Ok(Some(byte as char))
	}

	fn pending(&self) -> bool {
		false
	}
}

/// Guess the encoding from the first four bytes of the stream.
///
/// Implements the byte-order-mark and zero-byte-pattern rules of Appendix F
/// of the XML 1.0 specification. Returns the detected encoding together with
/// the number of leading bytes which belong to the byte order mark and must
/// not be handed to the decoder. Streams which match none of the patterns
/// are UTF-8.
pub fn detect_encoding(prefix: &[u8; 4]) -> (Encoding, usize) {
	match prefix {
		[0x00, 0x00, 0xfe, 0xff] => (Encoding::Ucs4Be, 4),
		[0xff, 0xfe, 0x00, 0x00] => (Encoding::Ucs4Le, 4),
		[0xfe, 0xff, _, _] => (Encoding::Utf16Be, 2),
		[0xff, 0xfe, _, _] => (Encoding::Utf16Le, 2),
		[0xef, 0xbb, 0xbf, _] => (Encoding::Utf8, 3),
		[0x00, 0x00, 0x00, 0x3c] => (Encoding::Ucs4Be, 0),
		[0x3c, 0x00, 0x00, 0x00] => (Encoding::Ucs4Le, 0),
		[0x00, 0x3c, 0x00, 0x3f] => (Encoding::Utf16Be, 0),
		[0x3c, 0x00, 0x3f, 0x00] => (Encoding::Utf16Le, 0),
		_ => (Encoding::Utf8, 0),
	}
}
