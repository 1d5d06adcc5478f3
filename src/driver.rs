/*!
# Driver for the decoder, normalizer and lexer layers

The [`Parser`] owns the byte buffer, the active decoder, the newline
normalizer and the lexer, and cycles them until a single [`Event`] falls
out. It is the type callers interact with: feed chunks of bytes in whatever
sizes they arrive, read events until [`Event::EndOfBuffer`] says the input
is drained, repeat.

Suspension is explicit and synchronous: there is no I/O, no threading, and
no state outside the `Parser` value itself. Dropping the parser cancels the
parse; nothing needs to be released.
*/
use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::bufq::BufferQueue;
use crate::decode::{detect_encoding, ByteDecoder, Encoding};
use crate::error::*;
use crate::lexer::nlnorm::{NewlineNormalizer, Norm};
use crate::lexer::{Event, Lexed, Lexer, LexerOptions, StepInput};
use crate::strings::NameStr;

/// Callback resolving a non-predefined entity reference to its replacement
/// text.
pub type EntityResolver = Box<dyn FnMut(&NameStr) -> Option<String>>;

/// Callback providing a decoder for an encoding label outside the built-in
/// set.
pub type EncodingHandler = Box<dyn FnMut(&str) -> Option<Box<dyn ByteDecoder>>>;

/// Hold options to configure a [`Parser`].
///
/// See also [`Parser::with_options()`].
pub struct ParserOptions {
	/// Encoding of the input.
	///
	/// If absent, the encoding is autodetected from the first four bytes of
	/// the stream and possibly refined by the XML declaration.
	pub encoding: Option<Encoding>,

	/// Options passed on to the lexer.
	pub lexer: LexerOptions,
}

impl ParserOptions {
	/// Set the [`ParserOptions::encoding`] value.
	pub fn encoding(mut self, v: Encoding) -> ParserOptions {
		self.encoding = Some(v);
		self
	}

	/// Set the [`LexerOptions::max_token_length`] value.
	pub fn max_token_length(mut self, v: usize) -> ParserOptions {
		self.lexer = self.lexer.max_token_length(v);
		self
	}
}

impl Default for ParserOptions {
	fn default() -> Self {
		Self {
			encoding: None,
			lexer: LexerOptions::default(),
		}
	}
}

/**
# Chunk-fed XML 1.0 pull parser

The `Parser` consumes an untrusted byte stream fed to it in arbitrarily
sized chunks and produces one [`Event`] per [`Parser::read()`] call.

## Example

```
use sxml::{Event, Parser};
let mut p = Parser::new();
p.feed(&b"<hello>World!</hello>"[..]);
p.feed_eof();
assert!(matches!(p.read().unwrap(), Event::StartElement(name, _) if name == "hello"));
assert!(matches!(p.read().unwrap(), Event::Text(t) if t == "World!"));
assert!(matches!(p.read().unwrap(), Event::EndElement(_)));
assert!(matches!(p.read().unwrap(), Event::EndOfData));
```

## Suspension

When the buffered input is exhausted before an event is complete,
[`Parser::read()`] returns [`Event::EndOfBuffer`] (after flushing any
partial text); the parser stays exactly where it was and the next `read`
after more `feed`s resumes mid-token, down to single-byte granularity
inside multi-byte encoded codepoints.

## Errors

All errors are fatal: the parser caches the first error and returns it for
every further call. After [`Event::EndOfData`] has been returned, further
reads fail with [`Error::Finished`].
*/
pub struct Parser {
	lexer: Lexer,
	nlnorm: NewlineNormalizer,
	buffer: BufferQueue,
	decoder: Option<Box<dyn ByteDecoder>>,
	encoding: Option<Encoding>,
	/// bytes collected for encoding autodetection
	sniff: Vec<u8>,
	/// bytes to re-feed through the decoder after autodetection
	replay: VecDeque<u8>,
	/// normalizer output which has not reached the lexer yet
	pending: VecDeque<char>,
	at_start: bool,
	finished: bool,
	poisoned: Option<Error>,
	opts_encoding: Option<Encoding>,
	lexer_opts: LexerOptions,
	entity_resolver: Option<EntityResolver>,
	encoding_handler: Option<EncodingHandler>,
}

impl Parser {
	/// Create a parser with default options and encoding autodetection.
	pub fn new() -> Parser {
		Self::with_options(ParserOptions::default())
	}

	/// Create a parser with the given options.
	pub fn with_options(opts: ParserOptions) -> Parser {
		Parser {
			lexer: Lexer::with_options(opts.lexer),
			nlnorm: NewlineNormalizer::new(),
			buffer: BufferQueue::new(),
			decoder: opts.encoding.map(|e| e.new_decoder()),
			encoding: opts.encoding,
			sniff: Vec::new(),
			replay: VecDeque::new(),
			pending: VecDeque::new(),
			at_start: true,
			finished: false,
			poisoned: None,
			opts_encoding: opts.encoding,
			lexer_opts: opts.lexer,
			entity_resolver: None,
			encoding_handler: None,
		}
	}

	/// Install a callback which resolves entity references beyond the five
	/// predefined ones.
	///
	/// The string returned by the callback is inlined verbatim into the
	/// surrounding text or attribute value; it is *not* parsed as markup.
	/// Detection of recursive entity definitions is therefore the
	/// callback's business, not the parser's. Without a callback, any such
	/// reference fails the parse with [`Error::UnknownEntity`].
	pub fn set_entity_resolver(&mut self, resolver: EntityResolver) {
		self.entity_resolver = Some(resolver);
	}

	/// Install a callback which provides decoders for encoding labels
	/// outside the built-in set.
	///
	/// Without a callback, an XML declaration naming an unknown encoding
	/// fails the parse with [`Error::UnknownEncoding`].
	pub fn set_encoding_handler(&mut self, handler: EncodingHandler) {
		self.encoding_handler = Some(handler);
	}

	/// Name of the encoding currently being decoded, if it is one of the
	/// built-in set.
	///
	/// `None` before autodetection has seen enough bytes and while an
	/// embedder-supplied decoder is active.
	pub fn encoding(&self) -> Option<Encoding> {
		self.encoding
	}

	/// True once [`Event::EndOfData`] has been returned.
	pub fn is_finished(&self) -> bool {
		self.finished
	}

	/// Append a chunk of input bytes to the buffer.
	///
	/// # Panics
	///
	/// If [`Parser::feed_eof()`] has been called before.
	pub fn feed<T: Into<Bytes>>(&mut self, chunk: T) {
		self.buffer.push(chunk);
	}

	/// Signal that no further input will be fed.
	///
	/// Calling this more than once is permitted and has no further effect.
	pub fn feed_eof(&mut self) {
		if !self.buffer.eof_pushed() {
			self.buffer.push_eof();
		}
	}

	/// Single-call interface: append `chunk` (if any), optionally signal
	/// the end of input, then read the next event.
	pub fn parse(&mut self, chunk: Option<&[u8]>, finish: bool) -> Result<Event> {
		if let Some(chunk) = chunk {
			if self.finished || self.poisoned.is_some() {
				// surface the stored condition instead of panicking on the
				// buffer
				return self.read();
			}
			self.feed(Bytes::copy_from_slice(chunk));
		}
		if finish {
			self.feed_eof();
		}
		self.read()
	}

	/// Drive the layers until one event is produced.
	pub fn read(&mut self) -> Result<Event> {
		if let Some(e) = self.poisoned.as_ref() {
			return Err(e.clone());
		}
		if self.finished {
			return Err(Error::Finished);
		}
		let result = self.read_inner();
		match result.as_ref() {
			Ok(Event::EndOfData) => {
				self.finished = true;
			}
			Ok(_) => (),
			Err(e) => {
				self.poisoned = Some(e.clone());
			}
		}
		result
	}

	fn read_inner(&mut self) -> Result<Event> {
		loop {
			// 1. drain normalizer output towards the lexer
			if let Some(ch) = self.pending.pop_front() {
				if let Some(ev) = self.drive_lexer_char(ch)? {
					return Ok(ev);
				}
				continue;
			}
			// 2. an encoding must be known before bytes can be interpreted
			if self.decoder.is_none() {
				if !self.autodetect()? {
					return Ok(Event::EndOfBuffer);
				}
				continue;
			}
			// 3. pull one byte, through the decoder, into the normalizer
			let byte = match self.replay.pop_front() {
				Some(b) => Some(b),
				None => self.buffer.pop_byte(),
			};
			match byte {
				Some(b) => {
					let decoder = self.decoder.as_mut().unwrap();
					if let Some(cp) = decoder.feed(b)? {
						match self.nlnorm.feed(cp) {
							Norm::Empty => (),
							Norm::One(a) => self.pending.push_back(a),
							Norm::Two(a, b) => {
								self.pending.push_back(a);
								self.pending.push_back(b);
							}
						}
					}
				}
				None if self.buffer.eof_pushed() => {
					if self.decoder.as_ref().unwrap().pending() {
						return Err(Error::wfeof(ERRCTX_DECODER));
					}
					if let Some(ch) = self.nlnorm.flush() {
						self.pending.push_back(ch);
						continue;
					}
					match self.lexer.lex(StepInput::EndOfData)? {
						Lexed::Token(ev) => return Ok(ev),
						_ => continue,
					}
				}
				None => {
					return match self.lexer.lex(StepInput::EndOfBuffer)? {
						Lexed::Token(ev) => Ok(ev),
						_ => Ok(Event::EndOfBuffer),
					};
				}
			}
		}
	}

	fn drive_lexer_char(&mut self, ch: char) -> Result<Option<Event>> {
		if self.at_start {
			self.at_start = false;
			// a byte order mark which survived decoding is not document
			// content
			if ch == '\u{feff}' {
				return Ok(None);
			}
		}
		match self.lexer.lex(StepInput::Char(ch))? {
			Lexed::Proceed => Ok(None),
			Lexed::Token(ev) => Ok(Some(ev)),
			Lexed::SwitchEncoding(label) => {
				self.switch_encoding(&label)?;
				Ok(None)
			}
			Lexed::ResolveEntity(name) => {
				let replacement = match self.entity_resolver.as_mut() {
					Some(resolver) => resolver(&name),
					None => None,
				};
				match replacement {
					Some(text) => {
						self.lexer.resolve_entity(&text)?;
						Ok(None)
					}
					None => Err(Error::UnknownEntity(name)),
				}
			}
		}
	}

	/// Collect up to four bytes and run encoding detection over them.
	///
	/// Returns false if not enough bytes are buffered yet (and the end of
	/// data has not been signalled).
	fn autodetect(&mut self) -> Result<bool> {
		while self.sniff.len() < 4 {
			match self.buffer.pop_byte() {
				Some(b) => self.sniff.push(b),
				None => break,
			}
		}
		if self.sniff.len() < 4 {
			if self.buffer.eof_pushed() {
				return Err(Error::TooFew);
			}
			return Ok(false);
		}
		let mut prefix = [0u8; 4];
		prefix.copy_from_slice(&self.sniff[..]);
		let (encoding, bom_len) = detect_encoding(&prefix);
		self.encoding = Some(encoding);
		self.decoder = Some(encoding.new_decoder());
		for b in self.sniff.drain(..).skip(bom_len) {
			self.replay.push_back(b);
		}
		Ok(true)
	}

	/// Honour an encoding declaration by hot-swapping the decoder.
	///
	/// The new decoder takes over from the next raw byte; codepoints which
	/// have already been decoded are never re-interpreted. A declaration
	/// which stays within the family of the active encoding (e.g.
	/// `utf-16` while decoding UTF-16BE as established by the byte order
	/// mark) is a no-op.
	fn switch_encoding(&mut self, label: &str) -> Result<()> {
		match Encoding::from_label(label) {
			Some(declared) => {
				if let Some(current) = self.encoding {
					if current == declared || current.family() == declared.family() {
						return Ok(());
					}
				}
				self.encoding = Some(declared);
				self.decoder = Some(declared.new_decoder());
				Ok(())
			}
			None => {
				let handler = match self.encoding_handler.as_mut() {
					Some(handler) => handler,
					None => return Err(Error::UnknownEncoding(label.to_string())),
				};
				match handler(label) {
					Some(decoder) => {
						self.decoder = Some(decoder);
						self.encoding = None;
						Ok(())
					}
					None => Err(Error::UnknownEncoding(label.to_string())),
				}
			}
		}
	}

	/// Restart on a fresh document.
	///
	/// The configured encoding and the installed callbacks are kept;
	/// buffered input and all parse state are discarded.
	pub fn reset(&mut self) {
		self.lexer = Lexer::with_options(self.lexer_opts);
		self.nlnorm = NewlineNormalizer::new();
		self.buffer = BufferQueue::new();
		self.decoder = self.opts_encoding.map(|e| e.new_decoder());
		self.encoding = self.opts_encoding;
		self.sniff.clear();
		self.replay.clear();
		self.pending.clear();
		self.at_start = true;
		self.finished = false;
		self.poisoned = None;
	}

	/// Return a copy of the bytes which have been fed but not consumed
	/// yet.
	///
	/// Useful for handing the remainder of a stream to another consumer
	/// after this document ended.
	pub fn rest_buffer(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.extend_from_slice(&self.sniff[..]);
		for b in self.replay.iter() {
			out.push(*b);
		}
		out.extend_from_slice(&self.buffer.remaining()[..]);
		out
	}
}

impl fmt::Debug for Parser {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Parser")
			.field("lexer", &self.lexer)
			.field("encoding", &self.encoding)
			.field("buffered", &self.buffer.len())
			.field("finished", &self.finished)
			.finish()
	}
}

/// Parse a bare internal subset from a complete UTF-8 string.
///
/// Drives the internal-subset machine directly, with the end of input
/// already signalled, and returns the resulting [`Event::Doctype`]. The
/// synthetic doctype has no name and no external identifier; only
/// `internal_subset` is populated.
pub fn parse_dtd(data: &str) -> Result<Event> {
	let mut lexer = Lexer::for_internal_subset(LexerOptions::default());
	let mut nlnorm = NewlineNormalizer::new();
	let mut pending: VecDeque<char> = VecDeque::new();
	for cp in data.chars() {
		match nlnorm.feed(cp) {
			Norm::Empty => (),
			Norm::One(a) => pending.push_back(a),
			Norm::Two(a, b) => {
				pending.push_back(a);
				pending.push_back(b);
			}
		}
		while let Some(ch) = pending.pop_front() {
			match lexer.lex(StepInput::Char(ch))? {
				Lexed::Proceed => (),
				Lexed::ResolveEntity(name) => return Err(Error::UnknownEntity(name)),
				Lexed::Token(ev) => panic!("unexpected event in internal subset: {:?}", ev),
				Lexed::SwitchEncoding(_) => panic!("encoding switch in internal subset"),
			}
		}
	}
	if let Some(ch) = nlnorm.flush() {
		match lexer.lex(StepInput::Char(ch))? {
			Lexed::Proceed => (),
			other => panic!("unexpected lexer output: {:?}", other),
		}
	}
	match lexer.lex(StepInput::EndOfData)? {
		Lexed::Token(ev) => Ok(ev),
		other => panic!("unexpected lexer output: {:?}", other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dtd::{AttType, ContentSpec, DefaultDecl, IntSubset};

	fn drain(p: &mut Parser) -> Result<Vec<Event>> {
		let mut out = Vec::new();
		loop {
			match p.read()? {
				Event::EndOfData => {
					out.push(Event::EndOfData);
					return Ok(out);
				}
				Event::EndOfBuffer => return Ok(out),
				ev => out.push(ev),
			}
		}
	}

	#[test]
	fn parses_a_simple_document_in_one_chunk() {
		let mut p = Parser::new();
		p.feed(&b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><r a=\"1\" b='2'/>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert_eq!(evs.len(), 2);
		match &evs[0] {
			Event::EmptyElement(name, attrs) => {
				assert_eq!(name, "r");
				assert_eq!(attrs.len(), 2);
				assert_eq!(attrs[0].0, "a");
				assert_eq!(attrs[0].1, "1");
				assert_eq!(attrs[1].0, "b");
				assert_eq!(attrs[1].1, "2");
			}
			other => panic!("unexpected event: {:?}", other),
		}
		assert_eq!(evs[1], Event::EndOfData);
	}

	#[test]
	fn returns_end_of_buffer_when_starved() {
		let mut p = Parser::new();
		p.feed(&b"<a"[..]);
		assert_eq!(p.read().unwrap(), Event::EndOfBuffer);
		// still suspended at the same place
		assert_eq!(p.read().unwrap(), Event::EndOfBuffer);
		p.feed(&b">hi</a>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		match &evs[0] {
			Event::StartElement(name, attrs) => {
				assert_eq!(name, "a");
				assert_eq!(attrs.len(), 0);
			}
			other => panic!("unexpected event: {:?}", other),
		}
		assert!(matches!(&evs[1], Event::Text(t) if t == "hi"));
		assert!(matches!(&evs[2], Event::EndElement(name) if name == "a"));
		assert_eq!(evs[3], Event::EndOfData);
	}

	#[test]
	fn parse_combines_feed_and_read() {
		let mut p = Parser::new();
		assert_eq!(p.parse(Some(b"<a"), false).unwrap(), Event::EndOfBuffer);
		match p.parse(Some(b">hi</a>"), true).unwrap() {
			Event::StartElement(name, _) => assert_eq!(name, "a"),
			other => panic!("unexpected event: {:?}", other),
		}
		assert!(matches!(p.parse(None, false).unwrap(), Event::Text(t) if t == "hi"));
		assert!(matches!(p.parse(None, false).unwrap(), Event::EndElement(_)));
		assert_eq!(p.parse(None, false).unwrap(), Event::EndOfData);
		assert_eq!(p.parse(None, false).unwrap_err(), Error::Finished);
	}

	#[test]
	fn chunking_does_not_change_the_event_stream() {
		let doc = b"<?xml version='1.0'?>\n<root a=\"foo\"><child>text&amp;more</child><!--c--><![CDATA[<raw>]]></root>\n";
		let mut reference = Parser::new();
		reference.feed(&doc[..]);
		reference.feed_eof();
		let expected = drain(&mut reference).unwrap();

		for chunk_size in 1..8usize {
			let mut p = Parser::new();
			let mut out = Vec::new();
			for chunk in doc.chunks(chunk_size) {
				p.feed(Bytes::copy_from_slice(chunk));
				loop {
					match p.read().unwrap() {
						Event::EndOfBuffer => break,
						ev => out.push(ev),
					}
				}
			}
			p.feed_eof();
			loop {
				match p.read().unwrap() {
					Event::EndOfData => {
						out.push(Event::EndOfData);
						break;
					}
					ev => out.push(ev),
				}
			}
			// partial text events are a documented artifact of chunked
			// feeding; coalesce adjacent text before comparing
			let mut coalesced: Vec<Event> = Vec::new();
			for ev in out {
				match (coalesced.last_mut(), ev) {
					(Some(Event::Text(prev)), Event::Text(next)) => {
						let mut s = String::from(std::mem::replace(
							prev,
							crate::strings::CData::try_from("").unwrap(),
						));
						s.push_str(next.as_str());
						*prev = crate::strings::CData::try_from(s).unwrap();
					}
					(Some(Event::Cdata(prev)), Event::Cdata(next)) => {
						let mut s = String::from(std::mem::replace(
							prev,
							crate::strings::CData::try_from("").unwrap(),
						));
						s.push_str(next.as_str());
						*prev = crate::strings::CData::try_from(s).unwrap();
					}
					(Some(Event::Whitespace(prev)), Event::Whitespace(next)) => {
						let mut s = String::from(std::mem::replace(
							prev,
							crate::strings::CData::try_from("").unwrap(),
						));
						s.push_str(next.as_str());
						*prev = crate::strings::CData::try_from(s).unwrap();
					}
					(_, ev) => coalesced.push(ev),
				}
			}
			assert_eq!(coalesced, expected, "chunk size {}", chunk_size);
		}
	}

	#[test]
	fn newlines_are_normalized_everywhere() {
		let mut p = Parser::new();
		p.feed(&b"<a>\r\nhi\r</a>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[1], Event::Text(t) if t == "\nhi\n"));
	}

	#[test]
	fn entity_resolver_is_consulted_for_unknown_entities() {
		let mut p = Parser::new();
		p.set_entity_resolver(Box::new(|name| {
			if name == "version" {
				Some("1.0".to_string())
			} else {
				None
			}
		}));
		p.feed(&b"<a>v&version;</a>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[1], Event::Text(t) if t == "v1.0"));
	}

	#[test]
	fn unknown_entity_without_resolver_is_fatal() {
		let mut p = Parser::new();
		p.feed(&b"<a>&nope;</a>"[..]);
		p.feed_eof();
		let mut result = Ok(Event::EndOfBuffer);
		loop {
			result = p.read();
			if result.is_err() {
				break;
			}
		}
		match result {
			Err(Error::UnknownEntity(name)) => assert_eq!(name, "nope"),
			other => panic!("unexpected result: {:?}", other),
		}
		// the parser is poisoned afterwards
		assert!(p.read().is_err());
	}

	#[test]
	fn doctype_events_carry_the_internal_subset() {
		let mut p = Parser::new();
		p.feed(
			&b"<!DOCTYPE x [<!ELEMENT p (#PCDATA|q)*><!ATTLIST p id ID #REQUIRED>]><x/>"[..],
		);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		match &evs[0] {
			Event::Doctype(dtd) => {
				assert_eq!(dtd.name.as_ref().unwrap(), "x");
				assert_eq!(dtd.internal_subset.len(), 2);
				match &dtd.internal_subset[0] {
					IntSubset::Element(name, ContentSpec::Mixed(names)) => {
						assert_eq!(name, "p");
						assert_eq!(names.len(), 1);
						assert_eq!(names[0], "q");
					}
					other => panic!("unexpected declaration: {:?}", other),
				}
				match &dtd.internal_subset[1] {
					IntSubset::AttList(name, defs) => {
						assert_eq!(name, "p");
						assert_eq!(defs.len(), 1);
						assert_eq!(defs[0].name, "id");
						assert_eq!(defs[0].atttype, AttType::Id);
						assert_eq!(defs[0].default, DefaultDecl::Required);
					}
					other => panic!("unexpected declaration: {:?}", other),
				}
			}
			other => panic!("unexpected event: {:?}", other),
		}
		assert!(matches!(&evs[1], Event::EmptyElement(name, _) if name == "x"));
		assert_eq!(evs[2], Event::EndOfData);
	}

	#[test]
	fn autodetects_utf16be_without_bom() {
		let doc: Vec<u8> = "<?xml version=\"1.0\" encoding=\"utf-16\"?><a/>"
			.encode_utf16()
			.flat_map(|unit| unit.to_be_bytes())
			.collect();
		let mut p = Parser::new();
		p.feed(doc);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[0], Event::EmptyElement(name, _) if name == "a"));
		assert_eq!(p.encoding(), Some(Encoding::Utf16Be));
	}

	#[test]
	fn autodetects_utf16le_by_bom() {
		let mut doc: Vec<u8> = vec![0xff, 0xfe];
		doc.extend("<a>x</a>".encode_utf16().flat_map(|unit| unit.to_le_bytes()));
		let mut p = Parser::new();
		p.feed(doc);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[0], Event::StartElement(name, _) if name == "a"));
		assert!(matches!(&evs[1], Event::Text(t) if t == "x"));
		assert_eq!(p.encoding(), Some(Encoding::Utf16Le));
	}

	#[test]
	fn strips_utf8_bom() {
		let mut p = Parser::new();
		p.feed(&b"\xef\xbb\xbf<a/>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[0], Event::EmptyElement(name, _) if name == "a"));
	}

	#[test]
	fn switches_to_latin1_on_declaration() {
		let mut p = Parser::new();
		// 0xe4 is ä in ISO 8859-1 and invalid alone in UTF-8
		let mut doc = b"<?xml version='1.0' encoding='ISO-8859-1'?><a>".to_vec();
		doc.push(0xe4);
		doc.extend_from_slice(b"</a>");
		p.feed(doc);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[1], Event::Text(t) if t == "ä"));
		assert_eq!(p.encoding(), Some(Encoding::Latin1));
	}

	#[test]
	fn unknown_encoding_without_handler_is_fatal() {
		let mut p = Parser::new();
		p.feed(&b"<?xml version='1.0' encoding='EBCDIC'?><a/>"[..]);
		p.feed_eof();
		match p.read() {
			Err(Error::UnknownEncoding(label)) => assert_eq!(label, "EBCDIC"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn encoding_handler_provides_custom_decoders() {
		use crate::decode::Latin1Decoder;
		let mut p = Parser::new();
		p.set_encoding_handler(Box::new(|label| {
			if label == "x-user" {
				Some(Box::new(Latin1Decoder()) as Box<dyn ByteDecoder>)
			} else {
				None
			}
		}));
		let mut doc = b"<?xml version='1.0' encoding='x-user'?><a>".to_vec();
		doc.push(0xe4);
		doc.extend_from_slice(b"</a>");
		p.feed(doc);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[1], Event::Text(t) if t == "ä"));
		assert_eq!(p.encoding(), None);
	}

	#[test]
	fn explicit_encoding_skips_autodetection() {
		let mut p = Parser::with_options(ParserOptions::default().encoding(Encoding::Latin1));
		let mut doc = b"<a>".to_vec();
		doc.push(0xe4);
		doc.extend_from_slice(b"</a>");
		p.feed(doc);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[1], Event::Text(t) if t == "ä"));
	}

	#[test]
	fn too_few_bytes_for_autodetection() {
		let mut p = Parser::new();
		p.feed(&b"<a"[..]);
		assert_eq!(p.read().unwrap(), Event::EndOfBuffer);
		p.feed_eof();
		assert_eq!(p.read().unwrap_err(), Error::TooFew);
	}

	#[test]
	fn mid_codepoint_suspension_is_lossless() {
		let doc = "<a>ä🎉</a>".as_bytes();
		let mut p = Parser::new();
		let mut out = Vec::new();
		for b in doc.iter() {
			p.feed(Bytes::copy_from_slice(&[*b]));
			loop {
				match p.read().unwrap() {
					Event::EndOfBuffer => break,
					ev => out.push(ev),
				}
			}
		}
		p.feed_eof();
		loop {
			match p.read().unwrap() {
				Event::EndOfData => break,
				ev => out.push(ev),
			}
		}
		let text: String = out
			.iter()
			.filter_map(|ev| match ev {
				Event::Text(t) => Some(t.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(text, "ä🎉");
	}

	#[test]
	fn reset_allows_reuse_for_a_new_document() {
		let mut p = Parser::new();
		p.feed(&b"<a/>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert_eq!(evs.len(), 2);
		p.reset();
		p.feed(&b"<b/>"[..]);
		p.feed_eof();
		let evs = drain(&mut p).unwrap();
		assert!(matches!(&evs[0], Event::EmptyElement(name, _) if name == "b"));
	}

	#[test]
	fn rest_buffer_returns_unconsumed_bytes() {
		let mut p = Parser::new();
		p.feed(&b"<a/>trailing"[..]);
		match p.read() {
			// 't' after the root element is an error; everything after the
			// consumed prefix stays in the buffer
			Err(_) => (),
			Ok(ev) => {
				assert!(matches!(ev, Event::EmptyElement(..)));
				let _ = p.read().unwrap_err();
			}
		}
		let rest = p.rest_buffer();
		assert!(b"trailing".ends_with(&rest[..]) || rest.len() == 0);
	}

	#[test]
	fn parse_dtd_returns_a_synthetic_doctype() {
		let ev = parse_dtd("<!ELEMENT p (#PCDATA)>\n<!ATTLIST p id ID #IMPLIED>").unwrap();
		match ev {
			Event::Doctype(dtd) => {
				assert_eq!(dtd.name, None);
				assert_eq!(dtd.external_id, None);
				assert_eq!(dtd.internal_subset.len(), 2);
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[test]
	fn parse_dtd_rejects_malformed_subsets() {
		assert!(parse_dtd("<!GARBAGE>").is_err());
		assert!(parse_dtd("]>").is_err());
	}
}
