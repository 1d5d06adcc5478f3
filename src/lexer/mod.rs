/*!
# XML 1.0 lexer

The lexer is the grammar layer of the parser: it consumes one codepoint per
step and assembles the flat sequence of [`Event`]s which make up the
document. Input codepoints arrive through [`StepInput`], which also carries
the two out-of-band conditions (buffer starvation and end of data); every
lexer state handles all three.

The lexer is resumable at codepoint granularity: when the driver delivers
[`StepInput::EndOfBuffer`], states which are in the middle of accumulating
character data flush what they have as a partial [`Event`] and every other
state simply stays put until more input arrives.
*/
use std::fmt;

mod doctype;
pub(crate) mod nlnorm;

use crate::dtd::Dtd;
use crate::error::*;
use crate::selectors::*;
use crate::strings::*;

use doctype::{DoctypeState, DtdBuilder, SubsetState};

/// A single attribute as `(name, value)` pair.
///
/// Attribute sequences preserve document order; duplicates are *not*
/// detected or removed by the parser.
pub type Attribute = (Name, CData);

/**
A single XML event

Events are emitted by the lexer after processing bits of XML. They map
closely, but not one-to-one, to the productions of the XML 1.0 grammar:
references and CDATA sections are expanded or unpacked during lexing, and
element headers arrive as one event carrying the complete attribute list.

The two pseudo events [`Event::EndOfBuffer`] and [`Event::EndOfData`] signal
the state of the input stream rather than document content.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	/// Element header, e.g. `<foo a='1'>`.
	StartElement(Name, Vec<Attribute>),

	/// Self-closing element, e.g. `<foo a='1'/>`.
	///
	/// No matching [`Event::EndElement`] is emitted.
	EmptyElement(Name, Vec<Attribute>),

	/// Element footer, e.g. `</foo>`.
	///
	/// The lexer checks that start and end tags pair up only by depth, not
	/// by name; matching the names is the consumer's job.
	EndElement(Name),

	/// A piece of character data inside the root element.
	///
	/// References are expanded. There is no guarantee as to the
	/// segmentation of text: a single consecutive run of character data may
	/// arrive as multiple `Text` events, most notably when a buffer
	/// boundary or the token length limit is hit inside the run.
	Text(CData),

	/// A run of whitespace at document level, outside the root element.
	Whitespace(CData),

	/// The contents of a `<![CDATA[…]]>` section, not unescaped in any
	/// way.
	///
	/// Like [`Event::Text`], a single section may be split over multiple
	/// events at buffer boundaries.
	Cdata(CData),

	/// A processing instruction, e.g. `<?target data?>`.
	///
	/// Whitespace between target and data is not part of the data.
	Pi(Name, CData),

	/// A comment, e.g. `<!--data-->`.
	Comment(CData),

	/// The document type declaration with its parsed internal subset.
	Doctype(Dtd),

	/// The buffered input is exhausted, but the end of data has not been
	/// signalled; feeding more input resumes the document where it
	/// stopped.
	EndOfBuffer,

	/// The document has been consumed completely.
	EndOfData,
}

impl Event {
	pub const NAME_STARTELEMENT: &'static str = "StartElement";
	pub const NAME_EMPTYELEMENT: &'static str = "EmptyElement";
	pub const NAME_ENDELEMENT: &'static str = "EndElement";
	pub const NAME_TEXT: &'static str = "Text";
	pub const NAME_WHITESPACE: &'static str = "Whitespace";
	pub const NAME_CDATA: &'static str = "Cdata";
	pub const NAME_PI: &'static str = "Pi";
	pub const NAME_COMMENT: &'static str = "Comment";
	pub const NAME_DOCTYPE: &'static str = "Doctype";
	pub const NAME_ENDOFBUFFER: &'static str = "EndOfBuffer";
	pub const NAME_ENDOFDATA: &'static str = "EndOfData";

	/// Return a static string describing the event type.
	///
	/// This is intended for error messages.
	pub fn name(&self) -> &'static str {
		match self {
			Self::StartElement(..) => Self::NAME_STARTELEMENT,
			Self::EmptyElement(..) => Self::NAME_EMPTYELEMENT,
			Self::EndElement(..) => Self::NAME_ENDELEMENT,
			Self::Text(..) => Self::NAME_TEXT,
			Self::Whitespace(..) => Self::NAME_WHITESPACE,
			Self::Cdata(..) => Self::NAME_CDATA,
			Self::Pi(..) => Self::NAME_PI,
			Self::Comment(..) => Self::NAME_COMMENT,
			Self::Doctype(..) => Self::NAME_DOCTYPE,
			Self::EndOfBuffer => Self::NAME_ENDOFBUFFER,
			Self::EndOfData => Self::NAME_ENDOFDATA,
		}
	}
}

/// One unit of lexer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepInput {
	/// A decoded, newline-normalized codepoint.
	Char(char),
	/// The buffered input is exhausted, more may arrive later.
	EndOfBuffer,
	/// The producer has signalled the end of the input.
	EndOfData,
}

/// One unit of lexer output.
#[derive(Debug, Clone, PartialEq)]
pub enum Lexed {
	/// The input was consumed without completing an event.
	Proceed,

	/// An event was completed.
	Token(Event),

	/// The XML declaration named an encoding different from the one in the
	/// declaration's own pseudo-attributes; the driver must install the
	/// corresponding decoder before feeding any further byte.
	SwitchEncoding(String),

	/// An entity reference which is not one of the five predefined entities
	/// was read completely; the driver must resolve it and hand the
	/// replacement text to [`Lexer::resolve_entity`] before feeding any
	/// further input.
	ResolveEntity(Name),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CharRefRadix {
	Decimal,
	Hexadecimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RefKind {
	Entity,
	Char(CharRefRadix),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RefReturnState {
	Text,
	AttributeValue(ElementKind, char),
	EntityValue(char),
	AttDefault(char),
}

impl RefReturnState {
	fn to_state(self) -> State {
		match self {
			Self::Text => State::Content(ContentState::Initial),
			Self::AttributeValue(kind, delim) => State::Element {
				kind: kind,
				state: ElementState::AttributeValue(delim),
			},
			Self::EntityValue(delim) => State::Doctype(DoctypeState::entity_value(delim)),
			Self::AttDefault(delim) => State::Doctype(DoctypeState::att_default(delim)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ElementKind {
	/// standard XML element head e.g. `<foo>`
	Header,
	/// standard XML element foot e.g. `</foo>`
	Footer,
	/// XML declaration e.g. `<?xml version='1.0'?>`
	XmlDecl,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ElementState {
	/// Accumulating the element name.
	Name,
	/// Whitespace inside the tag.
	Blank,
	/// Whitespace is required before the next attribute name.
	SpaceRequired,
	/// Accumulating an attribute name.
	AttrName,
	/// After an attribute name, waiting for `=`.
	AfterAttrName,
	/// After `=`, waiting for the opening quote.
	AfterEq,
	/// Inside a quoted attribute value; carries the delimiter.
	AttributeValue(char),
	/// Encountered `?`
	MaybeXmlDeclEnd,
	/// Encountered `/`
	MaybeHeadClose,
}

/// Which enclosing construct a comment or processing instruction belongs
/// to; decides where its completion is delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MarkupCtx {
	Document,
	Content,
	Subset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MarkupState {
	/// Just after `<`.
	Start,
	/// Just after `<!`.
	Bang,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ContentState {
	Initial,
	/// `]]>` detection; carries the number of `]` read so far (1 or 2).
	/// The sequence is illegal in character data.
	MaybeCdataEnd(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CdataState {
	/// Matching the `CDATA[` keyword after `<![`; carries the progress.
	Open(u8),
	Body,
	/// `]]>` detection; carries the number of `]` read so far (1 or 2).
	MaybeEnd(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CommentState {
	/// Just after `<!-`.
	Open,
	Body,
	/// Encountered `-`.
	Dash,
	/// Encountered `--`.
	DashDash,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PiState {
	Target,
	AfterTarget,
	Body,
	/// Encountered `?`.
	MaybeEnd,
}

/// Progress through the ordered pseudo-attributes of the XML declaration:
/// the variant names the pseudo-attribute expected *next*.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DeclSt {
	VersionName,
	EncodingName,
	StandaloneName,
	Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeclAttr {
	Version,
	Encoding,
	Standalone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
	/// Document level: the prolog and everything after the root element.
	Document,
	Markup {
		ctx: MarkupCtx,
		state: MarkupState,
	},
	/// Character data inside the root element.
	Content(ContentState),
	CdataSection(CdataState),
	Comment(CommentState, MarkupCtx),
	Pi(PiState, MarkupCtx),
	Element {
		kind: ElementKind,
		state: ElementState,
	},
	/// Encountered `&`.
	Reference {
		ctx: &'static str,
		ret: RefReturnState,
		kind: RefKind,
	},
	Doctype(DoctypeState),
	Eof,
}

/// Result of one dispatch of a single codepoint.
enum Step {
	/// The codepoint was consumed.
	Done(Lexed),
	/// The codepoint must be re-dispatched against the (changed) state.
	Again,
}

const CDATA_KEYWORD: &'static [u8] = b"CDATA[";

// longest sensible decimal character reference is 7 digits
// (0x10ffff = 1114111), longest hexadecimal one is 6
const MAX_CHARREF_DIGITS: usize = 7;

// the declaration keywords are short; anything longer cannot match
const MAX_KEYWORD_LENGTH: usize = 16;

/// Hold options to configure a [`Lexer`].
///
/// See also [`Lexer::with_options()`].
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct LexerOptions {
	/// Maximum number of bytes which can form a token.
	///
	/// This exists to limit the memory use of the Lexer for tokens where
	/// the data needs to be buffered in memory (most notably
	/// [`Event::Text`], [`Event::Cdata`] and attribute values).
	///
	/// If token data exceeds this limit, it depends on the token type
	/// whether a partial event is emitted or the lexing fails with
	/// [`Error::LimitExceeded`]: text, whitespace and CDATA events are
	/// split and emitted in parts (and lexing continues), all other tokens
	/// exceeding this limit cause an error. The limit also bounds the text
	/// inlined for a single entity reference by the entity resolver.
	pub max_token_length: usize,
}

impl LexerOptions {
	/// Set the [`LexerOptions::max_token_length`] value.
	pub fn max_token_length(mut self, v: usize) -> LexerOptions {
		self.max_token_length = v;
		self
	}
}

impl Default for LexerOptions {
	/// Constructs default lexer options.
	///
	/// The defaults are implementation-defined and should not be relied
	/// upon.
	fn default() -> Self {
		Self {
			max_token_length: 65535,
		}
	}
}

fn resolve_named_entity(name: &str) -> Option<char> {
	// amp, lt, gt, apos, quot
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"apos" => Some('\''),
		"quot" => Some('"'),
		_ => None,
	}
}

fn resolve_char_reference(s: &str, radix: CharRefRadix, ctx: &'static str) -> Result<char> {
	let radix = match radix {
		CharRefRadix::Decimal => 10,
		CharRefRadix::Hexadecimal => 16,
	};
	// cannot fail because the string is validated against the alphabet and
	// limited in length by the lexer
	let codepoint = u32::from_str_radix(s, radix).unwrap();
	match std::char::from_u32(codepoint) {
		Some(ch) if is_xml_char(ch) => Ok(ch),
		_ => Err(Error::NotWellFormed(WFError::InvalidChar(
			ctx, codepoint, true,
		))),
	}
}

/**
# Incremental XML 1.0 lexer

The lexer is fed [`StepInput`]s by a driver (usually
[`Parser`](crate::Parser)) and reacts with [`Lexed`] outputs. It holds the
complete grammar state of the document between steps, which makes it
suspendable at every single codepoint.
*/
pub struct Lexer {
	state: State,
	scratchpad: String,
	swap: String,
	opts: LexerOptions,
	err: Option<Error>,
	/// element nesting depth; zero means document level. This is a plain
	/// counter, tag names are not matched against each other.
	depth: usize,
	seen_root: bool,
	xmldecl_allowed: bool,
	head_name: Option<Name>,
	attrs: Vec<Attribute>,
	attr_name: Option<Name>,
	decl_next: DeclSt,
	decl_attr: Option<DeclAttr>,
	decl_encoding: Option<String>,
	pi_target: Option<Name>,
	dtd: Option<Box<DtdBuilder>>,
	seen_doctype: bool,
}

impl Lexer {
	/// Construct a new Lexer based on [`LexerOptions::default()`].
	pub fn new() -> Self {
		Self::with_options(LexerOptions::default())
	}

	/// Construct a new Lexer with the given options.
	pub fn with_options(opts: LexerOptions) -> Self {
		Self {
			state: State::Document,
			scratchpad: String::new(),
			swap: String::new(),
			opts: opts,
			err: None,
			depth: 0,
			seen_root: false,
			xmldecl_allowed: true,
			head_name: None,
			attrs: Vec::new(),
			attr_name: None,
			decl_next: DeclSt::VersionName,
			decl_attr: None,
			decl_encoding: None,
			pi_target: None,
			dtd: None,
			seen_doctype: false,
		}
	}

	/// Construct a lexer which processes a bare internal subset instead of
	/// a document.
	///
	/// The lexer starts out inside the brackets of a document type
	/// declaration and emits a single synthetic [`Event::Doctype`] (without
	/// name or external identifier) when the end of data is reached. Used
	/// by [`parse_dtd`](crate::parse_dtd).
	pub fn for_internal_subset(opts: LexerOptions) -> Self {
		let mut lexer = Self::with_options(opts);
		lexer.state = State::Doctype(DoctypeState::Subset(SubsetState::Initial));
		lexer.xmldecl_allowed = false;
		lexer.dtd = Some(Box::new(DtdBuilder::new_subset_only()));
		lexer
	}

	fn prep_scratchpad(&mut self) {
		if self.scratchpad.capacity() < self.opts.max_token_length {
			self.scratchpad
				.reserve(self.opts.max_token_length - self.scratchpad.capacity());
		}
	}

	fn drop_scratchpad(&mut self) {
		self.scratchpad.clear();
	}

	fn swap_scratchpad(&mut self) {
		std::mem::swap(&mut self.scratchpad, &mut self.swap);
	}

	fn flush_scratchpad(&mut self) -> String {
		let result = self.scratchpad.split_off(0);
		debug_assert!(self.scratchpad.len() == 0);
		result
	}

	fn flush_scratchpad_as_name(&mut self) -> Name {
		let result = self.flush_scratchpad();
		#[cfg(debug_assertions)]
		{
			use std::convert::TryInto;
			return result
				.try_into()
				.expect("scratchpad contents must have been validated as a name");
		}
		#[cfg(not(debug_assertions))]
		unsafe {
			Name::from_string_unchecked(result)
		}
	}

	fn flush_scratchpad_as_cdata(&mut self) -> CData {
		let result = self.flush_scratchpad();
		#[cfg(debug_assertions)]
		{
			use std::convert::TryInto;
			return result
				.try_into()
				.expect("scratchpad contents must have been validated as cdata");
		}
		#[cfg(not(debug_assertions))]
		unsafe {
			CData::from_string_unchecked(result)
		}
	}

	fn maybe_flush_scratchpad_as_text(&mut self) -> Option<Event> {
		if self.scratchpad.len() == 0 {
			None
		} else {
			Some(Event::Text(self.flush_scratchpad_as_cdata()))
		}
	}

	fn maybe_flush_scratchpad_as_whitespace(&mut self) -> Option<Event> {
		if self.scratchpad.len() == 0 {
			None
		} else {
			Some(Event::Whitespace(self.flush_scratchpad_as_cdata()))
		}
	}

	fn maybe_flush_scratchpad_as_cdata_section(&mut self) -> Option<Event> {
		if self.scratchpad.len() == 0 {
			None
		} else {
			Some(Event::Cdata(self.flush_scratchpad_as_cdata()))
		}
	}

	fn check_accumulator_length(&self) -> Result<()> {
		if self.scratchpad.len() >= self.opts.max_token_length {
			Err(Error::LimitExceeded("maximum token length exceeded"))
		} else {
			Ok(())
		}
	}

	fn dtd_mut(&mut self) -> &mut DtdBuilder {
		self.dtd
			.as_deref_mut()
			.expect("doctype builder must exist while in doctype states")
	}

	/// Process one unit of input.
	///
	/// The first error is cached and returned for any further invocation.
	pub fn lex(&mut self, input: StepInput) -> Result<Lexed> {
		if let Some(e) = self.err.as_ref() {
			return Err(e.clone());
		}
		let result = match input {
			StepInput::Char(ch) => self.lex_char(ch),
			StepInput::EndOfBuffer => self.lex_eob(),
			StepInput::EndOfData => self.lex_eod(),
		};
		if let Err(e) = result.as_ref() {
			self.err = Some(e.clone());
		}
		result
	}

	/// Hand the replacement text for an entity reference to the lexer.
	///
	/// Must be called (and may only be called) after the lexer returned
	/// [`Lexed::ResolveEntity`] and before any further input is fed. The
	/// text is inlined verbatim into the surrounding accumulator; it is
	/// *not* lexed again.
	pub fn resolve_entity(&mut self, replacement: &str) -> Result<()> {
		let ret = match self.state {
			State::Reference { ret, .. } => ret,
			_ => panic!("resolve_entity called outside of a reference"),
		};
		self.swap_scratchpad();
		if self
			.scratchpad
			.len()
			.saturating_add(replacement.len())
			> self.opts.max_token_length
		{
			let e = Error::LimitExceeded("entity expansion exceeds maximum token length");
			self.err = Some(e.clone());
			return Err(e);
		}
		self.scratchpad.push_str(replacement);
		self.state = ret.to_state();
		Ok(())
	}

	fn lex_char(&mut self, ch: char) -> Result<Lexed> {
		loop {
			let step = match self.state {
				State::Document => self.lex_document(ch)?,
				State::Markup { ctx, state } => self.lex_markup(ctx, state, ch)?,
				State::Content(substate) => self.lex_content(substate, ch)?,
				State::CdataSection(substate) => self.lex_cdata_section(substate, ch)?,
				State::Comment(substate, ctx) => self.lex_comment(substate, ctx, ch)?,
				State::Pi(substate, ctx) => self.lex_pi(substate, ctx, ch)?,
				State::Element {
					kind,
					state: substate,
				} => self.lex_element(kind, substate, ch)?,
				State::Reference { ctx, ret, kind } => self.lex_reference(ctx, ret, kind, ch)?,
				State::Doctype(substate) => self.lex_doctype(substate, ch)?,
				State::Eof => {
					return Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_DOCUMENT,
						ch,
						None,
					)))
				}
			};
			match step {
				Step::Done(lexed) => return Ok(lexed),
				Step::Again => (),
			}
		}
	}

	fn lex_document(&mut self, ch: char) -> Result<Step> {
		if is_space(ch) {
			self.xmldecl_allowed = false;
			self.prep_scratchpad();
			self.scratchpad.push(ch);
			if self.scratchpad.len() >= self.opts.max_token_length {
				let tok = self.maybe_flush_scratchpad_as_whitespace().unwrap();
				return Ok(Step::Done(Lexed::Token(tok)));
			}
			return Ok(Step::Done(Lexed::Proceed));
		}
		match ch {
			'<' => {
				let tok = self.maybe_flush_scratchpad_as_whitespace();
				self.state = State::Markup {
					ctx: MarkupCtx::Document,
					state: MarkupState::Start,
				};
				Ok(Step::Done(match tok {
					Some(tok) => Lexed::Token(tok),
					None => Lexed::Proceed,
				}))
			}
			other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_DOCUMENT,
				other,
				Some(&["whitespace", "<"]),
			))),
		}
	}

	fn lex_markup(&mut self, ctx: MarkupCtx, state: MarkupState, ch: char) -> Result<Step> {
		match state {
			MarkupState::Start => match ch {
				'?' => {
					// the xmldecl_allowed flag stays valid for exactly this
					// path; the target check decides
					self.state = State::Pi(PiState::Target, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				'!' => {
					self.xmldecl_allowed = false;
					self.state = State::Markup {
						ctx: ctx,
						state: MarkupState::Bang,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				'/' => {
					self.xmldecl_allowed = false;
					match ctx {
						MarkupCtx::Content => {
							self.state = State::Element {
								kind: ElementKind::Footer,
								state: ElementState::Name,
							};
							Ok(Step::Done(Lexed::Proceed))
						}
						_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"end tag outside of the root element",
						))),
					}
				}
				ch if is_name_start_char(ch) => {
					self.xmldecl_allowed = false;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Element {
						kind: ElementKind::Header,
						state: ElementState::Name,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_NAMESTART,
					other,
					None,
				))),
			},
			MarkupState::Bang => match ch {
				'-' => {
					self.state = State::Comment(CommentState::Open, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				'[' => match ctx {
					MarkupCtx::Content => {
						self.drop_scratchpad();
						self.state = State::CdataSection(CdataState::Open(0));
						Ok(Step::Done(Lexed::Proceed))
					}
					_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"CDATA section not allowed at document level",
					))),
				},
				ch if ch.is_ascii_alphabetic() => match ctx {
					MarkupCtx::Document => {
						self.drop_scratchpad();
						self.scratchpad.push(ch);
						self.state = State::Doctype(DoctypeState::Keyword);
						Ok(Step::Done(Lexed::Proceed))
					}
					_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"markup declarations are not allowed in content",
					))),
				},
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT,
					other,
					Some(&["-", "[", "keyword"]),
				))),
			},
		}
	}

	fn lex_content(&mut self, state: ContentState, ch: char) -> Result<Step> {
		match state {
			ContentState::Initial => match ch {
				'<' => {
					let tok = self.maybe_flush_scratchpad_as_text();
					self.state = State::Markup {
						ctx: MarkupCtx::Content,
						state: MarkupState::Start,
					};
					Ok(Step::Done(match tok {
						Some(tok) => Lexed::Token(tok),
						None => Lexed::Proceed,
					}))
				}
				'&' => {
					// swap the scratchpad so the reference can accumulate in
					// a clean buffer; the expansion returns to the text run,
					// keeping it a single event where possible
					self.swap_scratchpad();
					self.state = State::Reference {
						ctx: ERRCTX_TEXT,
						ret: RefReturnState::Text,
						kind: RefKind::Entity,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				']' => {
					// begin of the forbidden CDATA section end sequence
					// (XML 1.0 § 2.4 [14]); no flush to avoid needless
					// reallocations on false alarm
					self.state = State::Content(ContentState::MaybeCdataEnd(1));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_TEXT,
					ch as u32,
					false,
				))),
				ch => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					if self.scratchpad.len() >= self.opts.max_token_length {
						let tok = self.maybe_flush_scratchpad_as_text().unwrap();
						Ok(Step::Done(Lexed::Token(tok)))
					} else {
						Ok(Step::Done(Lexed::Proceed))
					}
				}
			},
			ContentState::MaybeCdataEnd(nend) => match (nend, ch) {
				(1, ']') => {
					self.state = State::Content(ContentState::MaybeCdataEnd(2));
					Ok(Step::Done(Lexed::Proceed))
				}
				(2, '>') => Err(Error::NotWellFormed(WFError::InvalidSyntax(
					"']]>' is not allowed in text",
				))),
				(2, ']') => {
					// this could just be a `]]]]]]>` sequence; the leftmost
					// `]` is plain text, the last two may still be the
					// forbidden delimiter
					self.prep_scratchpad();
					self.scratchpad.push(']');
					Ok(Step::Done(Lexed::Proceed))
				}
				(n, _) => {
					self.prep_scratchpad();
					for _ in 0..n {
						self.scratchpad.push(']');
					}
					self.state = State::Content(ContentState::Initial);
					Ok(Step::Again)
				}
			},
		}
	}

	fn lex_cdata_section(&mut self, state: CdataState, ch: char) -> Result<Step> {
		match state {
			CdataState::Open(i) => {
				let i = i as usize;
				debug_assert!(i < CDATA_KEYWORD.len());
				if ch == CDATA_KEYWORD[i] as char {
					if i + 1 == CDATA_KEYWORD.len() {
						self.state = State::CdataSection(CdataState::Body);
					} else {
						self.state = State::CdataSection(CdataState::Open(i as u8 + 1));
					}
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"malformed CDATA section start",
					)))
				}
			}
			CdataState::Body => match ch {
				']' => {
					self.state = State::CdataSection(CdataState::MaybeEnd(1));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_CDATA_SECTION,
					ch as u32,
					false,
				))),
				ch => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					if self.scratchpad.len() >= self.opts.max_token_length {
						let tok = self.maybe_flush_scratchpad_as_cdata_section().unwrap();
						Ok(Step::Done(Lexed::Token(tok)))
					} else {
						Ok(Step::Done(Lexed::Proceed))
					}
				}
			},
			CdataState::MaybeEnd(nend) => match (nend, ch) {
				(1, ']') => {
					self.state = State::CdataSection(CdataState::MaybeEnd(2));
					Ok(Step::Done(Lexed::Proceed))
				}
				(2, '>') => {
					// the section is complete; an empty section still emits
					// an (empty) event to mark its presence
					let data = self.flush_scratchpad_as_cdata();
					self.state = State::Content(ContentState::Initial);
					Ok(Step::Done(Lexed::Token(Event::Cdata(data))))
				}
				(2, ']') => {
					self.prep_scratchpad();
					self.scratchpad.push(']');
					Ok(Step::Done(Lexed::Proceed))
				}
				(n, _) => {
					self.prep_scratchpad();
					for _ in 0..n {
						self.scratchpad.push(']');
					}
					self.state = State::CdataSection(CdataState::Body);
					Ok(Step::Again)
				}
			},
		}
	}

	fn finish_comment(&mut self, ctx: MarkupCtx) -> Result<Lexed> {
		let data = self.flush_scratchpad_as_cdata();
		match ctx {
			MarkupCtx::Document => {
				self.state = State::Document;
				Ok(Lexed::Token(Event::Comment(data)))
			}
			MarkupCtx::Content => {
				self.state = State::Content(ContentState::Initial);
				Ok(Lexed::Token(Event::Comment(data)))
			}
			MarkupCtx::Subset => {
				self.push_subset_comment(data);
				Ok(Lexed::Proceed)
			}
		}
	}

	fn lex_comment(&mut self, state: CommentState, ctx: MarkupCtx, ch: char) -> Result<Step> {
		match state {
			CommentState::Open => match ch {
				'-' => {
					self.state = State::Comment(CommentState::Body, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
					"malformed comment start",
				))),
			},
			CommentState::Body => match ch {
				'-' => {
					self.state = State::Comment(CommentState::Dash, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_COMMENT,
					ch as u32,
					false,
				))),
				ch => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
			},
			CommentState::Dash => match ch {
				'-' => {
					self.state = State::Comment(CommentState::DashDash, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push('-');
					self.state = State::Comment(CommentState::Body, ctx);
					Ok(Step::Again)
				}
			},
			CommentState::DashDash => match ch {
				'>' => Ok(Step::Done(self.finish_comment(ctx)?)),
				_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
					"'--' is not allowed in comment",
				))),
			},
		}
	}

	fn finish_pi(&mut self, ctx: MarkupCtx) -> Result<Lexed> {
		let target = self
			.pi_target
			.take()
			.expect("processing instruction target must have been read");
		let data = self.flush_scratchpad_as_cdata();
		match ctx {
			MarkupCtx::Document => {
				self.state = State::Document;
				Ok(Lexed::Token(Event::Pi(target, data)))
			}
			MarkupCtx::Content => {
				self.state = State::Content(ContentState::Initial);
				Ok(Lexed::Token(Event::Pi(target, data)))
			}
			MarkupCtx::Subset => {
				self.push_subset_pi(target, data);
				Ok(Lexed::Proceed)
			}
		}
	}

	fn lex_pi(&mut self, state: PiState, ctx: MarkupCtx, ch: char) -> Result<Step> {
		match state {
			PiState::Target => {
				if self.scratchpad.len() == 0 {
					return if is_name_start_char(ch) {
						self.prep_scratchpad();
						self.scratchpad.push(ch);
						Ok(Step::Done(Lexed::Proceed))
					} else {
						Err(Error::NotWellFormed(WFError::UnexpectedChar(
							ERRCTX_PI,
							ch,
							Some(&["target name"]),
						)))
					};
				}
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				// target complete, decide whether this is the XML
				// declaration
				if self.scratchpad.eq_ignore_ascii_case("xml") {
					let is_decl = self.scratchpad == "xml"
						&& ctx == MarkupCtx::Document
						&& self.xmldecl_allowed;
					self.xmldecl_allowed = false;
					if !is_decl {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"processing instruction target 'xml' is reserved",
						)));
					}
					self.drop_scratchpad();
					self.decl_next = DeclSt::VersionName;
					self.decl_attr = None;
					self.decl_encoding = None;
					self.state = State::Element {
						kind: ElementKind::XmlDecl,
						state: ElementState::Blank,
					};
					return Ok(Step::Again);
				}
				self.xmldecl_allowed = false;
				self.pi_target = Some(self.flush_scratchpad_as_name());
				match ch {
					ch if is_space(ch) => {
						self.state = State::Pi(PiState::AfterTarget, ctx);
						Ok(Step::Done(Lexed::Proceed))
					}
					'?' => {
						self.state = State::Pi(PiState::MaybeEnd, ctx);
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_PI,
						other,
						Some(&["whitespace", "?"]),
					))),
				}
			}
			PiState::AfterTarget => {
				if is_space(ch) {
					Ok(Step::Done(Lexed::Proceed))
				} else {
					self.state = State::Pi(PiState::Body, ctx);
					Ok(Step::Again)
				}
			}
			PiState::Body => match ch {
				'?' => {
					self.state = State::Pi(PiState::MaybeEnd, ctx);
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_PI,
					ch as u32,
					false,
				))),
				ch => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
			},
			PiState::MaybeEnd => match ch {
				'>' => Ok(Step::Done(self.finish_pi(ctx)?)),
				'?' => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push('?');
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push('?');
					self.state = State::Pi(PiState::Body, ctx);
					Ok(Step::Again)
				}
			},
		}
	}

	fn content_or_document_state(&self) -> State {
		if self.depth == 0 {
			State::Document
		} else {
			State::Content(ContentState::Initial)
		}
	}

	fn finish_start_element(&mut self) -> Lexed {
		let name = self
			.head_name
			.take()
			.expect("element name must have been read");
		let attrs = std::mem::replace(&mut self.attrs, Vec::new());
		self.seen_root = true;
		self.depth += 1;
		self.state = State::Content(ContentState::Initial);
		Lexed::Token(Event::StartElement(name, attrs))
	}

	fn finish_empty_element(&mut self) -> Lexed {
		let name = self
			.head_name
			.take()
			.expect("element name must have been read");
		let attrs = std::mem::replace(&mut self.attrs, Vec::new());
		self.seen_root = true;
		self.state = self.content_or_document_state();
		Lexed::Token(Event::EmptyElement(name, attrs))
	}

	fn finish_end_element(&mut self) -> Lexed {
		let name = self
			.head_name
			.take()
			.expect("element name must have been read");
		self.depth = self.depth.saturating_sub(1);
		self.state = self.content_or_document_state();
		Lexed::Token(Event::EndElement(name))
	}

	/// Dispatch the char following a completed name or a run of whitespace
	/// inside an element header, footer or the XML declaration.
	fn lex_element_postblank(&mut self, kind: ElementKind, ch: char) -> Result<Step> {
		match ch {
			ch if is_space(ch) => {
				self.state = State::Element {
					kind: kind,
					state: ElementState::Blank,
				};
				Ok(Step::Done(Lexed::Proceed))
			}
			'>' => match kind {
				ElementKind::Header => Ok(Step::Done(self.finish_start_element())),
				ElementKind::Footer => Ok(Step::Done(self.finish_end_element())),
				ElementKind::XmlDecl => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_XML_DECL,
					'>',
					Some(&["?"]),
				))),
			},
			'/' => match kind {
				ElementKind::Header => {
					self.state = State::Element {
						kind: kind,
						state: ElementState::MaybeHeadClose,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				ElementKind::Footer => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT_FOOT,
					'/',
					None,
				))),
				ElementKind::XmlDecl => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_XML_DECL,
					'/',
					None,
				))),
			},
			'?' => match kind {
				ElementKind::XmlDecl => {
					self.state = State::Element {
						kind: kind,
						state: ElementState::MaybeXmlDeclEnd,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT,
					'?',
					None,
				))),
			},
			ch if is_name_start_char(ch) => match kind {
				ElementKind::Footer => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT_FOOT,
					ch,
					Some(&[">"]),
				))),
				_ => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Element {
						kind: kind,
						state: ElementState::AttrName,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
			},
			other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
				match kind {
					ElementKind::XmlDecl => ERRCTX_XML_DECL,
					_ => ERRCTX_ELEMENT,
				},
				other,
				Some(&["whitespace", ">", "/", "start of attribute name"]),
			))),
		}
	}

	/// Process a completed pseudo-attribute name of the XML declaration.
	fn process_decl_name(&mut self, name: &str) -> Result<()> {
		let attr = match self.decl_next {
			DeclSt::VersionName => {
				if name == "version" {
					DeclAttr::Version
				} else {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"'<?xml' must be followed by version attribute",
					)));
				}
			}
			DeclSt::EncodingName => match name {
				"encoding" => DeclAttr::Encoding,
				"standalone" => DeclAttr::Standalone,
				_ => {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"'version' attribute must be followed by '?>', 'encoding' or 'standalone'",
					)))
				}
			},
			DeclSt::StandaloneName => {
				if name == "standalone" {
					DeclAttr::Standalone
				} else {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"'encoding' attribute must be followed by '?>' or 'standalone'",
					)));
				}
			}
			DeclSt::Close => {
				return Err(Error::NotWellFormed(WFError::InvalidSyntax(
					"'standalone' attribute must be followed by '?>'",
				)))
			}
		};
		self.decl_attr = Some(attr);
		Ok(())
	}

	fn valid_encoding_label(label: &str) -> bool {
		let mut chars = label.chars();
		match chars.next() {
			Some(c) if c.is_ascii_alphabetic() => (),
			_ => return false,
		}
		chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
	}

	/// Process a completed pseudo-attribute value of the XML declaration.
	fn process_decl_value(&mut self, value: String) -> Result<()> {
		match self
			.decl_attr
			.take()
			.expect("pseudo-attribute name must have been read")
		{
			DeclAttr::Version => {
				if value != "1.0" {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"only XML version 1.0 is supported",
					)));
				}
				self.decl_next = DeclSt::EncodingName;
			}
			DeclAttr::Encoding => {
				if !Self::valid_encoding_label(&value) {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"malformed encoding name",
					)));
				}
				self.decl_encoding = Some(value);
				self.decl_next = DeclSt::StandaloneName;
			}
			DeclAttr::Standalone => {
				if value != "yes" && value != "no" {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"'standalone' must be 'yes' or 'no'",
					)));
				}
				// accepted, but not acted upon
				self.decl_next = DeclSt::Close;
			}
		}
		Ok(())
	}

	fn lex_element(&mut self, kind: ElementKind, state: ElementState, ch: char) -> Result<Step> {
		match state {
			ElementState::Name => {
				if self.scratchpad.len() == 0 {
					// the first char is special because it must match the
					// name start class
					return if is_name_start_char(ch) {
						self.prep_scratchpad();
						self.scratchpad.push(ch);
						Ok(Step::Done(Lexed::Proceed))
					} else {
						Err(Error::NotWellFormed(WFError::UnexpectedChar(
							ERRCTX_NAMESTART,
							ch,
							None,
						)))
					};
				}
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				} else {
					self.head_name = Some(self.flush_scratchpad_as_name());
					self.attrs.clear();
					self.lex_element_postblank(kind, ch)
				}
			}
			ElementState::Blank => self.lex_element_postblank(kind, ch),
			ElementState::SpaceRequired => {
				if is_space(ch) {
					self.state = State::Element {
						kind: kind,
						state: ElementState::Blank,
					};
					Ok(Step::Done(Lexed::Proceed))
				} else if is_name_start_char(ch) {
					Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"space required before attribute names",
					)))
				} else {
					self.state = State::Element {
						kind: kind,
						state: ElementState::Blank,
					};
					Ok(Step::Again)
				}
			}
			ElementState::AttrName => {
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				match kind {
					ElementKind::XmlDecl => {
						let name = self.flush_scratchpad();
						self.process_decl_name(&name)?;
					}
					_ => {
						self.attr_name = Some(self.flush_scratchpad_as_name());
					}
				}
				match ch {
					ch if is_space(ch) => {
						self.state = State::Element {
							kind: kind,
							state: ElementState::AfterAttrName,
						};
						Ok(Step::Done(Lexed::Proceed))
					}
					'=' => {
						self.state = State::Element {
							kind: kind,
							state: ElementState::AfterEq,
						};
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ELEMENT,
						other,
						Some(&["="]),
					))),
				}
			}
			ElementState::AfterAttrName => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'=' => {
					self.state = State::Element {
						kind: kind,
						state: ElementState::AfterEq,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT,
					other,
					Some(&["="]),
				))),
			},
			ElementState::AfterEq => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'"' | '\'' => {
					self.state = State::Element {
						kind: kind,
						state: ElementState::AttributeValue(ch),
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTVAL,
					other,
					Some(&["\"", "'"]),
				))),
			},
			// XML 1.0 § 2.3 [10] AttValue
			ElementState::AttributeValue(delim) => match ch {
				ch if ch == delim => {
					match kind {
						ElementKind::XmlDecl => {
							let value = self.flush_scratchpad();
							self.process_decl_value(value)?;
						}
						_ => {
							let name = self
								.attr_name
								.take()
								.expect("attribute name must have been read");
							let value = self.flush_scratchpad_as_cdata();
							self.attrs.push((name, value));
						}
					}
					// require whitespace after the value as the grammar
					// demands
					self.state = State::Element {
						kind: kind,
						state: ElementState::SpaceRequired,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				'<' => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTVAL,
					'<',
					None,
				))),
				'&' => match kind {
					ElementKind::XmlDecl => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_XML_DECL,
						'&',
						None,
					))),
					_ => {
						// swap the scratchpad to avoid clobbering the value
						// during the reference read
						self.swap_scratchpad();
						self.state = State::Reference {
							ctx: ERRCTX_ATTVAL,
							ret: RefReturnState::AttributeValue(kind, delim),
							kind: RefKind::Entity,
						};
						Ok(Step::Done(Lexed::Proceed))
					}
				},
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_ATTVAL,
					ch as u32,
					false,
				))),
				// note: raw tab and line feed are preserved as written
				ch => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
			},
			ElementState::MaybeXmlDeclEnd => match ch {
				'>' => {
					if self.decl_next == DeclSt::VersionName {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"'<?xml' must be followed by version attribute",
						)));
					}
					self.drop_scratchpad();
					self.state = State::Document;
					match self.decl_encoding.take() {
						Some(label) => Ok(Step::Done(Lexed::SwitchEncoding(label))),
						None => Ok(Step::Done(Lexed::Proceed)),
					}
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_XML_DECL_END,
					other,
					Some(&[">"]),
				))),
			},
			ElementState::MaybeHeadClose => match ch {
				'>' => Ok(Step::Done(self.finish_empty_element())),
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ELEMENT_CLOSE,
					other,
					Some(&[">"]),
				))),
			},
		}
	}

	fn lex_reference(
		&mut self,
		ctx: &'static str,
		ret: RefReturnState,
		kind: RefKind,
		ch: char,
	) -> Result<Step> {
		match kind {
			RefKind::Entity => match ch {
				'#' if self.scratchpad.len() == 0 => {
					self.state = State::Reference {
						ctx: ctx,
						ret: ret,
						kind: RefKind::Char(CharRefRadix::Decimal),
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				';' => {
					if self.scratchpad.len() == 0 {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"empty reference",
						)));
					}
					if let Some(expanded) = resolve_named_entity(&self.scratchpad) {
						self.drop_scratchpad();
						self.swap_scratchpad();
						self.prep_scratchpad();
						self.scratchpad.push(expanded);
						self.state = ret.to_state();
						Ok(Step::Done(Lexed::Proceed))
					} else {
						// the driver resolves the entity and returns the
						// replacement text through resolve_entity(); the
						// state stays at Reference until then
						let name = self.flush_scratchpad_as_name();
						Ok(Step::Done(Lexed::ResolveEntity(name)))
					}
				}
				ch if self.scratchpad.len() == 0 && is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if self.scratchpad.len() > 0 && is_name_char(ch) => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx,
					other,
					Some(&[";"]),
				))),
			},
			RefKind::Char(radix) => match ch {
				'x' if self.scratchpad.len() == 0 && radix == CharRefRadix::Decimal => {
					self.state = State::Reference {
						ctx: ctx,
						ret: ret,
						kind: RefKind::Char(CharRefRadix::Hexadecimal),
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				';' => {
					if self.scratchpad.len() == 0 {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"empty reference",
						)));
					}
					let digits = self.flush_scratchpad();
					let expanded = resolve_char_reference(&digits, radix, ctx)?;
					self.swap_scratchpad();
					self.prep_scratchpad();
					self.scratchpad.push(expanded);
					self.state = ret.to_state();
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if match radix {
					CharRefRadix::Decimal => CLASS_XML_DECIMAL_DIGITS.select(ch),
					CharRefRadix::Hexadecimal => CLASS_XML_HEXADECIMAL_DIGITS.select(ch),
				} =>
				{
					if self.scratchpad.len() >= MAX_CHARREF_DIGITS {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"character reference too long",
						)));
					}
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx,
					other,
					Some(&[";"]),
				))),
			},
		}
	}

	fn lex_eob(&mut self) -> Result<Lexed> {
		// accumulating states flush a partial event at suspension; the
		// discardable empty case is suppressed, everything else suspends
		// silently
		let tok = match self.state {
			State::Document => self.maybe_flush_scratchpad_as_whitespace(),
			State::Content(ContentState::Initial) => self.maybe_flush_scratchpad_as_text(),
			State::CdataSection(CdataState::Body) => self.maybe_flush_scratchpad_as_cdata_section(),
			_ => None,
		};
		Ok(match tok {
			Some(tok) => Lexed::Token(tok),
			None => Lexed::Proceed,
		})
	}

	fn state_errctx(&self) -> &'static str {
		match self.state {
			State::Document => ERRCTX_DOCUMENT,
			State::Markup { .. } => ERRCTX_ELEMENT,
			State::Content(_) => ERRCTX_TEXT,
			State::CdataSection(_) => ERRCTX_CDATA_SECTION,
			State::Comment(..) => ERRCTX_COMMENT,
			State::Pi(..) => ERRCTX_PI,
			State::Element {
				kind: ElementKind::XmlDecl,
				..
			} => ERRCTX_XML_DECL,
			State::Element {
				kind: ElementKind::Footer,
				..
			} => ERRCTX_ELEMENT_FOOT,
			State::Element { .. } => ERRCTX_ELEMENT,
			State::Reference { ctx, .. } => ctx,
			State::Doctype(substate) => substate.errctx(),
			State::Eof => ERRCTX_DOCUMENT,
		}
	}

	fn lex_eod(&mut self) -> Result<Lexed> {
		match self.state {
			State::Document => {
				if let Some(tok) = self.maybe_flush_scratchpad_as_whitespace() {
					return Ok(Lexed::Token(tok));
				}
				if !self.seen_root {
					return Err(Error::wfeof(ERRCTX_DOCBEGIN));
				}
				self.state = State::Eof;
				Ok(Lexed::Token(Event::EndOfData))
			}
			// nesting is not tracked by name and unclosed elements are the
			// consumer's business, so content at depth > 0 ends cleanly too
			State::Content(ContentState::Initial) => {
				if let Some(tok) = self.maybe_flush_scratchpad_as_text() {
					return Ok(Lexed::Token(tok));
				}
				self.state = State::Eof;
				Ok(Lexed::Token(Event::EndOfData))
			}
			State::Content(ContentState::MaybeCdataEnd(n)) => {
				self.prep_scratchpad();
				for _ in 0..n {
					self.scratchpad.push(']');
				}
				self.state = State::Content(ContentState::Initial);
				self.lex_eod()
			}
			State::Doctype(DoctypeState::Subset(SubsetState::Initial))
				if self.dtd.as_ref().map(|d| d.subset_only).unwrap_or(false) =>
			{
				let dtd = self.take_dtd();
				self.state = State::Eof;
				Ok(Lexed::Token(Event::Doctype(dtd)))
			}
			State::Eof => Ok(Lexed::Token(Event::EndOfData)),
			_ => Err(Error::wfeof(self.state_errctx())),
		}
	}
}

impl fmt::Debug for Lexer {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Lexer")
			.field("state", &self.state)
			.field("depth", &self.depth)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lex_all(input: &str) -> Result<Vec<Event>> {
		let mut lexer = Lexer::new();
		let mut out = Vec::new();
		for ch in input.chars() {
			match lexer.lex(StepInput::Char(ch))? {
				Lexed::Token(ev) => out.push(ev),
				Lexed::Proceed => (),
				Lexed::SwitchEncoding(_) => (),
				Lexed::ResolveEntity(name) => {
					return Err(Error::UnknownEntity(name));
				}
			}
		}
		loop {
			match lexer.lex(StepInput::EndOfData)? {
				Lexed::Token(Event::EndOfData) => {
					out.push(Event::EndOfData);
					return Ok(out);
				}
				Lexed::Token(ev) => out.push(ev),
				_ => (),
			}
		}
	}

	fn name(s: &str) -> Name {
		use std::convert::TryInto;
		s.try_into().unwrap()
	}

	fn cdata(s: &str) -> CData {
		use std::convert::TryInto;
		s.try_into().unwrap()
	}

	#[test]
	fn lexes_empty_element_with_attributes() {
		let evs = lex_all("<r a=\"1\" b='2'/>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::EmptyElement(
					name("r"),
					vec![(name("a"), cdata("1")), (name("b"), cdata("2"))]
				),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn lexes_nested_elements_and_text() {
		let evs = lex_all("<a>x<b>y</b></a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Text(cdata("x")),
				Event::StartElement(name("b"), vec![]),
				Event::Text(cdata("y")),
				Event::EndElement(name("b")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn expands_builtin_entities_in_text_without_splitting() {
		let evs = lex_all("<a>x&amp;y</a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Text(cdata("x&y")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn expands_all_builtin_entities_in_attribute_values() {
		let evs = lex_all("<a x='&lt;&gt;&amp;&apos;&quot;'/>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::EmptyElement(name("a"), vec![(name("x"), cdata("<>&'\""))]),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn expands_character_references() {
		let evs = lex_all("<a>&#x3c;&#62;</a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Text(cdata("<>")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn rejects_character_references_to_invalid_codepoints() {
		match lex_all("<a>&#0;</a>") {
			Err(Error::NotWellFormed(WFError::InvalidChar(_, 0, true))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn lexes_cdata_sections_verbatim() {
		let evs = lex_all("<a><![CDATA[<z>&amp;]]]></a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Cdata(cdata("<z>&amp;]")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn lexes_comments_and_pis_in_content() {
		let evs = lex_all("<a><!--c--><?t  d?></a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Comment(cdata("c")),
				Event::Pi(name("t"), cdata("d")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn rejects_cdata_end_sequence_in_text() {
		match lex_all("<a>]]></a>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(msg))) => {
				assert_eq!(msg, "']]>' is not allowed in text");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn allows_square_brackets_in_text() {
		let evs = lex_all("<a>x]y]]z]</a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Text(cdata("x]y]]z]")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn rejects_double_dash_in_comment() {
		match lex_all("<a><!--x--y--></a>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(msg))) => {
				assert_eq!(msg, "'--' is not allowed in comment");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_lt_in_attribute_value() {
		match lex_all("<a x='<'/>") {
			Err(Error::NotWellFormed(WFError::UnexpectedChar(_, '<', _))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn preserves_tab_and_lf_in_attribute_values() {
		let evs = lex_all("<a x='p\tq\nr'/>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::EmptyElement(name("a"), vec![(name("x"), cdata("p\tq\nr"))]),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn keeps_attribute_order_and_duplicates() {
		let evs = lex_all("<a x='1' y='2' x='3'/>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::EmptyElement(
					name("a"),
					vec![
						(name("x"), cdata("1")),
						(name("y"), cdata("2")),
						(name("x"), cdata("3")),
					]
				),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn whitespace_outside_root_is_whitespace_not_text() {
		let evs = lex_all("  \n<a/>\n").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::Whitespace(cdata("  \n")),
				Event::EmptyElement(name("a"), vec![]),
				Event::Whitespace(cdata("\n")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn rejects_text_at_document_level() {
		match lex_all("<a/>junk") {
			Err(Error::NotWellFormed(WFError::UnexpectedChar(_, 'j', _))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn xml_declaration_is_consumed_without_an_event() {
		let evs = lex_all("<?xml version='1.0'?><a/>").unwrap();
		assert_eq!(
			evs,
			vec![Event::EmptyElement(name("a"), vec![]), Event::EndOfData]
		);
	}

	#[test]
	fn xml_declaration_with_standalone() {
		let evs = lex_all("<?xml version=\"1.0\" standalone='yes'?><a/>").unwrap();
		assert_eq!(
			evs,
			vec![Event::EmptyElement(name("a"), vec![]), Event::EndOfData]
		);
	}

	#[test]
	fn xml_declaration_requires_version() {
		match lex_all("<?xml encoding='utf-8'?><a/>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(msg))) => {
				assert_eq!(msg, "'<?xml' must be followed by version attribute");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn xml_declaration_rejects_other_versions() {
		match lex_all("<?xml version='1.1'?><a/>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(msg))) => {
				assert_eq!(msg, "only XML version 1.0 is supported");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn xml_declaration_signals_encoding_switch() {
		let mut lexer = Lexer::new();
		let mut switched = None;
		for ch in "<?xml version='1.0' encoding='ISO-8859-1'?>".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::SwitchEncoding(label) => switched = Some(label),
				Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		assert_eq!(switched.as_deref(), Some("ISO-8859-1"));
	}

	#[test]
	fn xml_declaration_only_at_document_start() {
		match lex_all(" <?xml version='1.0'?><a/>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(msg))) => {
				assert_eq!(msg, "processing instruction target 'xml' is reserved");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn reserved_pi_target_rejected_in_content() {
		assert!(lex_all("<a><?xMl x?></a>").is_err());
	}

	#[test]
	fn pi_without_data() {
		let evs = lex_all("<a><?t?></a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Pi(name("t"), cdata("")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn pi_data_may_contain_question_marks() {
		let evs = lex_all("<a><?t a??b?></a>").unwrap();
		assert_eq!(
			evs,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Pi(name("t"), cdata("a??b")),
				Event::EndElement(name("a")),
				Event::EndOfData,
			]
		);
	}

	#[test]
	fn resolver_driven_entities_are_inlined_verbatim() {
		let mut lexer = Lexer::new();
		let mut out = Vec::new();
		for ch in "<a>x&foo;y</a>".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::Token(ev) => out.push(ev),
				Lexed::ResolveEntity(n) => {
					assert_eq!(n, "foo");
					// deliberately contains markup-ish text which must not
					// be re-lexed
					lexer.resolve_entity("<raw&>").unwrap();
				}
				Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		loop {
			match lexer.lex(StepInput::EndOfData).unwrap() {
				Lexed::Token(Event::EndOfData) => break,
				Lexed::Token(ev) => out.push(ev),
				_ => (),
			}
		}
		assert_eq!(
			out,
			vec![
				Event::StartElement(name("a"), vec![]),
				Event::Text(cdata("x<raw&>y")),
				Event::EndElement(name("a")),
			]
		);
	}

	#[test]
	fn eob_suspends_and_resumes_mid_name() {
		let mut lexer = Lexer::new();
		let mut out = Vec::new();
		for ch in "<ab".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::Token(ev) => out.push(ev),
				Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		assert_eq!(lexer.lex(StepInput::EndOfBuffer).unwrap(), Lexed::Proceed);
		for ch in "c/>".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::Token(ev) => out.push(ev),
				Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		assert_eq!(out, vec![Event::EmptyElement(name("abc"), vec![])]);
	}

	#[test]
	fn eob_flushes_partial_text() {
		let mut lexer = Lexer::new();
		for ch in "<a>hi".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::Token(Event::StartElement(..)) | Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		assert_eq!(
			lexer.lex(StepInput::EndOfBuffer).unwrap(),
			Lexed::Token(Event::Text(cdata("hi")))
		);
		// an immediate second suspension has nothing to flush
		assert_eq!(lexer.lex(StepInput::EndOfBuffer).unwrap(), Lexed::Proceed);
	}

	#[test]
	fn eod_without_root_element_is_an_error() {
		match lex_all("  ") {
			Err(Error::NotWellFormed(WFError::InvalidEof(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn errors_are_cached() {
		let mut lexer = Lexer::new();
		for ch in "<a>]]".chars() {
			lexer.lex(StepInput::Char(ch)).unwrap();
		}
		let e1 = lexer.lex(StepInput::Char('>')).unwrap_err();
		let e2 = lexer.lex(StepInput::Char('x')).unwrap_err();
		assert_eq!(e1, e2);
	}

	#[test]
	fn long_text_is_split_at_the_token_length_limit() {
		let mut lexer = Lexer::with_options(LexerOptions::default().max_token_length(4));
		let mut texts = Vec::new();
		for ch in "<a>abcdefghij</a>".chars() {
			match lexer.lex(StepInput::Char(ch)).unwrap() {
				Lexed::Token(Event::Text(t)) => texts.push(String::from(t)),
				Lexed::Token(_) | Lexed::Proceed => (),
				other => panic!("unexpected lexer output: {:?}", other),
			}
		}
		assert_eq!(texts.concat(), "abcdefghij");
		assert!(texts.len() > 1);
	}

	#[test]
	fn long_names_exceed_the_token_length_limit() {
		let mut lexer = Lexer::with_options(LexerOptions::default().max_token_length(4));
		let mut result = Ok(Lexed::Proceed);
		for ch in "<abcdefghij/>".chars() {
			result = lexer.lex(StepInput::Char(ch));
			if result.is_err() {
				break;
			}
		}
		assert_eq!(
			result.unwrap_err(),
			Error::LimitExceeded("maximum token length exceeded")
		);
	}
}
