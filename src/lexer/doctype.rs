/*!
# Document type declaration states

Sub-machine of the [`Lexer`] covering `<!DOCTYPE …>` with its internal
subset: element type declarations with full content models, attribute-list
declarations, entity and notation declarations, parameter entity references,
and comments and processing instructions between them.

Nested content models are handled with an explicit stack of group frames
held in the [`DtdBuilder`], which keeps every state cheap to copy and the
whole machine suspendable between any two codepoints.
*/
use super::*;

use crate::dtd::{
	AttDef, AttType, ContentParticle, ContentSpec, CpKind, DefaultDecl, EntityDecl, EntityDef,
	ExternalId, IntSubset, Repetition,
};

/// Which declaration an external identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum ExtIdCtx {
	Doctype,
	Entity,
	Notation,
}

impl ExtIdCtx {
	fn errctx(&self) -> &'static str {
		match self {
			Self::Doctype => ERRCTX_DOCTYPE,
			Self::Entity => ERRCTX_ENTITY_DECL,
			Self::Notation => ERRCTX_NOTATION_DECL,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum ExtIdKind {
	System,
	Public,
}

/// Declarations whose keyword is followed by `S Name`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum DeclKind {
	Element,
	AttList,
	Notation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum SubsetState {
	/// Between declarations.
	Initial,
	/// Just after `<`.
	Markup,
	/// Just after `<!`.
	Bang,
}

/// States of the contentspec machine (`EMPTY`, `ANY`, mixed content and
/// element content models).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum CsState {
	Start,
	/// `EMPTY` / `ANY`
	Keyword,
	/// Just after `(`.
	GroupOpen,
	ItemName,
	/// After a complete particle, before `|`, `,` or `)`.
	AfterItem,
	/// After a separator.
	BeforeItem,
	/// After `)`, an optional repetition marker follows.
	GroupRep,
	/// `#PCDATA`
	MixedKeyword,
	MixedAfterPcdata,
	MixedBeforeName,
	MixedName,
	/// After the `)` of a mixed group; `*` may or must follow.
	MixedClose,
	/// Waiting for the closing `>`.
	End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum GroupKind {
	Notation,
	Enumeration,
}

/// States of the attribute-list machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum AttState {
	/// Before an attribute definition or the closing `>`.
	DefStart,
	/// After a complete definition, whitespace is required before the
	/// next one.
	DefRequireSpace,
	Name,
	AfterName,
	TypeKeyword,
	/// After `NOTATION`, waiting for `(`.
	NotationSpace,
	GroupBlank(GroupKind),
	GroupName(GroupKind),
	GroupAfterName(GroupKind),
	/// After the `)` of an enumerated type, whitespace is required.
	AfterGroup,
	/// Before the default declaration.
	AfterType,
	/// `#REQUIRED` / `#IMPLIED` / `#FIXED`
	DefaultKeyword,
	/// After `#FIXED`, waiting for the quoted value.
	FixedSpace,
	DefaultValue(char),
}

/// States of the entity declaration machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum EntState {
	/// `%` would make this a parameter entity.
	MaybePercent,
	/// Whitespace is required after `%`.
	PercentSpace,
	Name,
	AfterName,
	Value(char),
	/// Just after `&` inside an entity value; only character references
	/// are expanded there.
	ValueAmp(char),
	AfterValue,
	/// `NDATA`
	NdataKeyword,
	NdataName,
	AfterNdata,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum DoctypeState {
	/// `DOCTYPE` keyword after `<!` at document level.
	Keyword,
	/// The doctype name.
	Name,
	AfterName,
	/// `SYSTEM` / `PUBLIC`
	ExtIdKeyword(ExtIdCtx),
	ExtIdSpace(ExtIdCtx, ExtIdKind),
	PubidLit(ExtIdCtx, char),
	AfterPubid(ExtIdCtx),
	AfterPubidBlank(ExtIdCtx),
	SysLit(ExtIdCtx, char),
	AfterExtId(ExtIdCtx),
	AfterExtIdBlank(ExtIdCtx),
	Subset(SubsetState),
	/// After the `]` closing the internal subset.
	AfterSubset,
	/// Declaration keyword after `<!` inside the subset.
	DeclKeyword,
	/// The name following `<!ELEMENT`, `<!ATTLIST` or `<!NOTATION`.
	DeclName(DeclKind),
	/// `%name;` at subset top level.
	PeRef,
	Cs(CsState),
	Att(AttState),
	Ent(EntState),
}

impl DoctypeState {
	pub(super) fn entity_value(delim: char) -> DoctypeState {
		DoctypeState::Ent(EntState::Value(delim))
	}

	pub(super) fn att_default(delim: char) -> DoctypeState {
		DoctypeState::Att(AttState::DefaultValue(delim))
	}

	pub(super) fn errctx(&self) -> &'static str {
		match self {
			Self::Keyword | Self::Name | Self::AfterName | Self::AfterSubset => ERRCTX_DOCTYPE,
			Self::ExtIdKeyword(ctx)
			| Self::ExtIdSpace(ctx, _)
			| Self::AfterExtId(ctx)
			| Self::AfterExtIdBlank(ctx) => ctx.errctx(),
			Self::PubidLit(..) | Self::AfterPubid(_) | Self::AfterPubidBlank(_) => ERRCTX_PUBID,
			Self::SysLit(..) => ERRCTX_SYSID,
			Self::Subset(_) | Self::DeclKeyword | Self::DeclName(_) | Self::PeRef => {
				ERRCTX_INT_SUBSET
			}
			Self::Cs(_) => ERRCTX_CONTENTSPEC,
			Self::Att(_) => ERRCTX_ATTLIST_DECL,
			Self::Ent(_) => ERRCTX_ENTITY_DECL,
		}
	}
}

pub(super) struct CsFrame {
	items: Vec<ContentParticle>,
	sep: Option<char>,
}

impl CsFrame {
	fn new() -> CsFrame {
		CsFrame {
			items: Vec::new(),
			sep: None,
		}
	}
}

/// Accumulator for the doctype declaration currently being parsed.
///
/// Every piece of state which would otherwise have to live inside a state
/// variant (and thereby make it expensive to copy) lives here instead.
pub(super) struct DtdBuilder {
	/// True when parsing a bare internal subset (see
	/// [`Lexer::for_internal_subset`]); the subset then ends at the end of
	/// data instead of at `]`.
	pub(super) subset_only: bool,
	name: Option<Name>,
	external_id: Option<ExternalId>,
	items: Vec<IntSubset>,
	decl_name: Option<Name>,
	pubid: Option<CData>,
	extid: Option<ExternalId>,
	cs_stack: Vec<CsFrame>,
	pending_cp: Option<CpKind>,
	contentspec: Option<ContentSpec>,
	mixed_names: Vec<Name>,
	attdefs: Vec<AttDef>,
	att_name: Option<Name>,
	att_type: Option<AttType>,
	att_fixed: bool,
	group_names: Vec<Name>,
	group_tokens: Vec<CData>,
	pe: bool,
	entity_def: Option<EntityDef>,
	ndata: Option<Name>,
}

impl DtdBuilder {
	pub(super) fn new() -> DtdBuilder {
		DtdBuilder {
			subset_only: false,
			name: None,
			external_id: None,
			items: Vec::new(),
			decl_name: None,
			pubid: None,
			extid: None,
			cs_stack: Vec::new(),
			pending_cp: None,
			contentspec: None,
			mixed_names: Vec::new(),
			attdefs: Vec::new(),
			att_name: None,
			att_type: None,
			att_fixed: false,
			group_names: Vec::new(),
			group_tokens: Vec::new(),
			pe: false,
			entity_def: None,
			ndata: None,
		}
	}

	pub(super) fn new_subset_only() -> DtdBuilder {
		let mut b = Self::new();
		b.subset_only = true;
		b
	}
}

fn repetition_of(ch: char) -> Option<Repetition> {
	match ch {
		'?' => Some(Repetition::Opt),
		'*' => Some(Repetition::Star),
		'+' => Some(Repetition::Plus),
		_ => None,
	}
}

impl Lexer {
	fn push_keyword_char(&mut self, ch: char) -> Result<()> {
		if self.scratchpad.len() >= MAX_KEYWORD_LENGTH {
			let mut word = self.flush_scratchpad();
			word.push(ch);
			return Err(Error::UnknownToken(word));
		}
		self.scratchpad.push(ch);
		Ok(())
	}

	pub(super) fn take_dtd(&mut self) -> Dtd {
		let b = self
			.dtd
			.take()
			.expect("doctype builder must exist while in doctype states");
		Dtd {
			name: b.name,
			external_id: b.external_id,
			internal_subset: b.items,
		}
	}

	fn emit_doctype(&mut self) -> Lexed {
		let dtd = self.take_dtd();
		self.seen_doctype = true;
		self.state = State::Document;
		Lexed::Token(Event::Doctype(dtd))
	}

	fn to_subset(&mut self) {
		self.state = State::Doctype(DoctypeState::Subset(SubsetState::Initial));
	}

	pub(super) fn push_subset_comment(&mut self, data: CData) {
		self.dtd_mut().items.push(IntSubset::Comment(data));
		self.to_subset();
	}

	pub(super) fn push_subset_pi(&mut self, target: Name, data: CData) {
		self.dtd_mut().items.push(IntSubset::Pi(target, data));
		self.to_subset();
	}

	fn finish_elementdecl(&mut self) {
		let b = self.dtd_mut();
		let name = b
			.decl_name
			.take()
			.expect("declaration name must have been read");
		let spec = b
			.contentspec
			.take()
			.expect("content specification must have been read");
		b.items.push(IntSubset::Element(name, spec));
		self.to_subset();
	}

	fn finish_attlist(&mut self) {
		let b = self.dtd_mut();
		let name = b
			.decl_name
			.take()
			.expect("declaration name must have been read");
		let defs = std::mem::replace(&mut b.attdefs, Vec::new());
		b.items.push(IntSubset::AttList(name, defs));
		self.to_subset();
	}

	fn finish_entity(&mut self) {
		let b = self.dtd_mut();
		let name = b
			.decl_name
			.take()
			.expect("entity name must have been read");
		let def = match b.entity_def.take() {
			Some(def) => def,
			None => EntityDef::External(
				b.extid
					.take()
					.expect("external identifier must have been read"),
				b.ndata.take(),
			),
		};
		let parameter = b.pe;
		b.pe = false;
		b.items.push(IntSubset::Entity(EntityDecl {
			name: name,
			parameter: parameter,
			def: def,
		}));
		self.to_subset();
	}

	fn finish_notation(&mut self, extid: ExternalId) {
		let b = self.dtd_mut();
		let name = b
			.decl_name
			.take()
			.expect("notation name must have been read");
		b.items.push(IntSubset::Notation(name, extid));
		self.to_subset();
	}

	fn push_attdef(&mut self, default: DefaultDecl) {
		let b = self.dtd_mut();
		let name = b.att_name.take().expect("attribute name must have been read");
		let atttype = b
			.att_type
			.take()
			.expect("attribute type must have been read");
		b.attdefs.push(AttDef {
			name: name,
			atttype: atttype,
			default: default,
		});
	}

	fn close_cs_group(&mut self) {
		let b = self.dtd_mut();
		let frame = b.cs_stack.pop().expect("group frame must exist");
		let kind = match frame.sep {
			Some('|') => CpKind::Choice(frame.items),
			_ => CpKind::Seq(frame.items),
		};
		b.pending_cp = Some(kind);
	}

	fn lex_doctype_keyword(&mut self, ch: char) -> Result<Step> {
		if ch.is_ascii_alphabetic() {
			self.push_keyword_char(ch)?;
			return Ok(Step::Done(Lexed::Proceed));
		}
		let word = self.flush_scratchpad();
		if word != "DOCTYPE" {
			return Err(Error::UnknownToken(word));
		}
		if self.seen_root {
			return Err(Error::NotWellFormed(WFError::InvalidSyntax(
				"DOCTYPE is not allowed after the root element",
			)));
		}
		if self.seen_doctype {
			return Err(Error::NotWellFormed(WFError::InvalidSyntax(
				"at most one DOCTYPE is allowed",
			)));
		}
		if !is_space(ch) {
			return Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_DOCTYPE,
				ch,
				Some(&["whitespace"]),
			)));
		}
		self.dtd = Some(Box::new(DtdBuilder::new()));
		self.state = State::Doctype(DoctypeState::Name);
		Ok(Step::Done(Lexed::Proceed))
	}

	fn lex_doctype_name(&mut self, ch: char) -> Result<Step> {
		if self.scratchpad.len() == 0 {
			return if is_space(ch) {
				Ok(Step::Done(Lexed::Proceed))
			} else if is_name_start_char(ch) {
				self.prep_scratchpad();
				self.scratchpad.push(ch);
				Ok(Step::Done(Lexed::Proceed))
			} else {
				Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_DOCTYPE,
					ch,
					Some(&["name"]),
				)))
			};
		}
		if is_name_char(ch) {
			self.check_accumulator_length()?;
			self.scratchpad.push(ch);
			return Ok(Step::Done(Lexed::Proceed));
		}
		let name = self.flush_scratchpad_as_name();
		self.dtd_mut().name = Some(name);
		match ch {
			ch if is_space(ch) => {
				self.state = State::Doctype(DoctypeState::AfterName);
				Ok(Step::Done(Lexed::Proceed))
			}
			'[' => {
				self.to_subset();
				Ok(Step::Done(Lexed::Proceed))
			}
			'>' => Ok(Step::Done(self.emit_doctype())),
			other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_DOCTYPE,
				other,
				Some(&["whitespace", "[", ">"]),
			))),
		}
	}

	fn lex_extid(&mut self, state: DoctypeState, ch: char) -> Result<Step> {
		match state {
			DoctypeState::ExtIdKeyword(ctx) => {
				if self.scratchpad.len() == 0 && is_space(ch) {
					return Ok(Step::Done(Lexed::Proceed));
				}
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				let kind = match word.as_str() {
					"SYSTEM" => ExtIdKind::System,
					"PUBLIC" => ExtIdKind::Public,
					_ => return Err(Error::UnknownToken(word)),
				};
				if !is_space(ch) {
					return Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ctx.errctx(),
						ch,
						Some(&["whitespace"]),
					)));
				}
				self.state = State::Doctype(DoctypeState::ExtIdSpace(ctx, kind));
				Ok(Step::Done(Lexed::Proceed))
			}
			DoctypeState::ExtIdSpace(ctx, kind) => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'"' | '\'' => {
					self.state = State::Doctype(match kind {
						ExtIdKind::System => DoctypeState::SysLit(ctx, ch),
						ExtIdKind::Public => DoctypeState::PubidLit(ctx, ch),
					});
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx.errctx(),
					other,
					Some(&["\"", "'"]),
				))),
			},
			DoctypeState::PubidLit(ctx, delim) => match ch {
				ch if ch == delim => {
					let pubid = self.flush_scratchpad_as_cdata();
					self.dtd_mut().pubid = Some(pubid);
					self.state = State::Doctype(DoctypeState::AfterPubid(ctx));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if is_pubid_char(ch) => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_PUBID,
					other,
					None,
				))),
			},
			DoctypeState::AfterPubid(ctx) => match ch {
				ch if is_space(ch) => {
					self.state = State::Doctype(DoctypeState::AfterPubidBlank(ctx));
					Ok(Step::Done(Lexed::Proceed))
				}
				// a notation declaration may end after the public id
				'>' if ctx == ExtIdCtx::Notation => {
					let pubid = self
						.dtd_mut()
						.pubid
						.take()
						.expect("public identifier must have been read");
					self.finish_notation(ExternalId::Public(pubid, None));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx.errctx(),
					other,
					Some(&["whitespace"]),
				))),
			},
			DoctypeState::AfterPubidBlank(ctx) => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'"' | '\'' => {
					self.state = State::Doctype(DoctypeState::SysLit(ctx, ch));
					Ok(Step::Done(Lexed::Proceed))
				}
				'>' if ctx == ExtIdCtx::Notation => {
					let pubid = self
						.dtd_mut()
						.pubid
						.take()
						.expect("public identifier must have been read");
					self.finish_notation(ExternalId::Public(pubid, None));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx.errctx(),
					other,
					Some(&["\"", "'"]),
				))),
			},
			DoctypeState::SysLit(ctx, delim) => match ch {
				ch if ch == delim => {
					let lit = self.flush_scratchpad_as_cdata();
					let extid = match self.dtd_mut().pubid.take() {
						Some(pubid) => ExternalId::Public(pubid, Some(lit)),
						None => ExternalId::System(lit),
					};
					match ctx {
						ExtIdCtx::Doctype => {
							self.dtd_mut().external_id = Some(extid);
						}
						_ => {
							self.dtd_mut().extid = Some(extid);
						}
					}
					self.state = State::Doctype(DoctypeState::AfterExtId(ctx));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_SYSID,
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
			DoctypeState::AfterExtId(ctx) => match ch {
				ch if is_space(ch) => {
					self.state = State::Doctype(DoctypeState::AfterExtIdBlank(ctx));
					Ok(Step::Done(Lexed::Proceed))
				}
				'[' if ctx == ExtIdCtx::Doctype => {
					self.to_subset();
					Ok(Step::Done(Lexed::Proceed))
				}
				'>' => match ctx {
					ExtIdCtx::Doctype => Ok(Step::Done(self.emit_doctype())),
					ExtIdCtx::Entity => {
						self.finish_entity();
						Ok(Step::Done(Lexed::Proceed))
					}
					ExtIdCtx::Notation => {
						let extid = self
							.dtd_mut()
							.extid
							.take()
							.expect("external identifier must have been read");
						self.finish_notation(extid);
						Ok(Step::Done(Lexed::Proceed))
					}
				},
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx.errctx(),
					other,
					Some(&["whitespace", ">"]),
				))),
			},
			DoctypeState::AfterExtIdBlank(ctx) => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'[' if ctx == ExtIdCtx::Doctype => {
					self.to_subset();
					Ok(Step::Done(Lexed::Proceed))
				}
				'>' => {
					self.state = State::Doctype(DoctypeState::AfterExtId(ctx));
					Ok(Step::Again)
				}
				ch if ctx == ExtIdCtx::Entity && ch.is_ascii_alphabetic() => {
					self.drop_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Ent(EntState::NdataKeyword));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ctx.errctx(),
					other,
					None,
				))),
			},
			_ => panic!("invalid state"),
		}
	}

	fn lex_subset(&mut self, state: SubsetState, ch: char) -> Result<Step> {
		match state {
			SubsetState::Initial => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'<' => {
					self.state = State::Doctype(DoctypeState::Subset(SubsetState::Markup));
					Ok(Step::Done(Lexed::Proceed))
				}
				'%' => {
					self.drop_scratchpad();
					self.state = State::Doctype(DoctypeState::PeRef);
					Ok(Step::Done(Lexed::Proceed))
				}
				']' => {
					if self.dtd.as_ref().map(|d| d.subset_only).unwrap_or(false) {
						Err(Error::NotWellFormed(WFError::UnexpectedChar(
							ERRCTX_INT_SUBSET,
							']',
							None,
						)))
					} else {
						self.state = State::Doctype(DoctypeState::AfterSubset);
						Ok(Step::Done(Lexed::Proceed))
					}
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_INT_SUBSET,
					other,
					Some(&["whitespace", "<", "%", "]"]),
				))),
			},
			SubsetState::Markup => match ch {
				'!' => {
					self.state = State::Doctype(DoctypeState::Subset(SubsetState::Bang));
					Ok(Step::Done(Lexed::Proceed))
				}
				'?' => {
					self.drop_scratchpad();
					self.state = State::Pi(PiState::Target, MarkupCtx::Subset);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_INT_SUBSET,
					other,
					Some(&["!", "?"]),
				))),
			},
			SubsetState::Bang => match ch {
				'-' => {
					self.drop_scratchpad();
					self.state = State::Comment(CommentState::Open, MarkupCtx::Subset);
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if ch.is_ascii_alphabetic() => {
					self.drop_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::DeclKeyword);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_INT_SUBSET,
					other,
					Some(&["-", "keyword"]),
				))),
			},
		}
	}

	fn lex_decl_keyword(&mut self, ch: char) -> Result<Step> {
		if ch.is_ascii_alphabetic() {
			self.push_keyword_char(ch)?;
			return Ok(Step::Done(Lexed::Proceed));
		}
		let word = self.flush_scratchpad();
		let kind = match word.as_str() {
			"ELEMENT" => Some(DeclKind::Element),
			"ATTLIST" => Some(DeclKind::AttList),
			"NOTATION" => Some(DeclKind::Notation),
			"ENTITY" => None,
			_ => return Err(Error::UnknownToken(word)),
		};
		if !is_space(ch) {
			return Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_INT_SUBSET,
				ch,
				Some(&["whitespace"]),
			)));
		}
		self.state = State::Doctype(match kind {
			Some(kind) => DoctypeState::DeclName(kind),
			None => DoctypeState::Ent(EntState::MaybePercent),
		});
		Ok(Step::Done(Lexed::Proceed))
	}

	fn lex_decl_name(&mut self, kind: DeclKind, ch: char) -> Result<Step> {
		if self.scratchpad.len() == 0 {
			return if is_space(ch) {
				Ok(Step::Done(Lexed::Proceed))
			} else if is_name_start_char(ch) {
				self.prep_scratchpad();
				self.scratchpad.push(ch);
				Ok(Step::Done(Lexed::Proceed))
			} else {
				Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_INT_SUBSET,
					ch,
					Some(&["name"]),
				)))
			};
		}
		if is_name_char(ch) {
			self.check_accumulator_length()?;
			self.scratchpad.push(ch);
			return Ok(Step::Done(Lexed::Proceed));
		}
		let name = self.flush_scratchpad_as_name();
		self.dtd_mut().decl_name = Some(name);
		match (kind, ch) {
			(_, ch) if is_space(ch) => {
				self.state = State::Doctype(match kind {
					DeclKind::Element => DoctypeState::Cs(CsState::Start),
					DeclKind::AttList => DoctypeState::Att(AttState::DefStart),
					DeclKind::Notation => DoctypeState::ExtIdKeyword(ExtIdCtx::Notation),
				});
				Ok(Step::Done(Lexed::Proceed))
			}
			// an attribute-list declaration may be empty
			(DeclKind::AttList, '>') => {
				self.finish_attlist();
				Ok(Step::Done(Lexed::Proceed))
			}
			(_, other) => Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_INT_SUBSET,
				other,
				Some(&["whitespace"]),
			))),
		}
	}

	fn lex_pe_ref(&mut self, ch: char) -> Result<Step> {
		if self.scratchpad.len() == 0 {
			return if is_name_start_char(ch) {
				self.prep_scratchpad();
				self.scratchpad.push(ch);
				Ok(Step::Done(Lexed::Proceed))
			} else {
				Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_INT_SUBSET,
					ch,
					Some(&["name"]),
				)))
			};
		}
		if is_name_char(ch) {
			self.check_accumulator_length()?;
			self.scratchpad.push(ch);
			return Ok(Step::Done(Lexed::Proceed));
		}
		if ch != ';' {
			return Err(Error::NotWellFormed(WFError::UnexpectedChar(
				ERRCTX_INT_SUBSET,
				ch,
				Some(&[";"]),
			)));
		}
		let name = self.flush_scratchpad_as_name();
		self.dtd_mut().items.push(IntSubset::DeclSect(name));
		self.to_subset();
		Ok(Step::Done(Lexed::Proceed))
	}

	fn lex_contentspec(&mut self, state: CsState, ch: char) -> Result<Step> {
		match state {
			CsState::Start => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'(' => {
					self.dtd_mut().cs_stack.push(CsFrame::new());
					self.state = State::Doctype(DoctypeState::Cs(CsState::GroupOpen));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if ch.is_ascii_alphabetic() => {
					self.drop_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Cs(CsState::Keyword));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["(", "EMPTY", "ANY"]),
				))),
			},
			CsState::Keyword => {
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				let spec = match word.as_str() {
					"EMPTY" => ContentSpec::Empty,
					"ANY" => ContentSpec::Any,
					_ => return Err(Error::UnknownToken(word)),
				};
				self.dtd_mut().contentspec = Some(spec);
				match ch {
					ch if is_space(ch) => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::End));
						Ok(Step::Done(Lexed::Proceed))
					}
					'>' => {
						self.finish_elementdecl();
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_CONTENTSPEC,
						other,
						Some(&["whitespace", ">"]),
					))),
				}
			}
			CsState::GroupOpen => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'#' => {
					let b = self.dtd_mut();
					let top_level = b.cs_stack.len() == 1
						&& b.cs_stack[0].items.len() == 0
						&& b.cs_stack[0].sep.is_none();
					if !top_level {
						return Err(Error::NotWellFormed(WFError::InvalidSyntax(
							"'#PCDATA' is only allowed in a top-level group",
						)));
					}
					self.drop_scratchpad();
					self.scratchpad.push('#');
					self.state = State::Doctype(DoctypeState::Cs(CsState::MixedKeyword));
					Ok(Step::Done(Lexed::Proceed))
				}
				'(' => {
					self.dtd_mut().cs_stack.push(CsFrame::new());
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Cs(CsState::ItemName));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["(", "#PCDATA", "name"]),
				))),
			},
			CsState::ItemName => {
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				let name = self.flush_scratchpad_as_name();
				let rep = repetition_of(ch);
				self.dtd_mut()
					.cs_stack
					.last_mut()
					.expect("group frame must exist")
					.items
					.push(ContentParticle {
						kind: CpKind::Name(name),
						rep: rep.unwrap_or(Repetition::One),
					});
				self.state = State::Doctype(DoctypeState::Cs(CsState::AfterItem));
				match rep {
					Some(_) => Ok(Step::Done(Lexed::Proceed)),
					None => Ok(Step::Again),
				}
			}
			CsState::AfterItem => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'|' | ',' => {
					let frame = self
						.dtd_mut()
						.cs_stack
						.last_mut()
						.expect("group frame must exist");
					match frame.sep {
						None => {
							frame.sep = Some(ch);
						}
						Some(sep) if sep == ch => (),
						Some(_) => {
							return Err(Error::NotWellFormed(WFError::InvalidSyntax(
								"content model group mixes '|' and ','",
							)))
						}
					}
					self.state = State::Doctype(DoctypeState::Cs(CsState::BeforeItem));
					Ok(Step::Done(Lexed::Proceed))
				}
				')' => {
					self.close_cs_group();
					self.state = State::Doctype(DoctypeState::Cs(CsState::GroupRep));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["|", ",", ")"]),
				))),
			},
			CsState::BeforeItem => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'(' => {
					self.dtd_mut().cs_stack.push(CsFrame::new());
					self.state = State::Doctype(DoctypeState::Cs(CsState::GroupOpen));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Cs(CsState::ItemName));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["(", "name"]),
				))),
			},
			CsState::GroupRep => {
				let rep = repetition_of(ch);
				let kind = self
					.dtd_mut()
					.pending_cp
					.take()
					.expect("closed group must be pending");
				let particle = ContentParticle {
					kind: kind,
					rep: rep.unwrap_or(Repetition::One),
				};
				let finished = {
					let b = self.dtd_mut();
					match b.cs_stack.last_mut() {
						Some(frame) => {
							frame.items.push(particle);
							false
						}
						None => {
							b.contentspec = Some(ContentSpec::Children(particle));
							true
						}
					}
				};
				self.state = State::Doctype(DoctypeState::Cs(if finished {
					CsState::End
				} else {
					CsState::AfterItem
				}));
				match rep {
					Some(_) => Ok(Step::Done(Lexed::Proceed)),
					None => Ok(Step::Again),
				}
			}
			CsState::MixedKeyword => {
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				if word != "#PCDATA" {
					return Err(Error::UnknownToken(word));
				}
				match ch {
					ch if is_space(ch) => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedAfterPcdata));
						Ok(Step::Done(Lexed::Proceed))
					}
					'|' => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedBeforeName));
						Ok(Step::Done(Lexed::Proceed))
					}
					')' => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedClose));
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_CONTENTSPEC,
						other,
						Some(&["|", ")"]),
					))),
				}
			}
			CsState::MixedAfterPcdata => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'|' => {
					self.state = State::Doctype(DoctypeState::Cs(CsState::MixedBeforeName));
					Ok(Step::Done(Lexed::Proceed))
				}
				')' => {
					self.state = State::Doctype(DoctypeState::Cs(CsState::MixedClose));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["|", ")"]),
				))),
			},
			CsState::MixedBeforeName => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				ch if is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Cs(CsState::MixedName));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&["name"]),
				))),
			},
			CsState::MixedName => {
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				let name = self.flush_scratchpad_as_name();
				self.dtd_mut().mixed_names.push(name);
				match ch {
					ch if is_space(ch) => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedAfterPcdata));
						Ok(Step::Done(Lexed::Proceed))
					}
					'|' => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedBeforeName));
						Ok(Step::Done(Lexed::Proceed))
					}
					')' => {
						self.state = State::Doctype(DoctypeState::Cs(CsState::MixedClose));
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_CONTENTSPEC,
						other,
						Some(&["|", ")"]),
					))),
				}
			}
			CsState::MixedClose => {
				let has_names = self.dtd_mut().mixed_names.len() > 0;
				if ch != '*' && has_names {
					return Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"'*' is required after mixed content with names",
					)));
				}
				{
					let b = self.dtd_mut();
					b.cs_stack.pop().expect("group frame must exist");
					let names = std::mem::replace(&mut b.mixed_names, Vec::new());
					b.contentspec = Some(ContentSpec::Mixed(names));
				}
				self.state = State::Doctype(DoctypeState::Cs(CsState::End));
				if ch == '*' {
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Ok(Step::Again)
				}
			}
			CsState::End => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'>' => {
					self.finish_elementdecl();
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_CONTENTSPEC,
					other,
					Some(&[">"]),
				))),
			},
		}
	}

	fn lex_attlist(&mut self, state: AttState, ch: char) -> Result<Step> {
		match state {
			AttState::DefStart => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'>' => {
					self.finish_attlist();
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Att(AttState::Name));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["name", ">"]),
				))),
			},
			AttState::DefRequireSpace => match ch {
				ch if is_space(ch) => {
					self.state = State::Doctype(DoctypeState::Att(AttState::DefStart));
					Ok(Step::Done(Lexed::Proceed))
				}
				'>' => {
					self.finish_attlist();
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => Err(Error::NotWellFormed(WFError::InvalidSyntax(
					"space required between attribute definitions",
				))),
			},
			AttState::Name => {
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				let name = self.flush_scratchpad_as_name();
				self.dtd_mut().att_name = Some(name);
				if is_space(ch) {
					self.state = State::Doctype(DoctypeState::Att(AttState::AfterName));
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ATTLIST_DECL,
						ch,
						Some(&["whitespace"]),
					)))
				}
			}
			AttState::AfterName => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'(' => {
					self.dtd_mut().group_tokens.clear();
					self.state = State::Doctype(DoctypeState::Att(AttState::GroupBlank(
						GroupKind::Enumeration,
					)));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if ch.is_ascii_alphabetic() => {
					self.drop_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Att(AttState::TypeKeyword));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["attribute type", "("]),
				))),
			},
			AttState::TypeKeyword => {
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				let atttype = match word.as_str() {
					"CDATA" => Some(AttType::Cdata),
					"ID" => Some(AttType::Id),
					"IDREF" => Some(AttType::IdRef),
					"IDREFS" => Some(AttType::IdRefs),
					"ENTITY" => Some(AttType::Entity),
					"ENTITIES" => Some(AttType::Entities),
					"NMTOKEN" => Some(AttType::NmToken),
					"NMTOKENS" => Some(AttType::NmTokens),
					"NOTATION" => None,
					_ => return Err(Error::UnknownToken(word)),
				};
				if !is_space(ch) {
					return Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ATTLIST_DECL,
						ch,
						Some(&["whitespace"]),
					)));
				}
				match atttype {
					Some(atttype) => {
						self.dtd_mut().att_type = Some(atttype);
						self.state = State::Doctype(DoctypeState::Att(AttState::AfterType));
					}
					None => {
						self.state = State::Doctype(DoctypeState::Att(AttState::NotationSpace));
					}
				}
				Ok(Step::Done(Lexed::Proceed))
			}
			AttState::NotationSpace => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'(' => {
					self.dtd_mut().group_names.clear();
					self.state = State::Doctype(DoctypeState::Att(AttState::GroupBlank(
						GroupKind::Notation,
					)));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["("]),
				))),
			},
			AttState::GroupBlank(gk) => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				ch if match gk {
					GroupKind::Notation => is_name_start_char(ch),
					GroupKind::Enumeration => is_name_char(ch),
				} =>
				{
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Att(AttState::GroupName(gk)));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["name"]),
				))),
			},
			AttState::GroupName(gk) => {
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				match gk {
					GroupKind::Notation => {
						let name = self.flush_scratchpad_as_name();
						self.dtd_mut().group_names.push(name);
					}
					GroupKind::Enumeration => {
						let token = self.flush_scratchpad_as_cdata();
						self.dtd_mut().group_tokens.push(token);
					}
				}
				match ch {
					ch if is_space(ch) => {
						self.state =
							State::Doctype(DoctypeState::Att(AttState::GroupAfterName(gk)));
						Ok(Step::Done(Lexed::Proceed))
					}
					'|' => {
						self.state = State::Doctype(DoctypeState::Att(AttState::GroupBlank(gk)));
						Ok(Step::Done(Lexed::Proceed))
					}
					')' => {
						self.finish_att_group(gk);
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ATTLIST_DECL,
						other,
						Some(&["|", ")"]),
					))),
				}
			}
			AttState::GroupAfterName(gk) => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'|' => {
					self.state = State::Doctype(DoctypeState::Att(AttState::GroupBlank(gk)));
					Ok(Step::Done(Lexed::Proceed))
				}
				')' => {
					self.finish_att_group(gk);
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["|", ")"]),
				))),
			},
			AttState::AfterGroup => {
				if is_space(ch) {
					self.state = State::Doctype(DoctypeState::Att(AttState::AfterType));
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ATTLIST_DECL,
						ch,
						Some(&["whitespace"]),
					)))
				}
			}
			AttState::AfterType => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'#' => {
					self.drop_scratchpad();
					self.scratchpad.push('#');
					self.state = State::Doctype(DoctypeState::Att(AttState::DefaultKeyword));
					Ok(Step::Done(Lexed::Proceed))
				}
				'"' | '\'' => {
					self.dtd_mut().att_fixed = false;
					self.state =
						State::Doctype(DoctypeState::Att(AttState::DefaultValue(ch)));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["#", "\"", "'"]),
				))),
			},
			AttState::DefaultKeyword => {
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				match word.as_str() {
					"#REQUIRED" | "#IMPLIED" => {
						let default = if word == "#REQUIRED" {
							DefaultDecl::Required
						} else {
							DefaultDecl::Implied
						};
						self.push_attdef(default);
						match ch {
							ch if is_space(ch) => {
								self.state =
									State::Doctype(DoctypeState::Att(AttState::DefStart));
								Ok(Step::Done(Lexed::Proceed))
							}
							'>' => {
								self.finish_attlist();
								Ok(Step::Done(Lexed::Proceed))
							}
							other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
								ERRCTX_ATTLIST_DECL,
								other,
								Some(&["whitespace", ">"]),
							))),
						}
					}
					"#FIXED" => {
						if !is_space(ch) {
							return Err(Error::NotWellFormed(WFError::UnexpectedChar(
								ERRCTX_ATTLIST_DECL,
								ch,
								Some(&["whitespace"]),
							)));
						}
						self.state = State::Doctype(DoctypeState::Att(AttState::FixedSpace));
						Ok(Step::Done(Lexed::Proceed))
					}
					_ => Err(Error::UnknownToken(word)),
				}
			}
			AttState::FixedSpace => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'"' | '\'' => {
					self.dtd_mut().att_fixed = true;
					self.state =
						State::Doctype(DoctypeState::Att(AttState::DefaultValue(ch)));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTLIST_DECL,
					other,
					Some(&["\"", "'"]),
				))),
			},
			AttState::DefaultValue(delim) => match ch {
				ch if ch == delim => {
					let value = self.flush_scratchpad_as_cdata();
					let fixed = self.dtd_mut().att_fixed;
					self.dtd_mut().att_fixed = false;
					let default = if fixed {
						DefaultDecl::Fixed(value)
					} else {
						DefaultDecl::Default(value)
					};
					self.push_attdef(default);
					self.state = State::Doctype(DoctypeState::Att(AttState::DefRequireSpace));
					Ok(Step::Done(Lexed::Proceed))
				}
				'<' => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ATTVAL,
					'<',
					None,
				))),
				'&' => {
					self.swap_scratchpad();
					self.state = State::Reference {
						ctx: ERRCTX_ATTVAL,
						ret: RefReturnState::AttDefault(delim),
						kind: RefKind::Entity,
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_ATTVAL,
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
		}
	}

	fn finish_att_group(&mut self, gk: GroupKind) {
		let b = self.dtd_mut();
		let atttype = match gk {
			GroupKind::Notation => {
				AttType::Notation(std::mem::replace(&mut b.group_names, Vec::new()))
			}
			GroupKind::Enumeration => {
				AttType::Enumeration(std::mem::replace(&mut b.group_tokens, Vec::new()))
			}
		};
		b.att_type = Some(atttype);
		self.state = State::Doctype(DoctypeState::Att(AttState::AfterGroup));
	}

	fn lex_entity(&mut self, state: EntState, ch: char) -> Result<Step> {
		match state {
			EntState::MaybePercent => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'%' => {
					self.dtd_mut().pe = true;
					self.state = State::Doctype(DoctypeState::Ent(EntState::PercentSpace));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if is_name_start_char(ch) => {
					self.prep_scratchpad();
					self.scratchpad.push(ch);
					self.state = State::Doctype(DoctypeState::Ent(EntState::Name));
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ENTITY_DECL,
					other,
					Some(&["%", "name"]),
				))),
			},
			EntState::PercentSpace => {
				if is_space(ch) {
					self.state = State::Doctype(DoctypeState::Ent(EntState::Name));
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Err(Error::NotWellFormed(WFError::InvalidSyntax(
						"space required after '%'",
					)))
				}
			}
			EntState::Name => {
				if self.scratchpad.len() == 0 {
					return if is_space(ch) {
						Ok(Step::Done(Lexed::Proceed))
					} else if is_name_start_char(ch) {
						self.prep_scratchpad();
						self.scratchpad.push(ch);
						Ok(Step::Done(Lexed::Proceed))
					} else {
						Err(Error::NotWellFormed(WFError::UnexpectedChar(
							ERRCTX_ENTITY_DECL,
							ch,
							Some(&["name"]),
						)))
					};
				}
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				let name = self.flush_scratchpad_as_name();
				self.dtd_mut().decl_name = Some(name);
				if is_space(ch) {
					self.state = State::Doctype(DoctypeState::Ent(EntState::AfterName));
					Ok(Step::Done(Lexed::Proceed))
				} else {
					Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ENTITY_DECL,
						ch,
						Some(&["whitespace"]),
					)))
				}
			}
			EntState::AfterName => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'"' | '\'' => {
					self.state = State::Doctype(DoctypeState::Ent(EntState::Value(ch)));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if ch.is_ascii_alphabetic() => {
					self.state = State::Doctype(DoctypeState::ExtIdKeyword(ExtIdCtx::Entity));
					Ok(Step::Again)
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ENTITY_DECL,
					other,
					Some(&["\"", "'", "SYSTEM", "PUBLIC"]),
				))),
			},
			// XML 1.0 § 2.3 [9] EntityValue: character references are
			// expanded, entity and parameter entity references are carried
			// verbatim
			EntState::Value(delim) => match ch {
				ch if ch == delim => {
					let value = self.flush_scratchpad_as_cdata();
					self.dtd_mut().entity_def = Some(EntityDef::Value(value));
					self.state = State::Doctype(DoctypeState::Ent(EntState::AfterValue));
					Ok(Step::Done(Lexed::Proceed))
				}
				'&' => {
					self.state = State::Doctype(DoctypeState::Ent(EntState::ValueAmp(delim)));
					Ok(Step::Done(Lexed::Proceed))
				}
				ch if !is_xml_char(ch) => Err(Error::NotWellFormed(WFError::InvalidChar(
					ERRCTX_ENTITY_DECL,
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
			EntState::ValueAmp(delim) => match ch {
				'#' => {
					self.swap_scratchpad();
					self.state = State::Reference {
						ctx: ERRCTX_ENTITY_DECL,
						ret: RefReturnState::EntityValue(delim),
						kind: RefKind::Char(CharRefRadix::Decimal),
					};
					Ok(Step::Done(Lexed::Proceed))
				}
				_ => {
					self.check_accumulator_length()?;
					self.prep_scratchpad();
					self.scratchpad.push('&');
					self.state = State::Doctype(DoctypeState::Ent(EntState::Value(delim)));
					Ok(Step::Again)
				}
			},
			EntState::AfterValue => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'>' => {
					self.finish_entity();
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ENTITY_DECL,
					other,
					Some(&[">"]),
				))),
			},
			EntState::NdataKeyword => {
				if ch.is_ascii_alphabetic() {
					self.push_keyword_char(ch)?;
					return Ok(Step::Done(Lexed::Proceed));
				}
				let word = self.flush_scratchpad();
				if word != "NDATA" {
					return Err(Error::UnknownToken(word));
				}
				if !is_space(ch) {
					return Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ENTITY_DECL,
						ch,
						Some(&["whitespace"]),
					)));
				}
				self.state = State::Doctype(DoctypeState::Ent(EntState::NdataName));
				Ok(Step::Done(Lexed::Proceed))
			}
			EntState::NdataName => {
				if self.scratchpad.len() == 0 {
					return if is_space(ch) {
						Ok(Step::Done(Lexed::Proceed))
					} else if is_name_start_char(ch) {
						self.prep_scratchpad();
						self.scratchpad.push(ch);
						Ok(Step::Done(Lexed::Proceed))
					} else {
						Err(Error::NotWellFormed(WFError::UnexpectedChar(
							ERRCTX_ENTITY_DECL,
							ch,
							Some(&["name"]),
						)))
					};
				}
				if is_name_char(ch) {
					self.check_accumulator_length()?;
					self.scratchpad.push(ch);
					return Ok(Step::Done(Lexed::Proceed));
				}
				let name = self.flush_scratchpad_as_name();
				self.dtd_mut().ndata = Some(name);
				match ch {
					ch if is_space(ch) => {
						self.state = State::Doctype(DoctypeState::Ent(EntState::AfterNdata));
						Ok(Step::Done(Lexed::Proceed))
					}
					'>' => {
						self.finish_entity();
						Ok(Step::Done(Lexed::Proceed))
					}
					other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
						ERRCTX_ENTITY_DECL,
						other,
						Some(&["whitespace", ">"]),
					))),
				}
			}
			EntState::AfterNdata => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'>' => {
					self.finish_entity();
					Ok(Step::Done(Lexed::Proceed))
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_ENTITY_DECL,
					other,
					Some(&[">"]),
				))),
			},
		}
	}

	pub(super) fn lex_doctype(&mut self, state: DoctypeState, ch: char) -> Result<Step> {
		match state {
			DoctypeState::Keyword => self.lex_doctype_keyword(ch),
			DoctypeState::Name => self.lex_doctype_name(ch),
			DoctypeState::AfterName => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'[' => {
					self.to_subset();
					Ok(Step::Done(Lexed::Proceed))
				}
				'>' => Ok(Step::Done(self.emit_doctype())),
				ch if ch.is_ascii_alphabetic() => {
					self.drop_scratchpad();
					self.state = State::Doctype(DoctypeState::ExtIdKeyword(ExtIdCtx::Doctype));
					Ok(Step::Again)
				}
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_DOCTYPE,
					other,
					Some(&["SYSTEM", "PUBLIC", "[", ">"]),
				))),
			},
			DoctypeState::ExtIdKeyword(..)
			| DoctypeState::ExtIdSpace(..)
			| DoctypeState::PubidLit(..)
			| DoctypeState::AfterPubid(..)
			| DoctypeState::AfterPubidBlank(..)
			| DoctypeState::SysLit(..)
			| DoctypeState::AfterExtId(..)
			| DoctypeState::AfterExtIdBlank(..) => self.lex_extid(state, ch),
			DoctypeState::Subset(substate) => self.lex_subset(substate, ch),
			DoctypeState::AfterSubset => match ch {
				ch if is_space(ch) => Ok(Step::Done(Lexed::Proceed)),
				'>' => Ok(Step::Done(self.emit_doctype())),
				other => Err(Error::NotWellFormed(WFError::UnexpectedChar(
					ERRCTX_DOCTYPE,
					other,
					Some(&[">"]),
				))),
			},
			DoctypeState::DeclKeyword => self.lex_decl_keyword(ch),
			DoctypeState::DeclName(kind) => self.lex_decl_name(kind, ch),
			DoctypeState::PeRef => self.lex_pe_ref(ch),
			DoctypeState::Cs(substate) => self.lex_contentspec(substate, ch),
			DoctypeState::Att(substate) => self.lex_attlist(substate, ch),
			DoctypeState::Ent(substate) => self.lex_entity(substate, ch),
		}
	}
}
