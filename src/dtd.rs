/*!
# Data model for document type declarations

These types carry the parsed form of a `<!DOCTYPE …>` declaration, including
the declarations of its internal subset in lexical order. The parser performs
no validation against the DTD; it merely reports its contents.

All types implement [`std::fmt::Display`], producing the canonical XML
serialization of the respective declaration. This is used by the
[`writer`](crate::writer) to round-trip doctype events.
*/
use std::fmt;

use crate::strings::{CData, Name};

/// Parsed `<!DOCTYPE …>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Dtd {
	/// Name of the document type (the declared root element).
	///
	/// `None` only for the synthetic result of
	/// [`parse_dtd`](crate::parse_dtd), which parses a bare internal subset
	/// without the surrounding declaration.
	pub name: Option<Name>,
	/// External identifier, if the declaration carries one.
	pub external_id: Option<ExternalId>,
	/// Declarations of the internal subset, in lexical order.
	pub internal_subset: Vec<IntSubset>,
}

/// External identifier of a doctype, entity or notation declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalId {
	/// `SYSTEM "…"`
	System(CData),
	/// `PUBLIC "…" "…"`
	///
	/// The system part is optional only in notation declarations.
	Public(CData, Option<CData>),
}

/// A single declaration inside the internal subset.
#[derive(Debug, Clone, PartialEq)]
pub enum IntSubset {
	/// `<!ELEMENT name contentspec>`
	Element(Name, ContentSpec),
	/// `<!ATTLIST name attdefs…>`
	AttList(Name, Vec<AttDef>),
	/// `<!ENTITY …>`
	Entity(EntityDecl),
	/// `<!NOTATION name externalid>`
	Notation(Name, ExternalId),
	/// `%name;` at the top level of the subset
	DeclSect(Name),
	/// `<?target data?>`
	Pi(Name, CData),
	/// `<!-- … -->`
	Comment(CData),
}

/// Content specification of an element type declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSpec {
	/// `EMPTY`
	Empty,
	/// `ANY`
	Any,
	/// `(#PCDATA | name | …)*`; the names are the non-`#PCDATA`
	/// alternatives, possibly none.
	Mixed(Vec<Name>),
	/// An element content model; the particle is always a group.
	Children(ContentParticle),
}

/// A content particle of an element content model.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentParticle {
	pub kind: CpKind,
	pub rep: Repetition,
}

/// Shape of a content particle.
#[derive(Debug, Clone, PartialEq)]
pub enum CpKind {
	/// A plain element name.
	Name(Name),
	/// `( cp | cp | … )`
	Choice(Vec<ContentParticle>),
	/// `( cp , cp , … )`
	Seq(Vec<ContentParticle>),
}

/// Repetition marker trailing a content particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
	/// no marker
	One,
	/// `?`
	Opt,
	/// `*`
	Star,
	/// `+`
	Plus,
}

/// A single attribute definition inside an `<!ATTLIST …>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttDef {
	pub name: Name,
	pub atttype: AttType,
	pub default: DefaultDecl,
}

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttType {
	Cdata,
	Id,
	IdRef,
	IdRefs,
	Entity,
	Entities,
	NmToken,
	NmTokens,
	/// `NOTATION (name | …)`
	Notation(Vec<Name>),
	/// `(nmtoken | …)`; nmtokens need not be valid names, so they are
	/// carried as character data.
	Enumeration(Vec<CData>),
}

/// Default declaration of an attribute definition.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultDecl {
	/// `#REQUIRED`
	Required,
	/// `#IMPLIED`
	Implied,
	/// `#FIXED "…"`
	Fixed(CData),
	/// a bare default value
	Default(CData),
}

/// Parsed `<!ENTITY …>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecl {
	pub name: Name,
	/// True for parameter entities (`<!ENTITY % name …>`).
	pub parameter: bool,
	pub def: EntityDef,
}

/// Definition part of an entity declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDef {
	/// A quoted entity value. Character references are expanded; general
	/// and parameter entity references are carried verbatim.
	Value(CData),
	/// An external identifier, optionally with an `NDATA` notation name.
	External(ExternalId, Option<Name>),
}

fn fmt_quoted(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
	// the parser rejects literals containing both quote kinds nowhere, so
	// pick the delimiter which does not occur in the data
	if s.contains('"') {
		write!(f, "'{}'", s)
	} else {
		write!(f, "\"{}\"", s)
	}
}

impl fmt::Display for ExternalId {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::System(sysid) => {
				f.write_str("SYSTEM ")?;
				fmt_quoted(f, sysid)
			}
			Self::Public(pubid, sysid) => {
				f.write_str("PUBLIC ")?;
				fmt_quoted(f, pubid)?;
				if let Some(sysid) = sysid {
					f.write_str(" ")?;
					fmt_quoted(f, sysid)?;
				}
				Ok(())
			}
		}
	}
}

impl fmt::Display for Repetition {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::One => Ok(()),
			Self::Opt => f.write_str("?"),
			Self::Star => f.write_str("*"),
			Self::Plus => f.write_str("+"),
		}
	}
}

impl fmt::Display for ContentParticle {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			CpKind::Name(name) => write!(f, "{}", name)?,
			CpKind::Choice(items) => {
				f.write_str("(")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str("|")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str(")")?;
			}
			CpKind::Seq(items) => {
				f.write_str("(")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str(")")?;
			}
		}
		write!(f, "{}", self.rep)
	}
}

impl fmt::Display for ContentSpec {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Empty => f.write_str("EMPTY"),
			Self::Any => f.write_str("ANY"),
			Self::Mixed(names) => {
				f.write_str("(#PCDATA")?;
				for name in names.iter() {
					write!(f, "|{}", name)?;
				}
				if names.len() > 0 {
					f.write_str(")*")
				} else {
					f.write_str(")")
				}
			}
			Self::Children(cp) => write!(f, "{}", cp),
		}
	}
}

impl fmt::Display for AttType {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Cdata => f.write_str("CDATA"),
			Self::Id => f.write_str("ID"),
			Self::IdRef => f.write_str("IDREF"),
			Self::IdRefs => f.write_str("IDREFS"),
			Self::Entity => f.write_str("ENTITY"),
			Self::Entities => f.write_str("ENTITIES"),
			Self::NmToken => f.write_str("NMTOKEN"),
			Self::NmTokens => f.write_str("NMTOKENS"),
			Self::Notation(names) => {
				f.write_str("NOTATION (")?;
				for (i, name) in names.iter().enumerate() {
					if i > 0 {
						f.write_str("|")?;
					}
					write!(f, "{}", name)?;
				}
				f.write_str(")")
			}
			Self::Enumeration(tokens) => {
				f.write_str("(")?;
				for (i, token) in tokens.iter().enumerate() {
					if i > 0 {
						f.write_str("|")?;
					}
					write!(f, "{}", token)?;
				}
				f.write_str(")")
			}
		}
	}
}

impl fmt::Display for DefaultDecl {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Required => f.write_str("#REQUIRED"),
			Self::Implied => f.write_str("#IMPLIED"),
			Self::Fixed(v) => {
				f.write_str("#FIXED ")?;
				fmt_quoted(f, v)
			}
			Self::Default(v) => fmt_quoted(f, v),
		}
	}
}

impl fmt::Display for IntSubset {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Element(name, spec) => write!(f, "<!ELEMENT {} {}>", name, spec),
			Self::AttList(name, defs) => {
				write!(f, "<!ATTLIST {}", name)?;
				for def in defs.iter() {
					write!(f, " {} {} {}", def.name, def.atttype, def.default)?;
				}
				f.write_str(">")
			}
			Self::Entity(decl) => {
				f.write_str("<!ENTITY ")?;
				if decl.parameter {
					f.write_str("% ")?;
				}
				write!(f, "{} ", decl.name)?;
				match &decl.def {
					EntityDef::Value(v) => fmt_quoted(f, v)?,
					EntityDef::External(extid, ndata) => {
						write!(f, "{}", extid)?;
						if let Some(ndata) = ndata {
							write!(f, " NDATA {}", ndata)?;
						}
					}
				}
				f.write_str(">")
			}
			Self::Notation(name, extid) => write!(f, "<!NOTATION {} {}>", name, extid),
			Self::DeclSect(name) => write!(f, "%{};", name),
			Self::Pi(target, data) => {
				if data.len() > 0 {
					write!(f, "<?{} {}?>", target, data)
				} else {
					write!(f, "<?{}?>", target)
				}
			}
			Self::Comment(data) => write!(f, "<!--{}-->", data),
		}
	}
}

impl fmt::Display for Dtd {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str("<!DOCTYPE")?;
		if let Some(name) = &self.name {
			write!(f, " {}", name)?;
		}
		if let Some(extid) = &self.external_id {
			write!(f, " {}", extid)?;
		}
		if self.internal_subset.len() > 0 {
			f.write_str(" [")?;
			for item in self.internal_subset.iter() {
				write!(f, "{}", item)?;
			}
			f.write_str("]")?;
		}
		f.write_str(">")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::convert::TryInto;

	fn name(s: &str) -> Name {
		s.try_into().unwrap()
	}

	fn cdata(s: &str) -> CData {
		s.try_into().unwrap()
	}

	#[test]
	fn contentspec_display_roundtrips_the_grammar() {
		let spec = ContentSpec::Children(ContentParticle {
			kind: CpKind::Seq(vec![
				ContentParticle {
					kind: CpKind::Name(name("head")),
					rep: Repetition::Opt,
				},
				ContentParticle {
					kind: CpKind::Choice(vec![
						ContentParticle {
							kind: CpKind::Name(name("p")),
							rep: Repetition::One,
						},
						ContentParticle {
							kind: CpKind::Name(name("ul")),
							rep: Repetition::One,
						},
					]),
					rep: Repetition::Star,
				},
			]),
			rep: Repetition::One,
		});
		assert_eq!(format!("{}", spec), "(head?,(p|ul)*)");
	}

	#[test]
	fn mixed_display_adds_star_only_with_names() {
		assert_eq!(format!("{}", ContentSpec::Mixed(vec![])), "(#PCDATA)");
		assert_eq!(
			format!("{}", ContentSpec::Mixed(vec![name("q")])),
			"(#PCDATA|q)*"
		);
	}

	#[test]
	fn intsubset_display() {
		let item = IntSubset::AttList(
			name("p"),
			vec![AttDef {
				name: name("id"),
				atttype: AttType::Id,
				default: DefaultDecl::Required,
			}],
		);
		assert_eq!(format!("{}", item), "<!ATTLIST p id ID #REQUIRED>");

		let item = IntSubset::Entity(EntityDecl {
			name: name("chap1"),
			parameter: false,
			def: EntityDef::External(
				ExternalId::System(cdata("chap1.xml")),
				None,
			),
		});
		assert_eq!(format!("{}", item), "<!ENTITY chap1 SYSTEM \"chap1.xml\">");
	}

	#[test]
	fn dtd_display() {
		let dtd = Dtd {
			name: Some(name("doc")),
			external_id: Some(ExternalId::Public(
				cdata("-//EXAMPLE//DTD doc//EN"),
				Some(cdata("doc.dtd")),
			)),
			internal_subset: vec![IntSubset::DeclSect(name("pe"))],
		};
		assert_eq!(
			format!("{}", dtd),
			"<!DOCTYPE doc PUBLIC \"-//EXAMPLE//DTD doc//EN\" \"doc.dtd\" [%pe;]>"
		);
	}
}
