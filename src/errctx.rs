//! Error context constants
//!
//! These are used to give errors a hint about the grammatical construct in
//! which they were encountered. The constants are embedded in error values
//! and interpolated into their messages; user code should not match on them.

pub const ERRCTX_UNKNOWN: &'static str = "in unknown context";
pub const ERRCTX_DOCUMENT: &'static str = "at document level";
pub const ERRCTX_DOCBEGIN: &'static str = "at beginning of document";
pub const ERRCTX_TEXT: &'static str = "in text";
pub const ERRCTX_NAME: &'static str = "in name";
pub const ERRCTX_NAMESTART: &'static str = "at start of name";
pub const ERRCTX_ELEMENT: &'static str = "in element";
pub const ERRCTX_ELEMENT_FOOT: &'static str = "in element footer";
pub const ERRCTX_ELEMENT_CLOSE: &'static str = "at element close";
pub const ERRCTX_ATTVAL: &'static str = "in attribute value";
pub const ERRCTX_REF: &'static str = "in reference";
pub const ERRCTX_CDATA_SECTION: &'static str = "in CDATA section";
pub const ERRCTX_CDATA_SECTION_START: &'static str = "at CDATA section start";
pub const ERRCTX_COMMENT: &'static str = "in comment";
pub const ERRCTX_PI: &'static str = "in processing instruction";
pub const ERRCTX_XML_DECL: &'static str = "in XML declaration";
pub const ERRCTX_XML_DECL_END: &'static str = "at end of XML declaration";
pub const ERRCTX_DOCTYPE: &'static str = "in document type declaration";
pub const ERRCTX_INT_SUBSET: &'static str = "in internal subset";
pub const ERRCTX_ELEMENT_DECL: &'static str = "in element type declaration";
pub const ERRCTX_CONTENTSPEC: &'static str = "in content specification";
pub const ERRCTX_ATTLIST_DECL: &'static str = "in attribute-list declaration";
pub const ERRCTX_ENTITY_DECL: &'static str = "in entity declaration";
pub const ERRCTX_NOTATION_DECL: &'static str = "in notation declaration";
pub const ERRCTX_PUBID: &'static str = "in public identifier";
pub const ERRCTX_SYSID: &'static str = "in system identifier";
pub const ERRCTX_DECODER: &'static str = "in multi-byte sequence";
