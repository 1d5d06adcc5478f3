/*!
# Serialization of events back to XML

The [`Encoder`] turns a stream of [`Event`]s back into XML 1.0 bytes. It is
the inverse of the parser up to insignificant detail: whitespace between
attributes, the choice of quote characters and the splitting of text runs
are not preserved, the *logical* document is.

Output is appended to a caller-supplied [`BytesMut`], so a single buffer
can collect many events before being handed to a socket or file.
*/
use bytes::{BufMut, BytesMut};

use crate::lexer::{Attribute, Event};
use crate::strings::{CDataStr, NameStr};

/**
# Streamed XML 1.0 encoder

Encodes events into their XML wire form. The encoder is stateless apart
from being a handle; it performs no well-formedness bookkeeping beyond the
escaping required to make the output re-parse to the same events.

## Example

```
use bytes::BytesMut;
use sxml::{Encoder, Event, Parser};
let mut p = Parser::new();
p.feed(&b"<a x='1'>2 &lt; 3</a>"[..]);
p.feed_eof();
let mut enc = Encoder::new();
let mut out = BytesMut::new();
loop {
	match p.read().unwrap() {
		Event::EndOfData => break,
		ev => enc.encode(&ev, &mut out).unwrap(),
	}
}
assert_eq!(&out[..], &b"<a x=\"1\">2 &lt; 3</a>"[..]);
```
*/
pub struct Encoder();

impl Encoder {
	pub fn new() -> Encoder {
		Encoder()
	}

	fn encode_text(&self, data: &CDataStr, out: &mut BytesMut) {
		for ch in data.chars() {
			match ch {
				'<' => out.put_slice(b"&lt;"),
				'>' => out.put_slice(b"&gt;"),
				'&' => out.put_slice(b"&amp;"),
				ch => {
					let mut buf = [0u8; 4];
					out.put_slice(ch.encode_utf8(&mut buf).as_bytes());
				}
			}
		}
	}

	fn encode_attribute_value(&self, data: &CDataStr, out: &mut BytesMut) {
		for ch in data.chars() {
			match ch {
				'<' => out.put_slice(b"&lt;"),
				'&' => out.put_slice(b"&amp;"),
				'"' => out.put_slice(b"&quot;"),
				ch => {
					let mut buf = [0u8; 4];
					out.put_slice(ch.encode_utf8(&mut buf).as_bytes());
				}
			}
		}
	}

	fn encode_attributes(&self, attrs: &[Attribute], out: &mut BytesMut) {
		for (name, value) in attrs.iter() {
			out.put_u8(b' ');
			out.put_slice(name.as_str().as_bytes());
			out.put_slice(b"=\"");
			self.encode_attribute_value(value, out);
			out.put_u8(b'"');
		}
	}

	fn encode_head(&self, name: &NameStr, attrs: &[Attribute], out: &mut BytesMut) {
		out.put_u8(b'<');
		out.put_slice(name.as_str().as_bytes());
		self.encode_attributes(attrs, out);
	}

	fn encode_cdata_section(&self, data: &CDataStr, out: &mut BytesMut) {
		// a `]]>` inside the data would end the section early; split the
		// section at each occurrence so that the delimiter never appears
		let mut rest = data.as_str();
		out.put_slice(b"<![CDATA[");
		while let Some(pos) = rest.find("]]>") {
			out.put_slice(rest[..pos + 2].as_bytes());
			out.put_slice(b"]]><![CDATA[");
			rest = &rest[pos + 2..];
		}
		out.put_slice(rest.as_bytes());
		out.put_slice(b"]]>");
	}

	/// Append the encoding of a single event to `out`.
	///
	/// [`Event::EndOfBuffer`] and [`Event::EndOfData`] have no
	/// representation and encode to nothing.
	pub fn encode(&mut self, ev: &Event, out: &mut BytesMut) -> crate::Result<()> {
		match ev {
			Event::StartElement(name, attrs) => {
				self.encode_head(name, attrs, out);
				out.put_u8(b'>');
			}
			Event::EmptyElement(name, attrs) => {
				self.encode_head(name, attrs, out);
				out.put_slice(b"/>");
			}
			Event::EndElement(name) => {
				out.put_slice(b"</");
				out.put_slice(name.as_str().as_bytes());
				out.put_u8(b'>');
			}
			Event::Text(data) => self.encode_text(data, out),
			Event::Whitespace(data) => out.put_slice(data.as_str().as_bytes()),
			Event::Cdata(data) => self.encode_cdata_section(data, out),
			Event::Pi(target, data) => {
				out.put_slice(b"<?");
				out.put_slice(target.as_str().as_bytes());
				if data.len() > 0 {
					out.put_u8(b' ');
					out.put_slice(data.as_str().as_bytes());
				}
				out.put_slice(b"?>");
			}
			Event::Comment(data) => {
				out.put_slice(b"<!--");
				out.put_slice(data.as_str().as_bytes());
				out.put_slice(b"-->");
			}
			Event::Doctype(dtd) => {
				out.put_slice(format!("{}", dtd).as_bytes());
			}
			Event::EndOfBuffer | Event::EndOfData => (),
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Parser;

	fn reparse(bytes: &[u8]) -> Vec<Event> {
		let mut p = Parser::new();
		p.feed(bytes.to_vec());
		p.feed_eof();
		let mut out = Vec::new();
		loop {
			match p.read().unwrap() {
				Event::EndOfData => return out,
				ev => out.push(ev),
			}
		}
	}

	fn encode_all(evs: &[Event]) -> BytesMut {
		let mut enc = Encoder::new();
		let mut out = BytesMut::new();
		for ev in evs.iter() {
			enc.encode(ev, &mut out).unwrap();
		}
		out
	}

	#[test]
	fn roundtrips_a_document() {
		let doc: &[u8] = b"<?xml version='1.0'?><!DOCTYPE r [<!ELEMENT r ANY>]><r a=\"x&amp;y\">t1<c/><!--hi--><![CDATA[<raw>]]></r>";
		let evs = reparse(doc);
		let encoded = encode_all(&evs);
		let evs2 = reparse(&encoded[..]);
		assert_eq!(evs, evs2);
	}

	#[test]
	fn escapes_text_and_attribute_values() {
		let evs = reparse(b"<a x='a&quot;b&lt;c'>1 &lt; 2 &amp; 3</a>");
		let encoded = encode_all(&evs);
		assert_eq!(
			&encoded[..],
			&b"<a x=\"a&quot;b&lt;c\">1 &lt; 2 &amp; 3</a>"[..]
		);
	}

	#[test]
	fn splits_cdata_sections_containing_the_end_delimiter() {
		use std::convert::TryInto;
		let mut enc = Encoder::new();
		let mut out = BytesMut::new();
		enc.encode(
			&Event::Cdata("a]]>b".try_into().unwrap()),
			&mut out,
		)
		.unwrap();
		assert_eq!(&out[..], &b"<![CDATA[a]]]]><![CDATA[>b]]>"[..]);
		let evs = reparse(&[&b"<x>"[..], &out[..], &b"</x>"[..]].concat());
		let text: String = evs
			.iter()
			.filter_map(|ev| match ev {
				Event::Cdata(t) => Some(t.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(text, "a]]>b");
	}

	#[test]
	fn doctype_roundtrip() {
		let doc: &[u8] = b"<!DOCTYPE d [<!ELEMENT doc (head?,(p|ul)*)><!ENTITY e 'v'><!NOTATION n PUBLIC 'p'>]><d/>";
		let evs = reparse(doc);
		let encoded = encode_all(&evs);
		let evs2 = reparse(&encoded[..]);
		assert_eq!(evs, evs2);
	}
}
