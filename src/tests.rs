use super::*;

use bytes::Bytes;

// note that these are integration smoketests over the full stack; the
// individual layers are tested extensively in their modules.

fn drain_all(p: &mut Parser) -> Result<Vec<Event>> {
	let mut out = Vec::new();
	loop {
		match p.read()? {
			Event::EndOfData => return Ok(out),
			Event::EndOfBuffer => panic!("unexpected buffer starvation"),
			ev => out.push(ev),
		}
	}
}

fn parse_all(doc: &[u8]) -> Result<Vec<Event>> {
	let mut p = Parser::new();
	p.feed(doc.to_vec());
	p.feed_eof();
	drain_all(&mut p)
}

#[test]
fn parser_can_read_xml_document() {
	let doc = b"<?xml version='1.0'?>\n<root a=\"foo\" b='bar'><child>with some text</child></root>";
	let out = parse_all(doc).unwrap();

	let mut iter = out.iter();
	match iter.next().unwrap() {
		Event::Whitespace(ws) => {
			assert_eq!(ws, "\n");
		}
		other => panic!("unexpected event: {:?}", other),
	};
	match iter.next().unwrap() {
		Event::StartElement(name, attrs) => {
			assert_eq!(name, "root");
			assert_eq!(attrs.len(), 2);
			assert_eq!(attrs[0], ("a".try_into().unwrap(), "foo".try_into().unwrap()));
			assert_eq!(attrs[1], ("b".try_into().unwrap(), "bar".try_into().unwrap()));
		}
		other => panic!("unexpected event: {:?}", other),
	};
	match iter.next().unwrap() {
		Event::StartElement(name, attrs) => {
			assert_eq!(name, "child");
			assert_eq!(attrs.len(), 0);
		}
		other => panic!("unexpected event: {:?}", other),
	};
	match iter.next().unwrap() {
		Event::Text(text) => {
			assert_eq!(text, "with some text");
		}
		other => panic!("unexpected event: {:?}", other),
	};
	match iter.next().unwrap() {
		Event::EndElement(name) => {
			assert_eq!(name, "child");
		}
		other => panic!("unexpected event: {:?}", other),
	};
	match iter.next().unwrap() {
		Event::EndElement(name) => {
			assert_eq!(name, "root");
		}
		other => panic!("unexpected event: {:?}", other),
	};
	assert!(iter.next().is_none());
}

#[test]
fn mixed_content_with_references_comments_and_cdata() {
	let out = parse_all(b"<a>x&amp;y<!--c--><![CDATA[<z>]]></a>").unwrap();
	assert_eq!(out.len(), 5);
	assert!(matches!(&out[0], Event::StartElement(name, attrs) if name == "a" && attrs.len() == 0));
	assert!(matches!(&out[1], Event::Text(t) if t == "x&y"));
	assert!(matches!(&out[2], Event::Comment(c) if c == "c"));
	assert!(matches!(&out[3], Event::Cdata(c) if c == "<z>"));
	assert!(matches!(&out[4], Event::EndElement(name) if name == "a"));
}

#[test]
fn carriage_returns_are_folded_before_the_grammar_sees_them() {
	let out = parse_all(b"<a>\r\nhi\r</a>").unwrap();
	assert!(matches!(&out[1], Event::Text(t) if t == "\nhi\n"));

	// also inside attribute values, comments and CDATA sections
	let out = parse_all(b"<a x='p\r\nq'><!--c\rd--><![CDATA[e\r\nf]]></a>").unwrap();
	assert!(matches!(&out[0], Event::StartElement(_, attrs) if attrs[0].1 == "p\nq"));
	assert!(matches!(&out[1], Event::Comment(c) if c == "c\nd"));
	assert!(matches!(&out[2], Event::Cdata(c) if c == "e\nf"));
}

#[test]
fn cdata_end_sequence_in_text_is_fatal() {
	match parse_all(b"<a>]]></a>") {
		Err(Error::NotWellFormed(error::WFError::InvalidSyntax(msg))) => {
			assert_eq!(msg, "']]>' is not allowed in text");
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

#[test]
fn chunked_feeding_suspends_and_resumes() {
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
fn chunk_boundaries_do_not_affect_the_event_stream() {
	let doc: &[u8] = "<?xml version='1.0' encoding='utf-8'?>\n<r a='1&#x41;'>s\u{fc}\u{1f389} &quot;text&quot;<e/><![CDATA[+]]]></r>\n".as_bytes();
	let reference = parse_all(doc).unwrap();
	for chunk_size in [1usize, 2, 3, 5, 7, 11, 64] {
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
				Event::EndOfData => break,
				ev => out.push(ev),
			}
		}
		let coalesced = coalesce(out);
		assert_eq!(coalesced, reference, "chunk size {}", chunk_size);
	}
}

fn coalesce(evs: Vec<Event>) -> Vec<Event> {
	let mut out: Vec<Event> = Vec::new();
	for ev in evs {
		let merged = match (out.last_mut(), &ev) {
			(Some(Event::Text(prev)), Event::Text(next))
			| (Some(Event::Cdata(prev)), Event::Cdata(next))
			| (Some(Event::Whitespace(prev)), Event::Whitespace(next)) => {
				let mut s = String::from(prev.clone());
				s.push_str(next.as_str());
				*prev = s.try_into().unwrap();
				true
			}
			_ => false,
		};
		if !merged {
			out.push(ev);
		}
	}
	out
}

#[test]
fn doctype_with_internal_subset_and_root() {
	let out = parse_all(
		b"<!DOCTYPE x [<!ELEMENT p (#PCDATA|q)*><!ATTLIST p id ID #REQUIRED>]><x/>",
	)
	.unwrap();
	assert_eq!(out.len(), 2);
	match &out[0] {
		Event::Doctype(d) => {
			assert_eq!(d.name.as_ref().unwrap(), "x");
			assert_eq!(
				d.internal_subset[0],
				dtd::IntSubset::Element(
					"p".try_into().unwrap(),
					dtd::ContentSpec::Mixed(vec!["q".try_into().unwrap()])
				)
			);
			assert_eq!(
				d.internal_subset[1],
				dtd::IntSubset::AttList(
					"p".try_into().unwrap(),
					vec![dtd::AttDef {
						name: "id".try_into().unwrap(),
						atttype: dtd::AttType::Id,
						default: dtd::DefaultDecl::Required,
					}]
				)
			);
		}
		other => panic!("unexpected event: {:?}", other),
	}
	assert!(matches!(&out[1], Event::EmptyElement(name, _) if name == "x"));
}

#[test]
fn roundtrip_through_the_encoder() {
	use bytes::BytesMut;
	let doc: &[u8] = b"<?xml version='1.0'?><!DOCTYPE r [<!ELEMENT r (a|b)*>]>\n<r a=\"1\" b='2'>text<sub x='&lt;'/><!--c--><?pi d?><![CDATA[raw]]></r>\n";
	let evs = parse_all(doc).unwrap();
	let mut enc = Encoder::new();
	let mut bytes = BytesMut::new();
	for ev in evs.iter() {
		enc.encode(ev, &mut bytes).unwrap();
	}
	let evs2 = parse_all(&bytes[..]).unwrap();
	assert_eq!(evs, evs2);
}

#[test]
fn split_name_exposes_prefixes() {
	let out = parse_all(b"<ns:a ns:x='1'/>").unwrap();
	match &out[0] {
		Event::EmptyElement(name, attrs) => {
			assert_eq!(name.split_name(), (Some("ns"), "a"));
			assert_eq!(attrs[0].0.split_name(), (Some("ns"), "x"));
		}
		other => panic!("unexpected event: {:?}", other),
	}
}
