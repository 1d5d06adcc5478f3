/*!
# Streaming, incremental XML 1.0 parsing

This crate provides pull-based parsing of XML 1.0 documents from byte
streams which arrive in arbitrarily sized chunks.

## Features

* Fully incremental: the parser suspends cleanly at any byte boundary
  (including inside multi-byte encoded codepoints) and resumes without loss
  or duplication when more input is fed
* Events, not trees: the document arrives as a flat sequence of
  [`Event`]s in document order
* DOCTYPE support: the internal subset is parsed into a structured
  [`Dtd`](dtd::Dtd), including element content models, attribute lists,
  entity and notation declarations
* Built-in decoders for UTF-8, UTF-16 (BE/LE), UCS-4 (BE/LE), US-ASCII and
  ISO 8859-1, with autodetection from the first four bytes and mid-stream
  switching driven by the XML declaration
* Embedder hooks for entity resolution and unknown encodings
* Strict: the first well-formedness error ends the parse
* Streamed encoding of events back to XML via [`Encoder`]
* Tokio-based asynchronicity supported via the `async` feature and
  [`AsyncParser`]

## Example

```
use sxml::{Event, Parser};
let mut p = Parser::new();
p.feed(&b"<?xml version='1.0'?><hello>World!</hello>"[..]);
p.feed_eof();
loop {
	match p.read().unwrap() {
		Event::EndOfData => break,
		ev => println!("got event: {:?}", ev),
	}
}
```

## Chunked input

Input is fed with [`Parser::feed`]; [`Parser::read`] returns
[`Event::EndOfBuffer`] whenever the buffered input is exhausted before the
next event is complete. Alternatively, [`Parser::parse`] combines feeding
and reading into a single call. [`Parser::feed_eof`] marks the end of the
document, after which the final events and [`Event::EndOfData`] are
delivered.

## Scope

The parser is event-only: it builds no tree, resolves no namespaces (see
[`NameStr::split_name`] for the only concession), performs no validation
against the DTD and fetches no external entities. Nesting of elements is
reported faithfully but names of start and end tags are not matched against
each other; consumers which need that guarantee check it themselves.
*/
#![cfg_attr(docsrs, feature(doc_cfg))]

mod bufq;
pub mod decode;
mod driver;
pub mod dtd;
mod errctx;
pub mod error;
pub mod lexer;
pub mod selectors;
pub mod strings;
pub mod writer;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use bufq::BufferQueue;
#[doc(inline)]
pub use decode::{ByteDecoder, Encoding};
#[doc(inline)]
pub use driver::{parse_dtd, EncodingHandler, EntityResolver, Parser, ParserOptions};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use lexer::{Attribute, Event, Lexer, LexerOptions, StepInput};
pub use strings::{CData, CDataStr, Name, NameStr};
#[doc(inline)]
pub use writer::Encoder;

#[cfg(feature = "async")]
mod future;

#[cfg(feature = "async")]
#[doc(inline)]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use future::{AsyncEventRead, AsyncEventReadExt, AsyncParser};

/// Package version
pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
