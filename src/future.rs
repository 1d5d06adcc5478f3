/*!
# Tokio-based asynchronous parsing

Available with the `async` feature. The [`AsyncParser`] wraps a
[`tokio::io::AsyncBufRead`] and drives a [`Parser`] with whatever bytes the
reader can offer, yielding to the executor instead of blocking whenever the
reader has no data.
*/
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncBufRead;

#[cfg(feature = "stream")]
use futures_core::stream::Stream;

use crate::driver::Parser;
use crate::error::Result;
use crate::lexer::Event;

use pin_project_lite::pin_project;

pin_project! {
	pub struct ReadEvent<T: ?Sized>{
		#[pin]
		inner: T,
	}
}

impl<T: AsyncEventRead + Unpin> Future for ReadEvent<T> {
	type Output = Result<Option<Event>>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.project().inner.poll_read(cx)
	}
}

pin_project! {
	pub struct ReadAll<T: ?Sized, F> {
		cb: F,
		#[pin]
		inner: T,
	}
}

impl<T: AsyncEventRead + Unpin, F: FnMut(Event) -> () + Send> Future for ReadAll<T, F> {
	type Output = Result<()>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
		let mut this = self.project();
		loop {
			match this.inner.as_mut().poll_read(cx) {
				Poll::Ready(Ok(Some(ev))) => {
					(this.cb)(ev);
				}
				Poll::Ready(Ok(None)) => return Poll::Ready(Ok(())),
				Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}

/**
Asynchronous source of individual XML events

This trait is analogous to the [`tokio::io::AsyncRead`] trait, but for
[`Event`]s instead of bytes. Usually one interacts with it through the
helpers in [`AsyncEventReadExt`].
*/
pub trait AsyncEventRead {
	/// Poll for a single event from the parser.
	///
	/// `Ready(Ok(None))` signals the end of the document.
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>>;
}

impl<T: AsyncEventRead + Unpin + ?Sized> AsyncEventRead for &mut T {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>> {
		let this: &mut &mut T = Pin::into_inner(self);
		let this: &mut T = *this;
		let this = Pin::new(this);
		this.poll_read(cx)
	}
}

/**
Helper trait for asynchronous sources of individual XML events

This helper trait is automatically implemented for all [`AsyncEventRead`].
*/
pub trait AsyncEventReadExt: AsyncEventRead {
	/// Read a single event from the parser.
	///
	/// If the end of the document has been reached, `None` is returned.
	///
	/// Equivalent to:
	///
	/// ```ignore
	/// async fn read(&mut self) -> Result<Option<Event>>;
	/// ```
	fn read(&mut self) -> ReadEvent<&mut Self> {
		ReadEvent { inner: self }
	}

	/// Read all events which can be produced from the data source.
	///
	/// The given `cb` is invoked for each event.
	///
	/// Equivalent to:
	///
	/// ```ignore
	/// async fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	///        where F: FnMut(Event) -> () + Send
	/// ```
	fn read_all<F>(&mut self, cb: F) -> ReadAll<&mut Self, F> {
		ReadAll { inner: self, cb }
	}
}

impl<T: AsyncEventRead> AsyncEventReadExt for T {}

pin_project! {
	/**
	# Asynchronous driver for the parser

	Wraps a [`tokio::io::AsyncBufRead`] and a [`Parser`]; bytes are pulled
	from the reader on demand and pushed into the parser.
	*/
	pub struct AsyncParser<T> {
		#[pin]
		inner: T,
		parser: Parser,
	}
}

impl<T: AsyncBufRead> AsyncParser<T> {
	/// Create a new parser with default options, wrapping the given
	/// reader.
	pub fn new(inner: T) -> Self {
		Self::wrap(inner, Parser::new())
	}

	/// Create a fully customized parser wrapping the given reader.
	pub fn wrap(inner: T, parser: Parser) -> Self {
		Self {
			inner: inner,
			parser: parser,
		}
	}

	/// Decompose into the reader and the parser.
	pub fn into_inner(self) -> (T, Parser) {
		(self.inner, self.parser)
	}

	/// Access the inner AsyncBufRead
	pub fn get_inner(&self) -> &T {
		&self.inner
	}

	/// Access the parser
	pub fn get_parser(&self) -> &Parser {
		&self.parser
	}

	/// Access the parser, mutably
	pub fn get_parser_mut(&mut self) -> &mut Parser {
		&mut self.parser
	}
}

impl<T: AsyncBufRead> AsyncEventRead for AsyncParser<T> {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>> {
		let mut this = self.project();
		loop {
			if this.parser.is_finished() {
				return Poll::Ready(Ok(None));
			}
			match this.parser.read() {
				Ok(Event::EndOfBuffer) => (),
				Ok(Event::EndOfData) => return Poll::Ready(Ok(None)),
				Ok(ev) => return Poll::Ready(Ok(Some(ev))),
				Err(e) => return Poll::Ready(Err(e)),
			}
			// the parser is starved, ask the reader for more
			let buf = match this.inner.as_mut().poll_fill_buf(cx) {
				Poll::Pending => return Poll::Pending,
				Poll::Ready(Ok(buf)) => buf,
				Poll::Ready(Err(e)) => return Poll::Ready(Err(e.into())),
			};
			if buf.len() == 0 {
				this.parser.feed_eof();
			} else {
				let n = buf.len();
				this.parser.feed(Bytes::copy_from_slice(buf));
				this.inner.as_mut().consume(n);
			}
		}
	}
}

#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(all(feature = "stream", feature = "async"))))]
impl<T: AsyncBufRead> Stream for AsyncParser<T> {
	type Item = Result<Event>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		match self.poll_read(cx) {
			Poll::Pending => Poll::Pending,
			Poll::Ready(Ok(Some(v))) => Poll::Ready(Some(Ok(v))),
			Poll::Ready(Ok(None)) => Poll::Ready(None),
			Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn asyncparser_can_read_xml_document() {
		let doc = b"<?xml version='1.0'?><hello a='1'>World!</hello>";
		let mut r = &doc[..];
		let mut ap = AsyncParser::new(&mut r);
		let mut out = Vec::new();
		ap.read_all(|ev| out.push(ev)).await.unwrap();
		assert_eq!(out.len(), 3);
		assert!(matches!(&out[0], Event::StartElement(name, attrs) if name == "hello" && attrs.len() == 1));
		assert!(matches!(&out[1], Event::Text(t) if t == "World!"));
		assert!(matches!(&out[2], Event::EndElement(name) if name == "hello"));
	}

	#[tokio::test]
	async fn asyncparser_can_handle_chunked_input() {
		let doc = b"<?xml version='1.0'?><root><child>with some text</child></root>";
		let mut r = &doc[..];
		let mut r = tokio::io::BufReader::with_capacity(4, &mut r);
		let mut ap = AsyncParser::new(&mut r);
		let mut texts = Vec::new();
		ap.read_all(|ev| {
			if let Event::Text(t) = ev {
				texts.push(String::from(t));
			}
		})
		.await
		.unwrap();
		assert_eq!(texts.concat(), "with some text");
	}

	#[tokio::test]
	async fn asyncparser_reports_eof_with_none() {
		let doc = b"<a/>";
		let mut r = &doc[..];
		let mut ap = AsyncParser::new(&mut r);
		assert!(matches!(
			ap.read().await.unwrap(),
			Some(Event::EmptyElement(..))
		));
		assert!(ap.read().await.unwrap().is_none());
		assert!(ap.read().await.unwrap().is_none());
	}
}
