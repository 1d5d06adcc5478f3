/*!
# Queue for chunked byte input
*/
use std::collections::VecDeque;

use bytes::{Buf, Bytes};

/**
# Queue of byte chunks with an end-of-data marker

The `BufferQueue` holds the not-yet-consumed part of the byte stream handed
to the parser. Chunks are appended with [`BufferQueue::push()`] and consumed
byte-wise by the driver; a chunk is released as soon as it has been consumed
completely.

Once [`BufferQueue::push_eof()`] has been called, no further chunks can be
pushed and the depletion of the queue is to be interpreted as the end of the
document instead of a temporary starvation.

## Example

```
use sxml::BufferQueue;
let mut bq = BufferQueue::new();
bq.push(&b"foo"[..]);
assert_eq!(bq.len(), 3);
assert_eq!(bq.pop_byte(), Some(b'f'));
assert_eq!(bq.pop_byte(), Some(b'o'));
assert_eq!(bq.pop_byte(), Some(b'o'));
assert_eq!(bq.pop_byte(), None);
```
*/
pub struct BufferQueue {
	q: VecDeque<Bytes>,
	len: usize,
	eof: bool,
}

impl BufferQueue {
	/// Create a new, empty buffer queue.
	pub fn new() -> BufferQueue {
		BufferQueue {
			q: VecDeque::new(),
			len: 0,
			eof: false,
		}
	}

	/// Add the given chunk to the end of the queue.
	///
	/// Empty chunks are dropped silently.
	///
	/// # Panics
	///
	/// If [`BufferQueue::push_eof`] has been called.
	pub fn push<T: Into<Bytes>>(&mut self, new: T) {
		let new = new.into();
		if self.eof {
			panic!("cannot push behind eof");
		}
		if new.len() == 0 {
			return;
		}
		let new_len = match self.len.checked_add(new.len()) {
			None => panic!("length overflow"),
			Some(v) => v,
		};
		self.q.push_back(new);
		self.len = new_len;
	}

	/// Push an end-of-data marker to the queue.
	///
	/// After the marker has been pushed, it is not possible to push further
	/// chunks. Once the queue is then depleted, [`BufferQueue::pop_byte()`]
	/// returning `None` is final.
	pub fn push_eof(&mut self) {
		self.eof = true;
	}

	/// Return whether the end-of-data marker has been pushed already.
	///
	/// [`BufferQueue::push()`] will panic if this function returns true.
	pub fn eof_pushed(&self) -> bool {
		self.eof
	}

	/// Number of bytes which have been enqueued, but not consumed yet.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Take the next byte off the front of the queue.
	///
	/// Returns `None` when the queue is empty; whether that means
	/// end-of-data or merely starvation is decided by
	/// [`BufferQueue::eof_pushed()`].
	pub fn pop_byte(&mut self) -> Option<u8> {
		let front = self.q.front_mut()?;
		debug_assert!(front.len() > 0);
		let b = front[0];
		front.advance(1);
		if front.len() == 0 {
			self.q.pop_front();
		}
		self.len -= 1;
		Some(b)
	}

	/// Copy all unconsumed bytes into a single buffer, without consuming
	/// them.
	pub fn remaining(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.len);
		for chunk in self.q.iter() {
			out.extend_from_slice(&chunk[..]);
		}
		out
	}

	/// Drop all buffered contents immediately.
	///
	/// This resets the length to 0; the end-of-data marker is unaffected.
	pub fn clear(&mut self) {
		self.q.clear();
		self.len = 0;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bufq_len_grows_with_chunks() {
		let mut bq = BufferQueue::new();
		assert_eq!(bq.len(), 0);
		bq.push(&b"foo"[..]);
		assert_eq!(bq.len(), 3);
		bq.push(&b"bar"[..]);
		assert_eq!(bq.len(), 6);
		bq.push(&b"2342"[..]);
		assert_eq!(bq.len(), 10);
	}

	#[test]
	fn bufq_pops_bytes_across_chunk_boundaries() {
		let mut bq = BufferQueue::new();
		bq.push(&b"fo"[..]);
		bq.push(&b"o"[..]);
		let mut out = Vec::new();
		while let Some(b) = bq.pop_byte() {
			out.push(b);
		}
		assert_eq!(out, b"foo".to_vec());
		assert_eq!(bq.len(), 0);
	}

	#[test]
	fn bufq_pop_reduces_length() {
		let mut bq = BufferQueue::new();
		bq.push(&b"foo"[..]);
		bq.push(&b"2342"[..]);
		assert_eq!(bq.len(), 7);
		bq.pop_byte().unwrap();
		assert_eq!(bq.len(), 6);
	}

	#[test]
	fn bufq_ignores_empty_chunks() {
		let mut bq = BufferQueue::new();
		bq.push(&b""[..]);
		assert_eq!(bq.len(), 0);
		assert_eq!(bq.pop_byte(), None);
	}

	#[test]
	fn bufq_works_with_fillup_after_depletion() {
		let mut bq = BufferQueue::new();
		bq.push(&b"fo"[..]);
		assert_eq!(bq.pop_byte(), Some(b'f'));
		assert_eq!(bq.pop_byte(), Some(b'o'));
		assert_eq!(bq.pop_byte(), None);
		bq.push(&b"x"[..]);
		assert_eq!(bq.pop_byte(), Some(b'x'));
	}

	#[test]
	fn bufq_returns_eof_flag() {
		let mut bq = BufferQueue::new();
		assert!(!bq.eof_pushed());
		bq.push_eof();
		assert!(bq.eof_pushed());
	}

	#[test]
	#[should_panic(expected = "cannot push behind eof")]
	fn bufq_does_not_allow_pushing_after_eof() {
		let mut bq = BufferQueue::new();
		bq.push(&b"foo"[..]);
		bq.push_eof();
		bq.push(&b"bar"[..]);
	}

	#[test]
	fn bufq_remaining_reflects_unconsumed_bytes() {
		let mut bq = BufferQueue::new();
		bq.push(&b"foo"[..]);
		bq.push(&b"bar"[..]);
		bq.pop_byte().unwrap();
		assert_eq!(bq.remaining(), b"oobar".to_vec());
		assert_eq!(bq.len(), 5);
	}

	#[test]
	fn bufq_empty_after_clear() {
		let mut bq = BufferQueue::new();
		bq.push(&b"foo"[..]);
		bq.clear();
		assert_eq!(bq.len(), 0);
		assert_eq!(bq.pop_byte(), None);
	}
}
