/*!
# End-of-line normalization

XML 1.0 § 2.11 requires that `\r\n` pairs and lone `\r` characters are
handed to the application as a single `\n`. This applies uniformly to every
codepoint reaching the grammar, including attribute values, CDATA sections
and comments, which is why the normalization sits between the decoder and
the lexer instead of inside individual lexer states.

A `\r` can only be interpreted once the following codepoint is known, so the
normalizer buffers at most one codepoint and may emit up to two in a single
step.
*/

/// Result of feeding one codepoint to the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Norm {
	/// Nothing to forward yet (a `\r` is pending).
	Empty,
	/// Forward one codepoint.
	One(char),
	/// Forward two codepoints, in order.
	Two(char, char),
}

/// Two-state `\r\n` / `\r` → `\n` folding machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewlineNormalizer {
	after_cr: bool,
}

impl NewlineNormalizer {
	pub fn new() -> NewlineNormalizer {
		NewlineNormalizer { after_cr: false }
	}

	/// Feed one codepoint, returning the codepoints to forward.
	pub fn feed(&mut self, ch: char) -> Norm {
		if self.after_cr {
			match ch {
				// \r\n collapses into one \n
				'\n' => {
					self.after_cr = false;
					Norm::One('\n')
				}
				// another \r: emit the fold of the previous one, keep
				// looking ahead
				'\r' => Norm::One('\n'),
				other => {
					self.after_cr = false;
					Norm::Two('\n', other)
				}
			}
		} else if ch == '\r' {
			self.after_cr = true;
			Norm::Empty
		} else {
			Norm::One(ch)
		}
	}

	/// Flush a pending `\r` at the end of the input.
	pub fn flush(&mut self) -> Option<char> {
		if self.after_cr {
			self.after_cr = false;
			Some('\n')
		} else {
			None
		}
	}
}
