//! Structural fallback scanner.
//!
//! Regex rules cannot express a definition whose body spans multiple lines
//! with nested braces. Instead of growing ever more elaborate patterns, the
//! scanner walks the text line by line: find the start-signature line, then
//! track net brace depth until it returns to zero. The located span is
//! replaced wholesale with the rule's rendered template.
//!
//! The depth counter is deliberately naive: it counts brace characters
//! literally and does not exclude occurrences inside string or comment
//! literals. That limitation is inherited from the original maintenance
//! script and is pinned by tests rather than silently changed.

use regex::Regex;

/// Line range of one complete nested construct, inclusive on both ends.
///
/// Brace depth is zero before `start_line`, positive strictly inside the
/// span, and returns to zero on `end_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_line: usize,
    pub end_line: usize,
}

/// Result of one scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// The span brackets the first matching construct.
    Found(BlockSpan),
    /// No line matched the start signature.
    SignatureAbsent,
    /// The signature matched but the input ended before depth returned to
    /// zero; no replacement may be made.
    UnterminatedBlock,
}

/// Net brace depth contributed by one line.
fn net_depth(line: &str) -> i32 {
    let opens = line.matches('{').count() as i32;
    let closes = line.matches('}').count() as i32;
    opens - closes
}

/// Locate the first block whose opening line matches `start_signature`.
///
/// Only the first occurrence is handled per invocation; callers needing more
/// must scan the rewritten text again.
pub fn find_block(text: &str, start_signature: &Regex) -> ScanResult {
    let mut depth = 0i32;
    let mut start_line = None;

    for (index, line) in text.lines().enumerate() {
        match start_line {
            None => {
                if start_signature.is_match(line) {
                    depth = net_depth(line);
                    // A signature line that closes everything it opens is a
                    // complete construct on its own.
                    if depth <= 0 {
                        return ScanResult::Found(BlockSpan {
                            start_line: index,
                            end_line: index,
                        });
                    }
                    start_line = Some(index);
                }
            }
            Some(start) => {
                depth += net_depth(line);
                // A line may close more than it opens, so depth can step
                // past zero; any non-positive value ends the block.
                if depth <= 0 {
                    return ScanResult::Found(BlockSpan {
                        start_line: start,
                        end_line: index,
                    });
                }
            }
        }
    }

    match start_line {
        Some(_) => ScanResult::UnterminatedBlock,
        None => ScanResult::SignatureAbsent,
    }
}

/// Replace the lines of `span` with `replacement`. Lines outside the span
/// keep their text, and the presence of a trailing newline is preserved.
/// The result is rejoined with `\n`, so a file with CRLF endings comes back
/// LF-normalized when a block replacement fires.
pub fn replace_block(text: &str, span: BlockSpan, replacement: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..span.start_line]);
    out.extend(replacement.lines());
    if span.end_line + 1 < lines.len() {
        out.extend_from_slice(&lines[span.end_line + 1..]);
    }
    let mut result = out.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}
