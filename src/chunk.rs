//! Recursive text splitter with overlap.
//!
//! Splits the extracted document text into [`Chunk`]s of at most
//! `chunk_size` bytes, preferring larger structural boundaries first:
//! paragraphs (`\n\n`), then lines, then sentence ends, then words, with
//! a hard split as the last resort. Consecutive chunks share up to
//! `chunk_overlap` bytes of trailing context.
//!
//! Each chunk records its byte offset into the source text, so
//! `source[offset..offset + text.len()] == text` holds for every chunk.

use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::models::Chunk;

/// Boundary preference, largest structure first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A boundary-delimited span of the source text, at most `chunk_size`
/// bytes long, with its separator still attached at the end.
#[derive(Debug, Clone, Copy)]
struct Piece<'a> {
    offset: usize,
    text: &'a str,
}

/// Split `text` into chunks of at most `chunk_size` bytes with
/// `chunk_overlap` bytes of shared context between consecutive chunks.
/// Returns chunks with contiguous indices starting at 0; always at least one.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let mut pieces = Vec::new();
    split_recursive(text, 0, chunk_size, &SEPARATORS, &mut pieces);

    let mut chunks = merge_pieces(&pieces, chunk_size, chunk_overlap);

    // Guarantee at least one chunk
    if chunks.is_empty() {
        chunks.push(make_chunk(0, 0, text));
    }

    chunks
}

/// Split `text` into pieces no longer than `max_len`, trying each
/// separator in order before falling back to a hard byte split.
fn split_recursive<'a>(
    text: &'a str,
    offset: usize,
    max_len: usize,
    seps: &[&str],
    out: &mut Vec<Piece<'a>>,
) {
    if text.is_empty() {
        return;
    }
    if text.len() <= max_len {
        out.push(Piece { offset, text });
        return;
    }

    let Some((sep, rest)) = seps.split_first() else {
        hard_split(text, offset, max_len, out);
        return;
    };

    let mut cursor = offset;
    for part in text.split_inclusive(sep) {
        if part.len() <= max_len {
            out.push(Piece {
                offset: cursor,
                text: part,
            });
        } else {
            split_recursive(part, cursor, max_len, rest, out);
        }
        cursor += part.len();
    }
}

/// Last-resort split at `max_len` byte boundaries, backed off to the
/// nearest char boundary.
fn hard_split<'a>(text: &'a str, offset: usize, max_len: usize, out: &mut Vec<Piece<'a>>) {
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // A single char wider than max_len; take it whole.
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        out.push(Piece {
            offset: offset + start,
            text: &text[start..end],
        });
        start = end;
    }
}

/// Greedily pack pieces into chunks, carrying a tail of up to
/// `overlap` bytes into the next chunk.
fn merge_pieces(pieces: &[Piece<'_>], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<Piece<'_>> = VecDeque::new();
    let mut total = 0usize;
    let mut chunk_index: i64 = 0;

    for &piece in pieces {
        let plen = piece.text.len();

        if total + plen > chunk_size && !window.is_empty() {
            chunks.push(emit_window(chunk_index, &window));
            chunk_index += 1;

            // Retain a tail within the overlap budget that leaves room
            // for the incoming piece.
            while total > overlap || (total + plen > chunk_size && total > 0) {
                let front = window.pop_front().unwrap();
                total -= front.text.len();
            }
        }

        window.push_back(piece);
        total += plen;
    }

    if !window.is_empty() {
        chunks.push(emit_window(chunk_index, &window));
    }

    chunks
}

fn emit_window(index: i64, window: &VecDeque<Piece<'_>>) -> Chunk {
    let offset = window.front().map(|p| p.offset).unwrap_or(0);
    let text: String = window.iter().map(|p| p.text).collect();
    make_chunk(index, offset, &text)
}

fn make_chunk(index: i64, offset: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        chunk_index: index,
        text: text.to_string(),
        offset,
        hash,
    }
}
