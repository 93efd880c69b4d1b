/*
 * align.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Two-pass block alignment within a segment.
 *
 * Pass 1 matches identical blocks by content hash; pass 2 matches the
 * leftovers by structural key (paragraph tag, table, toc, section break)
 * inside the gaps between pass-1 anchors. Both passes keep matches
 * monotone: a match never crosses an earlier one, which is what makes the
 * downstream insertion-point bookkeeping and the backwards walk sound.
 *
 * The result is ordered by current-document position with Deleted entries
 * interleaved at their pristine positions, Deleted after Added at a shared
 * boundary so the reversed walk deletes before it inserts.
 */

use crate::hash::{block_hash, structural_key};
use extradoc_model::Block;

/// How a pair of blocks (or a lone block) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOp {
    Unchanged,
    Added,
    Deleted,
    Modified,
}

/// One entry of the alignment list. `pristine`/`current` are indices into
/// the input slices; exactly one of them is `None` for Added/Deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAlignment {
    pub op: AlignOp,
    pub pristine: Option<usize>,
    pub current: Option<usize>,
}

/// Align two block lists from the same segment.
pub fn align_blocks(pristine: &[Block], current: &[Block]) -> Vec<BlockAlignment> {
    let pristine_hashes: Vec<u64> = pristine.iter().map(block_hash).collect();
    let current_hashes: Vec<u64> = current.iter().map(block_hash).collect();

    // match_for_current[c] = Some(p)
    let mut match_for_current: Vec<Option<usize>> = vec![None; current.len()];
    let mut pristine_matched: Vec<bool> = vec![false; pristine.len()];

    // Pass 1: exact-hash, monotone. Each current block takes the first
    // unmatched pristine block with the same hash at or after the previous
    // match.
    let mut cursor = 0;
    for (c, hash) in current_hashes.iter().enumerate() {
        if let Some(p) = (cursor..pristine.len())
            .find(|&p| !pristine_matched[p] && pristine_hashes[p] == *hash)
        {
            match_for_current[c] = Some(p);
            pristine_matched[p] = true;
            cursor = p + 1;
        }
    }

    // Pass 2: structural, within each gap between pass-1 anchors so a
    // structural match can never cross an exact one.
    let mut gap_cursor = 0; // first pristine index the next gap may use
    for c in 0..current.len() {
        if let Some(p) = match_for_current[c] {
            gap_cursor = gap_cursor.max(p + 1);
            continue;
        }
        let limit = match_for_current[c..]
            .iter()
            .flatten()
            .next()
            .copied()
            .unwrap_or(pristine.len());
        let key = structural_key(&current[c]);
        if let Some(p) = (gap_cursor..limit)
            .find(|&p| !pristine_matched[p] && structural_key(&pristine[p]) == key)
        {
            match_for_current[c] = Some(p);
            pristine_matched[p] = true;
            gap_cursor = p + 1;
        }
    }

    // Assemble: current order, flushing unmatched pristine blocks as
    // Deleted once the walk passes their position.
    let mut result = Vec::with_capacity(current.len() + pristine.len());
    let mut flushed = 0;
    let flush_deleted = |upto: usize, result: &mut Vec<BlockAlignment>, flushed: &mut usize| {
        while *flushed < upto {
            if !pristine_matched[*flushed] {
                result.push(BlockAlignment {
                    op: AlignOp::Deleted,
                    pristine: Some(*flushed),
                    current: None,
                });
            }
            *flushed += 1;
        }
    };

    for (c, matched) in match_for_current.iter().enumerate() {
        match matched {
            Some(p) => {
                flush_deleted(*p, &mut result, &mut flushed);
                flushed = flushed.max(p + 1);
                let op = if pristine_hashes[*p] == current_hashes[c] {
                    AlignOp::Unchanged
                } else {
                    AlignOp::Modified
                };
                result.push(BlockAlignment {
                    op,
                    pristine: Some(*p),
                    current: Some(c),
                });
            }
            None => {
                result.push(BlockAlignment {
                    op: AlignOp::Added,
                    pristine: None,
                    current: Some(c),
                });
            }
        }
    }
    flush_deleted(pristine.len(), &mut result, &mut flushed);

    tracing::trace!(
        entries = result.len(),
        changed = result.iter().filter(|a| a.op != AlignOp::Unchanged).count(),
        "aligned segment blocks"
    );

    result
}
