//! Incremental set scanning
//!
//! Set members are kept ordered by `(slot, member)` where the slot is a
//! 64-bit value derived from the member's SHA-256 digest. A cursor is simply
//! the next slot to visit, so it stays valid while members come and go:
//!
//! - a member present for a whole cycle is returned exactly once
//! - members added or removed mid-cycle may or may not be returned
//! - cursor `0` starts a cycle, and a returned cursor of `0` ends it
//!
//! Members sharing a slot are never split across pages.

use sha2::{Digest, Sha256};
use shared::CURSOR_START;

/// One scan step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub members: Vec<String>,
    pub cursor: u64,
}

/// Ordering slot for a set member
pub fn slot_of(member: &str) -> u64 {
    let digest = Sha256::digest(member.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Build a page from `(slot, member)` entries ordered by slot, starting at
/// the requested cursor
///
/// Stops after `count` members (at least one), extended to the end of the
/// current slot. The returned cursor is the slot of the first entry left out,
/// or [`CURSOR_START`] when the entries ran out.
pub(crate) fn collect_page<I, E>(entries: I, count: usize) -> Result<ScanPage, E>
where
    I: IntoIterator<Item = Result<(u64, String), E>>,
{
    let count = count.max(1);
    let mut members = Vec::new();
    let mut last_slot = None;

    for entry in entries {
        let (slot, member) = entry?;
        if members.len() >= count && last_slot != Some(slot) {
            return Ok(ScanPage {
                members,
                cursor: slot,
            });
        }
        last_slot = Some(slot);
        members.push(member);
    }

    Ok(ScanPage {
        members,
        cursor: CURSOR_START,
    })
}
