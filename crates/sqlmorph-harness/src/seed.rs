//! Per-worker seed derivation.
//!
//! Each worker draws its seeds from the campaign's root seed as
//! `H(root_seed || purpose_tag || worker_index)` with `H` = xxh3_64, so a
//! campaign replays exactly given the same root seed and worker count.
//!
//! - **generation**: drives query and expression generation.
//! - **selection**: picks which oracle runs next.

use xxhash_rust::xxh3::xxh3_64;

const TAG_GENERATION: &[u8] = b"generation";
const TAG_SELECTION: &[u8] = b"selection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSeeds {
    pub root: u64,
    pub worker: usize,
    pub generation: u64,
    pub selection: u64,
}

impl WorkerSeeds {
    #[must_use]
    pub fn derive(root_seed: u64, worker: usize) -> Self {
        Self {
            root: root_seed,
            worker,
            generation: derive_seed(root_seed, TAG_GENERATION, worker),
            selection: derive_seed(root_seed, TAG_SELECTION, worker),
        }
    }
}

fn derive_seed(root_seed: u64, purpose_tag: &[u8], worker: usize) -> u64 {
    let mut buf = Vec::with_capacity(16 + purpose_tag.len());
    buf.extend_from_slice(&root_seed.to_le_bytes());
    buf.extend_from_slice(purpose_tag);
    buf.extend_from_slice(&(worker as u64).to_le_bytes());
    xxh3_64(&buf)
}
