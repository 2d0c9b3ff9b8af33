/// Outcome of [`lower_bound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Search {
    pub found: bool,
    /// Position of the match, or the first position holding a greater key.
    pub index: usize,
}

/// Binary search over strictly increasing keys, compared byte-wise.
///
/// Lookup, insertion and branch selection all go through this one contract:
/// a miss always reports the insertion point, including `keys.len()` when the
/// target is greater than every key.
pub fn lower_bound(keys: &[Vec<u8>], target: &[u8]) -> Search {
    match keys.binary_search_by(|probe| probe.as_slice().cmp(target)) {
        Ok(index) => Search { found: true, index },
        Err(index) => Search {
            found: false,
            index,
        },
    }
}
