use super::{lower_bound, Node, Pointer};
use crate::prelude::*;

/// The two halves of an overflowing node plus the key promoted between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub left: Node,
    pub right: Node,
    /// Separator for the parent. Every key in `right`'s subtree is at or above
    /// it, every key in `left`'s subtree is below it.
    pub median: Vec<u8>,
}

impl Node {
    /// Splits at `branching_factor / 2`.
    ///
    /// A leaf keeps the median as the first key of its right half. An internal
    /// node hands the median up and drops it from both halves, so the left half
    /// keeps the pointers up to and including the median's left child.
    pub fn split(self, branching_factor: usize) -> Result<Split> {
        let half = branching_factor / 2;

        if half == 0 || half >= self.size() {
            return Err(Error::Linkage(format!(
                "cannot split a node of {} keys at position {}",
                self.size(),
                half
            )));
        }

        match self {
            Node::Leaf {
                mut keys,
                mut values,
            } => {
                let right_keys = keys.split_off(half);
                let right_values = values.split_off(half);
                let median = right_keys[0].clone();

                Ok(Split {
                    left: Node::Leaf { keys, values },
                    right: Node::Leaf {
                        keys: right_keys,
                        values: right_values,
                    },
                    median,
                })
            }
            Node::Internal {
                mut keys,
                mut pointers,
            } => {
                let mut right_keys = keys.split_off(half);
                let right_pointers = pointers.split_off(half + 1);
                let median = right_keys.remove(0);

                Ok(Split {
                    left: Node::Internal { keys, pointers },
                    right: Node::Internal {
                        keys: right_keys,
                        pointers: right_pointers,
                    },
                    median,
                })
            }
        }
    }

    /// Points `slot` at `new` after checking that it still holds `old`.
    pub fn relink_pointer(&mut self, slot: usize, old: &Pointer, new: Pointer) -> Result<()> {
        let pointers = self.internal_pointers_mut()?;

        match pointers.get_mut(slot) {
            Some(current) if current == old => {
                *current = new;
                Ok(())
            }
            _ => Err(unlinked(slot, old)),
        }
    }

    /// Replaces the child at `slot` (which must still hold `old`) with the two
    /// halves of its split, inserting `median` between them.
    ///
    /// Returns the position the median landed at.
    pub fn promote(
        &mut self,
        slot: usize,
        old: &Pointer,
        median: Vec<u8>,
        left: Pointer,
        right: Pointer,
    ) -> Result<usize> {
        let Node::Internal { keys, pointers } = self else {
            return Err(Error::Linkage("cannot promote a key into a leaf".into()));
        };

        if pointers.get(slot) != Some(old) {
            return Err(unlinked(slot, old));
        }

        let search = lower_bound(keys, &median);
        if search.found {
            return Err(Error::Linkage(format!(
                "separator {} already present in parent",
                hex::encode(&median)
            )));
        }
        if search.index != slot {
            return Err(Error::Linkage(format!(
                "separator {} sorts to position {} but the split child sits at {}",
                hex::encode(&median),
                search.index,
                slot
            )));
        }

        keys.insert(slot, median);
        pointers[slot] = left;
        pointers.insert(slot + 1, right);

        Ok(slot)
    }

    fn internal_pointers_mut(&mut self) -> Result<&mut Vec<Pointer>> {
        match self {
            Node::Internal { pointers, .. } => Ok(pointers),
            Node::Leaf { .. } => Err(Error::Linkage("a leaf has no child pointers".into())),
        }
    }
}

fn unlinked(slot: usize, pointer: &Pointer) -> Error {
    Error::Linkage(format!("pointer {} is not linked at slot {}", pointer, slot))
}
