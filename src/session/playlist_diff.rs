//! Turns two playlist snapshots into add/remove changes

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaylistChange<T> {
    Removed { indexes: Vec<usize> },
    Added { position: usize, items: Vec<T> },
}

/// Describe how `old` became `new` as at most one removal followed by at
/// most one insertion, both inside the span between the common prefix and
/// the common suffix. Removal indexes refer to `old`, the insert position
/// to the list after the removal.
pub fn diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<PlaylistChange<T>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed = prefix..old.len() - suffix;
    let added = prefix..new.len() - suffix;

    let mut changes = Vec::new();
    if !removed.is_empty() {
        changes.push(PlaylistChange::Removed {
            indexes: removed.collect(),
        });
    }
    if !added.is_empty() {
        changes.push(PlaylistChange::Added {
            position: prefix,
            items: new[added].to_vec(),
        });
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_lists_produce_nothing() {
        assert!(diff(&["a", "b"], &["a", "b"]).is_empty());
    }

    #[test]
    fn insertion_at_front() {
        assert_eq!(
            diff(&["a", "b"], &["x", "y", "a", "b"]),
            vec![PlaylistChange::Added {
                position: 0,
                items: vec!["x", "y"],
            }]
        );
    }

    #[test]
    fn removal_in_the_middle() {
        assert_eq!(
            diff(&["a", "b", "c", "d"], &["a", "d"]),
            vec![PlaylistChange::Removed { indexes: vec![1, 2] }]
        );
    }

    #[test]
    fn replacement_is_remove_then_add() {
        assert_eq!(
            diff(&["a", "b", "c"], &["a", "x", "c"]),
            vec![
                PlaylistChange::Removed { indexes: vec![1] },
                PlaylistChange::Added {
                    position: 1,
                    items: vec!["x"],
                },
            ]
        );
    }

    #[test]
    fn repeated_items_do_not_overlap_prefix_and_suffix() {
        assert_eq!(
            diff(&["a", "a"], &["a", "a", "a"]),
            vec![PlaylistChange::Added {
                position: 2,
                items: vec!["a"],
            }]
        );
    }
}
