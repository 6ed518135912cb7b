//! Three-way comparison of sorted name sets
//!
//! Both inputs must be sorted ascending and free of duplicates; a single merge
//! pass splits them into names only on the left, names on both sides, and
//! names only on the right.

use std::cmp::Ordering;

/// Result of comparing two sorted sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition<'a> {
    /// Names only in the left set
    pub left: Vec<&'a str>,
    /// Names in both sets
    pub common: Vec<&'a str>,
    /// Names only in the right set
    pub right: Vec<&'a str>,
}

impl Partition<'_> {
    /// Left set is contained in the right set
    pub fn left_is_subset(&self) -> bool {
        self.left.is_empty()
    }

    /// Neither set contains the other, yet they share names
    pub fn is_crossing(&self) -> bool {
        !self.left.is_empty() && !self.common.is_empty() && !self.right.is_empty()
    }
}

/// Partition two sorted sets in one ascending merge
pub fn partition<'a, L, R>(left: &'a [L], right: &'a [R]) -> Partition<'a>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    debug_assert!(is_strictly_sorted(left), "left set must be sorted and unique");
    debug_assert!(is_strictly_sorted(right), "right set must be sorted and unique");

    let mut out = Partition::default();
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        let (a, b) = (left[i].as_ref(), right[j].as_ref());
        match a.cmp(b) {
            Ordering::Less => {
                out.left.push(a);
                i += 1;
            }
            Ordering::Greater => {
                out.right.push(b);
                j += 1;
            }
            Ordering::Equal => {
                out.common.push(a);
                i += 1;
                j += 1;
            }
        }
    }
    out.left.extend(left[i..].iter().map(|s| s.as_ref()));
    out.right.extend(right[j..].iter().map(|s| s.as_ref()));

    out
}

/// Check `left ⊆ right`
pub fn is_subset<L, R>(left: &[L], right: &[R]) -> bool
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    left.len() <= right.len() && partition(left, right).left_is_subset()
}

fn is_strictly_sorted<S: AsRef<str>>(names: &[S]) -> bool {
    names.windows(2).all(|w| w[0].as_ref() < w[1].as_ref())
}
