//! Small value types shared by middlewares and registrars.

use std::borrow::{Borrow, Cow};
use std::collections::HashSet;
use std::hash::Hash;
use std::ops::{BitAnd, BitOr, BitXor, Range, Sub};

use http::StatusCode;
use serde::Deserialize;

// ── BinarySet ─────────────────────────────────────────────────────────────────

/// A set that stores what it includes and, explicitly, what it excludes.
///
/// `None` on either side means "no constraint": a `BinarySet` with neither
/// side set contains everything. An empty collection on a side is a real
/// constraint (`included = {}` contains nothing).
///
/// ```rust
/// use routeguard::BinarySet;
///
/// let all = BinarySet::<&str>::default();
/// let only_users = BinarySet::including(["users"]);
/// let but_admin = BinarySet::excluding(["admin"]);
///
/// assert!(all.contains(&"anything"));
/// assert!(only_users.contains(&"users") && !only_users.contains(&"admin"));
/// assert!(but_admin.contains(&"users") && !but_admin.contains(&"admin"));
/// ```
///
/// Deserializes from a plain list (inclusions) or from a table with
/// `included` and `non_included` lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "BinarySetRepr<T>")]
#[serde(bound(deserialize = "T: Eq + Hash + Deserialize<'de>"))]
pub struct BinarySet<T: Eq + Hash> {
    included: Option<HashSet<T>>,
    non_included: Option<HashSet<T>>,
}

impl<T: Eq + Hash> Default for BinarySet<T> {
    fn default() -> Self {
        Self { included: None, non_included: None }
    }
}

impl<T: Eq + Hash> BinarySet<T> {
    pub fn new(
        included: Option<impl IntoIterator<Item = T>>,
        non_included: Option<impl IntoIterator<Item = T>>,
    ) -> Self {
        Self {
            included: included.map(|items| items.into_iter().collect()),
            non_included: non_included.map(|items| items.into_iter().collect()),
        }
    }

    pub fn including(items: impl IntoIterator<Item = T>) -> Self {
        Self { included: Some(items.into_iter().collect()), non_included: None }
    }

    pub fn excluding(items: impl IntoIterator<Item = T>) -> Self {
        Self { included: None, non_included: Some(items.into_iter().collect()) }
    }

    pub fn included(&self) -> Option<&HashSet<T>> {
        self.included.as_ref()
    }

    pub fn non_included(&self) -> Option<&HashSet<T>> {
        self.non_included.as_ref()
    }

    /// Adds `item` to the inclusions, creating them if there were none.
    pub fn include(&mut self, item: T) {
        self.included.get_or_insert_with(HashSet::new).insert(item);
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.included.as_ref().is_none_or(|included| included.contains(item))
            && self.non_included.as_ref().is_none_or(|excluded| !excluded.contains(item))
    }

    /// True when neither side holds any item.
    pub fn is_empty(&self) -> bool {
        self.included.as_ref().is_none_or(HashSet::is_empty)
            && self.non_included.as_ref().is_none_or(HashSet::is_empty)
    }

    /// Iterates over the inclusions.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.included.iter().flatten()
    }
}

impl<T: Eq + Hash + Clone> BinarySet<T> {
    /// Applies a set operation side-wise. A side stays `None` only if it is
    /// `None` in both operands.
    fn combine(
        &self,
        other: &Self,
        op: impl Fn(&HashSet<T>, &HashSet<T>) -> HashSet<T>,
    ) -> Self {
        let side = |a: &Option<HashSet<T>>, b: &Option<HashSet<T>>| {
            if a.is_none() && b.is_none() {
                return None;
            }
            let empty = HashSet::new();
            Some(op(a.as_ref().unwrap_or(&empty), b.as_ref().unwrap_or(&empty)))
        };

        Self {
            included: side(&self.included, &other.included),
            non_included: side(&self.non_included, &other.non_included),
        }
    }
}

macro_rules! binary_set_op {
    ($trait:ident, $method:ident, $set_method:ident) => {
        impl<T: Eq + Hash + Clone> $trait for &BinarySet<T> {
            type Output = BinarySet<T>;

            fn $method(self, other: Self) -> BinarySet<T> {
                self.combine(other, |a, b| a.$set_method(b).cloned().collect())
            }
        }
    };
}

binary_set_op!(BitOr, bitor, union);
binary_set_op!(BitAnd, bitand, intersection);
binary_set_op!(Sub, sub, difference);
binary_set_op!(BitXor, bitxor, symmetric_difference);

impl<T: Eq + Hash> FromIterator<T> for BinarySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::including(iter)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
#[serde(bound(deserialize = "T: Eq + Hash + Deserialize<'de>"))]
enum BinarySetRepr<T: Eq + Hash> {
    Included(Vec<T>),
    Both {
        #[serde(default)]
        included: Option<Vec<T>>,
        #[serde(default)]
        non_included: Option<Vec<T>>,
    },
}

impl<T: Eq + Hash> From<BinarySetRepr<T>> for BinarySet<T> {
    fn from(repr: BinarySetRepr<T>) -> Self {
        match repr {
            BinarySetRepr::Included(items) => Self::including(items),
            BinarySetRepr::Both { included, non_included } => Self::new(included, non_included),
        }
    }
}

// ── MultiRange ────────────────────────────────────────────────────────────────

/// A union of half-open `u16` ranges, used for sets of status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiRange {
    ranges: Cow<'static, [Range<u16>]>,
}

impl MultiRange {
    pub fn new(ranges: impl IntoIterator<Item = Range<u16>>) -> Self {
        Self { ranges: Cow::Owned(ranges.into_iter().collect()) }
    }

    pub const fn from_static(ranges: &'static [Range<u16>]) -> Self {
        Self { ranges: Cow::Borrowed(ranges) }
    }

    pub fn ranges(&self) -> &[Range<u16>] {
        &self.ranges
    }

    pub fn contains(&self, value: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(&value))
    }

    pub fn contains_status(&self, status: StatusCode) -> bool {
        self.contains(status.as_u16())
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ranges.iter().flat_map(Clone::clone)
    }

    /// A new range set with `other`'s ranges appended.
    pub fn with(&self, other: &MultiRange) -> Self {
        Self::new(self.ranges.iter().chain(other.ranges.iter()).cloned())
    }
}

impl From<Range<u16>> for MultiRange {
    fn from(range: Range<u16>) -> Self {
        Self::new([range])
    }
}

impl BitOr for &MultiRange {
    type Output = MultiRange;

    fn bitor(self, other: Self) -> MultiRange {
        self.with(other)
    }
}

/// Named groups of HTTP status codes.
pub struct StatusCodeGroup;

impl StatusCodeGroup {
    pub const INFORMATIONAL: MultiRange = MultiRange::from_static(&[100..200]);
    pub const SUCCESSFUL: MultiRange = MultiRange::from_static(&[200..300]);
    pub const REDIRECTION: MultiRange = MultiRange::from_static(&[300..400]);
    pub const CLIENT_ERROR: MultiRange = MultiRange::from_static(&[400..500]);
    pub const SERVER_ERROR: MultiRange = MultiRange::from_static(&[500..600]);
    pub const GOOD: MultiRange = MultiRange::from_static(&[100..400]);
    pub const ERROR: MultiRange = MultiRange::from_static(&[400..600]);
    pub const ALL: MultiRange = MultiRange::from_static(&[100..600]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_constrain_membership() {
        let set = BinarySet::new(Some(["a", "b"]), Some(["b"]));

        assert!(set.contains(&"a"));
        assert!(!set.contains(&"b"));
        assert!(!set.contains(&"c"));
    }

    #[test]
    fn empty_inclusions_contain_nothing() {
        let set = BinarySet::<&str>::including([]);

        assert!(!set.contains(&"a"));
        assert!(set.is_empty());
    }

    #[test]
    fn operators_work_side_wise() {
        let left = BinarySet::new(Some([1, 2]), None::<[i32; 0]>);
        let right = BinarySet::new(Some([2, 3]), Some([9]));

        let union = &left | &right;
        let intersection = &left & &right;
        let difference = &left - &right;

        assert_eq!(union.included(), Some(&HashSet::from([1, 2, 3])));
        assert_eq!(union.non_included(), Some(&HashSet::from([9])));
        assert_eq!(intersection.included(), Some(&HashSet::from([2])));
        assert_eq!(intersection.non_included(), Some(&HashSet::new()));
        assert_eq!(difference.included(), Some(&HashSet::from([1])));
        assert_eq!((&left ^ &left).included(), Some(&HashSet::new()));
    }

    #[test]
    fn include_creates_inclusions() {
        let mut set = BinarySet::excluding(["static"]);
        set.include("users");

        assert!(set.contains(&"users"));
        assert!(!set.contains(&"posts"));
        assert_eq!(set.iter().collect::<Vec<_>>(), [&"users"]);
    }

    #[test]
    fn deserializes_from_list_or_table() {
        #[derive(Deserialize)]
        struct Holder {
            list: BinarySet<String>,
            table: BinarySet<String>,
        }

        let holder: Holder = toml::from_str(
            r#"
            list = ["a"]
            table = { non_included = ["b"] }
            "#,
        )
        .unwrap();

        assert_eq!(holder.list, BinarySet::including(["a".to_owned()]));
        assert_eq!(holder.table, BinarySet::excluding(["b".to_owned()]));
    }

    #[test]
    fn multi_range_membership() {
        let codes = &StatusCodeGroup::CLIENT_ERROR | &MultiRange::from(500..501);

        assert!(codes.contains(404));
        assert!(codes.contains_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!codes.contains(501));
        assert_eq!(codes.iter().count(), 101);
    }
}
