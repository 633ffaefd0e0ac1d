//! Name-ordered dictionary over cities.
//!
//! A plain binary search tree keyed by city name. Each node exclusively
//! owns its children, so removal is a pure splice with no shared aliasing.
//! The tree makes no balance promises of its own; city names arrive in
//! effectively arbitrary order, which keeps expected height logarithmic.

use crate::error::{CitydexError, Result};
use crate::types::City;
use std::cmp::Ordering;
use std::fmt;

struct Node {
    city: City,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(city: City) -> Self {
        Self {
            city,
            left: None,
            right: None,
        }
    }
}

/// Ordered dictionary keyed by city name.
pub struct NameIndex {
    root: Option<Box<Node>>,
    len: usize,
}

impl NameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Number of cities currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no cities.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all cities.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Insert a city keyed by its name.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if a city with the same name is already
    /// present; the index is left unchanged.
    pub fn insert(&mut self, city: City) -> Result<()> {
        Self::insert_rec(&mut self.root, city)?;
        self.len += 1;
        Ok(())
    }

    fn insert_rec(slot: &mut Option<Box<Node>>, city: City) -> Result<()> {
        let Some(node) = slot else {
            *slot = Some(Box::new(Node::leaf(city)));
            return Ok(());
        };
        match city.name.as_str().cmp(node.city.name.as_str()) {
            Ordering::Equal => Err(CitydexError::DuplicateName(city.name)),
            Ordering::Less => Self::insert_rec(&mut node.left, city),
            Ordering::Greater => Self::insert_rec(&mut node.right, city),
        }
    }

    /// Look up a city by name.
    pub fn find(&self, name: &str) -> Option<&City> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match name.cmp(node.city.name.as_str()) {
                Ordering::Equal => return Some(&node.city),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    /// Remove and return the city with the given name.
    ///
    /// Two-child nodes are spliced with their in-order successor, which
    /// preserves the BST ordering without moving any other node.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no city has that name; the index is left
    /// unchanged.
    pub fn delete(&mut self, name: &str) -> Result<City> {
        match Self::remove_rec(&mut self.root, name) {
            Some(city) => {
                self.len -= 1;
                log::debug!("removed '{}' from the name index", city.name);
                Ok(city)
            }
            None => Err(CitydexError::NotFound(format!("'{name}'"))),
        }
    }

    fn remove_rec(slot: &mut Option<Box<Node>>, name: &str) -> Option<City> {
        let node = slot.as_deref_mut()?;
        match name.cmp(node.city.name.as_str()) {
            Ordering::Less => Self::remove_rec(&mut node.left, name),
            Ordering::Greater => Self::remove_rec(&mut node.right, name),
            Ordering::Equal => {
                let mut node = slot.take()?;
                let removed = match (node.left.take(), node.right.take()) {
                    (None, None) => node.city,
                    (Some(left), None) => {
                        *slot = Some(left);
                        node.city
                    }
                    (None, Some(right)) => {
                        *slot = Some(right);
                        node.city
                    }
                    (Some(left), Some(right)) => {
                        node.left = Some(left);
                        node.right = Some(right);
                        let successor = match Self::take_min(&mut node.right) {
                            Some(city) => city,
                            None => unreachable!("two-child node has a right subtree"),
                        };
                        let removed = std::mem::replace(&mut node.city, successor);
                        *slot = Some(node);
                        removed
                    }
                };
                Some(removed)
            }
        }
    }

    /// Detach the leftmost node under `slot` and return its city.
    fn take_min(slot: &mut Option<Box<Node>>) -> Option<City> {
        let node = slot.as_deref_mut()?;
        if node.left.is_some() {
            Self::take_min(&mut node.left)
        } else {
            let node = slot.take()?;
            let Node { city, right, .. } = *node;
            *slot = right;
            Some(city)
        }
    }

    /// All cities in ascending name order.
    ///
    /// The returned list is a snapshot; mutating the index afterwards does
    /// not affect it.
    pub fn entry_list(&self) -> Vec<City> {
        let mut out = Vec::with_capacity(self.len);
        Self::collect_in_order(&self.root, &mut out);
        out
    }

    fn collect_in_order(slot: &Option<Box<Node>>, out: &mut Vec<City>) {
        if let Some(node) = slot {
            Self::collect_in_order(&node.left, out);
            out.push(node.city.clone());
            Self::collect_in_order(&node.right, out);
        }
    }

    /// Write an indented pre-order dump of the tree shape.
    ///
    /// Every null child is written as an explicit `-` marker, so the exact
    /// shape can be reconstructed from the output.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        Self::dump_rec(&self.root, 0, out)
    }

    fn dump_rec(slot: &Option<Box<Node>>, depth: usize, out: &mut impl fmt::Write) -> fmt::Result {
        for _ in 0..depth {
            out.write_str("  ")?;
        }
        match slot {
            None => writeln!(out, "-"),
            Some(node) => {
                writeln!(out, "{}", node.city)?;
                Self::dump_rec(&node.left, depth + 1, out)?;
                Self::dump_rec(&node.right, depth + 1, out)
            }
        }
    }
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameIndex").field("len", &self.len).finish()
    }
}
