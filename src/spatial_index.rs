//! Coordinate-ordered dictionary over cities, balanced as a scapegoat tree.
//!
//! The tree is an ordinary BST over the total coordinate order (x, then y)
//! whose height is bounded amortized-style instead of per-rotation: every
//! node tracks its subtree size, an insert that lands too deep rebuilds the
//! first sufficiently lopsided ancestor (the scapegoat) into a perfectly
//! balanced subtree, and deletions trigger a whole-tree rebuild once the
//! live size falls below alpha times the high-water mark.
//!
//! Nearest-neighbor search is a branch-and-bound descent over the same
//! single-key ordering: the subtree on the far side of a node is skipped
//! whenever the x-axis gap alone already exceeds the best distance found.

use crate::error::{CitydexError, Result};
use crate::types::{City, coord_cmp};
use geo::Point;
use std::cmp::Ordering;
use std::fmt;

/// Default looseness parameter when none is configured.
pub const DEFAULT_ALPHA: f64 = 0.7;

struct Node {
    city: City,
    /// Number of nodes in the subtree rooted here, this node included.
    size: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(city: City) -> Self {
        Self {
            city,
            size: 1,
            left: None,
            right: None,
        }
    }

    /// Scapegoat criterion: one child subtree outweighs alpha times this one.
    fn is_scapegoat(&self, alpha: f64) -> bool {
        let bound = alpha * self.size as f64;
        subtree_size(&self.left) as f64 > bound || subtree_size(&self.right) as f64 > bound
    }
}

fn subtree_size(slot: &Option<Box<Node>>) -> usize {
    slot.as_ref().map_or(0, |node| node.size)
}

/// Squared planar distance; same argmin and the same ties as Euclidean.
#[inline]
fn squared_distance(a: Point, b: Point) -> f64 {
    let dx = b.x() - a.x();
    let dy = b.y() - a.y();
    dx * dx + dy * dy
}

/// Ordered spatial dictionary keyed by coordinate.
pub struct SpatialIndex {
    root: Option<Box<Node>>,
    len: usize,
    /// Largest size seen since the last full rebuild; drives the
    /// delete-time rebuild rule.
    max_len: usize,
    alpha: f64,
}

impl SpatialIndex {
    /// Create an empty index with the default alpha.
    pub fn new() -> Self {
        Self {
            root: None,
            len: 0,
            max_len: 0,
            alpha: DEFAULT_ALPHA,
        }
    }

    /// Create an empty index with a specific looseness parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `0.5 < alpha < 1.0`.
    pub fn with_alpha(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.5 || alpha >= 1.0 {
            return Err(CitydexError::InvalidConfig(format!(
                "alpha must lie strictly between 0.5 and 1.0, got {alpha}"
            )));
        }
        Ok(Self {
            root: None,
            len: 0,
            max_len: 0,
            alpha,
        })
    }

    /// The configured looseness parameter.
    pub fn alpha(&self) -> f64 {
        self.alpha
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
        self.max_len = 0;
    }

    /// Height of the tree: edges on the longest root-to-leaf path.
    ///
    /// After any insert this is at most `log_{1/alpha}(len)` rounded down.
    pub fn height(&self) -> usize {
        Self::height_rec(&self.root)
    }

    fn height_rec(slot: &Option<Box<Node>>) -> usize {
        match slot {
            None => 0,
            Some(node) => {
                let children = Self::height_rec(&node.left).max(Self::height_rec(&node.right));
                if node.left.is_none() && node.right.is_none() {
                    0
                } else {
                    children + 1
                }
            }
        }
    }

    /// Depth past which a freshly inserted leaf triggers a scapegoat scan.
    fn depth_limit(len: usize, alpha: f64) -> usize {
        if len <= 1 {
            return 0;
        }
        ((len as f64).ln() / (1.0 / alpha).ln()).floor() as usize
    }

    /// Insert a city keyed by its coordinate.
    ///
    /// If the new leaf lands deeper than the alpha height bound allows, the
    /// walk back up rebuilds the first unbalanced ancestor in place.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCoordinate` if a city already sits at the same
    /// coordinate; the index is left unchanged.
    pub fn insert(&mut self, city: City) -> Result<()> {
        let limit = Self::depth_limit(self.len + 1, self.alpha);
        Self::insert_rec(&mut self.root, city, 0, limit, self.alpha)?;
        self.len += 1;
        self.max_len = self.max_len.max(self.len);
        Ok(())
    }

    /// Returns whether the subtree below still carries an unresolved
    /// too-deep insertion.
    fn insert_rec(
        slot: &mut Option<Box<Node>>,
        city: City,
        depth: usize,
        limit: usize,
        alpha: f64,
    ) -> Result<bool> {
        let Some(node) = slot else {
            *slot = Some(Box::new(Node::leaf(city)));
            return Ok(depth > limit);
        };

        let too_deep = match coord_cmp(city.position(), node.city.position()) {
            Ordering::Equal => {
                return Err(CitydexError::DuplicateCoordinate(city.x, city.y));
            }
            Ordering::Less => Self::insert_rec(&mut node.left, city, depth + 1, limit, alpha)?,
            Ordering::Greater => Self::insert_rec(&mut node.right, city, depth + 1, limit, alpha)?,
        };
        node.size += 1;

        if too_deep && node.is_scapegoat(alpha) {
            log::debug!(
                "rebuilding scapegoat subtree of {} nodes at {}",
                node.size,
                node.city
            );
            Self::rebuild(slot);
            Ok(false)
        } else {
            Ok(too_deep)
        }
    }

    /// Rebuild the subtree under `slot` into a perfectly balanced one.
    fn rebuild(slot: &mut Option<Box<Node>>) {
        let mut cities = Vec::new();
        Self::drain_in_order(slot.take(), &mut cities);
        let mut cities: Vec<Option<City>> = cities.into_iter().map(Some).collect();
        *slot = Self::build_balanced(&mut cities);
    }

    fn drain_in_order(slot: Option<Box<Node>>, out: &mut Vec<City>) {
        if let Some(node) = slot {
            let Node {
                city, left, right, ..
            } = *node;
            Self::drain_in_order(left, out);
            out.push(city);
            Self::drain_in_order(right, out);
        }
    }

    /// Build a perfectly balanced subtree from a sorted run of cities.
    fn build_balanced(cities: &mut [Option<City>]) -> Option<Box<Node>> {
        if cities.is_empty() {
            return None;
        }
        let mid = cities.len() / 2;
        let (left_half, rest) = cities.split_at_mut(mid);
        let (mid_city, right_half) = rest.split_first_mut()?;
        let city = mid_city.take()?;

        let left = Self::build_balanced(left_half);
        let right = Self::build_balanced(right_half);
        let size = 1 + subtree_size(&left) + subtree_size(&right);
        Some(Box::new(Node {
            city,
            size,
            left,
            right,
        }))
    }

    /// Look up a city by exact coordinate.
    pub fn find(&self, position: Point) -> Option<&City> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match coord_cmp(position, node.city.position()) {
                Ordering::Equal => return Some(&node.city),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    /// Remove and return the city at the given coordinate.
    ///
    /// Deletion itself is a plain successor splice; once the live size
    /// drops below alpha times the high-water mark the whole tree is
    /// rebuilt, which amortizes the cost of unbalancing deletions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no city sits at that coordinate; the index is
    /// left unchanged.
    pub fn delete(&mut self, position: Point) -> Result<City> {
        let Some(city) = Self::remove_rec(&mut self.root, position) else {
            return Err(CitydexError::NotFound(format!(
                "({}, {})",
                position.x(),
                position.y()
            )));
        };

        self.len -= 1;
        if (self.len as f64) < self.alpha * self.max_len as f64 {
            log::debug!("rebuilding whole spatial tree at {} nodes", self.len);
            Self::rebuild(&mut self.root);
            self.max_len = self.len;
        }
        Ok(city)
    }

    fn remove_rec(slot: &mut Option<Box<Node>>, position: Point) -> Option<City> {
        let node = slot.as_deref_mut()?;
        match coord_cmp(position, node.city.position()) {
            Ordering::Less => {
                let removed = Self::remove_rec(&mut node.left, position)?;
                node.size -= 1;
                Some(removed)
            }
            Ordering::Greater => {
                let removed = Self::remove_rec(&mut node.right, position)?;
                node.size -= 1;
                Some(removed)
            }
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
                        node.size -= 1;
                        let removed = std::mem::replace(&mut node.city, successor);
                        *slot = Some(node);
                        removed
                    }
                };
                Some(removed)
            }
        }
    }

    /// Detach the leftmost node under `slot`, fixing sizes on the way down.
    fn take_min(slot: &mut Option<Box<Node>>) -> Option<City> {
        let node = slot.as_deref_mut()?;
        if node.left.is_some() {
            let city = Self::take_min(&mut node.left)?;
            node.size -= 1;
            Some(city)
        } else {
            let node = slot.take()?;
            let Node { city, right, .. } = *node;
            *slot = right;
            Some(city)
        }
    }

    /// The city closest to `query` in Euclidean distance.
    ///
    /// Ties are broken toward the smallest coordinate in the index's total
    /// order, so the answer is independent of the current tree shape.
    /// Returns `None` on an empty index.
    pub fn nearest_neighbor(&self, query: Point) -> Option<&City> {
        let mut best: Option<(f64, &City)> = None;
        Self::nearest_rec(&self.root, query, &mut best);
        best.map(|(_, city)| city)
    }

    fn nearest_rec<'a>(
        slot: &'a Option<Box<Node>>,
        query: Point,
        best: &mut Option<(f64, &'a City)>,
    ) {
        let Some(node) = slot else {
            return;
        };

        let dist = squared_distance(query, node.city.position());
        let better = match best {
            None => true,
            Some((best_dist, best_city)) => match dist.total_cmp(best_dist) {
                Ordering::Less => true,
                Ordering::Equal => {
                    coord_cmp(node.city.position(), best_city.position()) == Ordering::Less
                }
                Ordering::Greater => false,
            },
        };
        if better {
            *best = Some((dist, &node.city));
        }

        let (near, far) = if coord_cmp(query, node.city.position()) == Ordering::Less {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };
        Self::nearest_rec(near, query, best);

        // Every coordinate in the far subtree lies on the other side of
        // this node's x, so the x gap lower-bounds its distance to the
        // query. `<=` keeps equidistant candidates reachable for the
        // tie-break.
        let gap = node.city.x - query.x();
        let explore_far = match best {
            Some((best_dist, _)) => gap * gap <= *best_dist,
            None => true,
        };
        if explore_far {
            Self::nearest_rec(far, query, best);
        }
    }

    /// All cities in ascending coordinate order.
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
    /// Each node line carries its subtree size; every null child is written
    /// as an explicit `-` marker, so the exact shape can be reconstructed.
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
                writeln!(out, "{} [{}]", node.city, node.size)?;
                Self::dump_rec(&node.left, depth + 1, out)?;
                Self::dump_rec(&node.right, depth + 1, out)
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        fn check(slot: &Option<Box<Node>>) -> usize {
            match slot {
                None => 0,
                Some(node) => {
                    if let Some(left) = node.left.as_deref() {
                        assert_eq!(
                            coord_cmp(left.city.position(), node.city.position()),
                            Ordering::Less
                        );
                    }
                    if let Some(right) = node.right.as_deref() {
                        assert_eq!(
                            coord_cmp(right.city.position(), node.city.position()),
                            Ordering::Greater
                        );
                    }
                    let size = 1 + check(&node.left) + check(&node.right);
                    assert_eq!(node.size, size, "stale subtree size at {}", node.city);
                    size
                }
            }
        }
        assert_eq!(check(&self.root), self.len);
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len)
            .field("alpha", &self.alpha)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, x: f64, y: f64) -> City {
        City::new(name, x, y, 1.0, "black")
    }

    /// Post-insert guarantee of the scapegoat discipline.
    fn height_bound(len: usize, alpha: f64) -> usize {
        if len <= 1 {
            return 0;
        }
        ((len as f64).ln() / (1.0 / alpha).ln()).ceil() as usize
    }

    #[test]
    fn test_insert_and_find() {
        let mut index = SpatialIndex::new();
        index.insert(city("a", 3.0, 4.0)).unwrap();
        index.insert(city("b", 1.0, 2.0)).unwrap();
        index.insert(city("c", 5.0, 6.0)).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.find(Point::new(1.0, 2.0)).unwrap().name, "b");
        assert!(index.find(Point::new(1.0, 3.0)).is_none());
        index.assert_consistent();
    }

    #[test]
    fn test_duplicate_coordinate_rejected() {
        let mut index = SpatialIndex::new();
        index.insert(city("a", 2.0, 2.0)).unwrap();

        let err = index.insert(city("b", 2.0, 2.0)).unwrap_err();
        assert_eq!(err, CitydexError::DuplicateCoordinate(2.0, 2.0));
        assert_eq!(index.len(), 1);
        assert_eq!(index.find(Point::new(2.0, 2.0)).unwrap().name, "a");
        index.assert_consistent();
    }

    #[test]
    fn test_with_alpha_validation() {
        assert!(SpatialIndex::with_alpha(0.5).is_err());
        assert!(SpatialIndex::with_alpha(1.0).is_err());
        assert!(SpatialIndex::with_alpha(0.66).is_ok());
    }

    #[test]
    fn test_ascending_inserts_stay_within_height_bound() {
        let mut index = SpatialIndex::new();
        for i in 0..256 {
            index.insert(city(&format!("c{i}"), i as f64, 0.0)).unwrap();
            assert!(
                index.height() <= height_bound(index.len(), index.alpha()),
                "height {} exceeds bound {} at n = {}",
                index.height(),
                height_bound(index.len(), index.alpha()),
                index.len()
            );
        }
        index.assert_consistent();
    }

    #[test]
    fn test_descending_inserts_stay_within_height_bound() {
        let mut index = SpatialIndex::with_alpha(0.6).unwrap();
        for i in (0..200).rev() {
            index.insert(city(&format!("c{i}"), i as f64, 0.0)).unwrap();
            assert!(index.height() <= height_bound(index.len(), index.alpha()));
        }
        index.assert_consistent();
    }

    #[test]
    fn test_entry_list_follows_coordinate_order() {
        let mut index = SpatialIndex::new();
        index.insert(city("c", 2.0, 0.0)).unwrap();
        index.insert(city("a", 1.0, 5.0)).unwrap();
        index.insert(city("b", 1.0, 9.0)).unwrap();
        index.insert(city("d", 3.0, -1.0)).unwrap();

        let names: Vec<_> = index.entry_list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_delete_and_amortized_rebuild() {
        let mut index = SpatialIndex::new();
        for i in 0..64 {
            index.insert(city(&format!("c{i}"), i as f64, 0.0)).unwrap();
        }
        for i in 0..48 {
            let removed = index.delete(Point::new(i as f64, 0.0)).unwrap();
            assert_eq!(removed.name, format!("c{i}"));
            index.assert_consistent();
        }
        assert_eq!(index.len(), 16);
        // Deletions shrank the tree well past the rebuild threshold, so the
        // remaining structure must be balanced again.
        assert!(index.height() <= height_bound(index.len(), index.alpha()));
    }

    #[test]
    fn test_delete_missing_coordinate() {
        let mut index = SpatialIndex::new();
        index.insert(city("a", 1.0, 1.0)).unwrap();

        assert!(matches!(
            index.delete(Point::new(9.0, 9.0)),
            Err(CitydexError::NotFound(_))
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_delete_two_child_node() {
        let mut index = SpatialIndex::new();
        for (name, x) in [("m", 4.0), ("b", 2.0), ("t", 6.0), ("a", 1.0), ("c", 3.0)] {
            index.insert(city(name, x, 0.0)).unwrap();
        }

        index.delete(Point::new(4.0, 0.0)).unwrap();
        index.assert_consistent();
        let names: Vec<_> = index.entry_list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b", "c", "t"]);
    }

    #[test]
    fn test_nearest_neighbor_basic() {
        let mut index = SpatialIndex::new();
        index.insert(city("near", 1.0, 1.0)).unwrap();
        index.insert(city("mid", 5.0, 5.0)).unwrap();
        index.insert(city("far", 9.0, 9.0)).unwrap();

        let nn = index.nearest_neighbor(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(nn.name, "near");
        let nn = index.nearest_neighbor(Point::new(8.0, 8.0)).unwrap();
        assert_eq!(nn.name, "far");
    }

    #[test]
    fn test_nearest_neighbor_empty() {
        let index = SpatialIndex::new();
        assert!(index.nearest_neighbor(Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_nearest_neighbor_prunes_across_root() {
        // Query on the left of the root, answer on the right.
        let mut index = SpatialIndex::new();
        index.insert(city("root", 5.0, 0.0)).unwrap();
        index.insert(city("left", 1.0, 50.0)).unwrap();
        index.insert(city("right", 6.0, 1.0)).unwrap();

        let nn = index.nearest_neighbor(Point::new(4.0, 1.0)).unwrap();
        assert_eq!(nn.name, "root");
        let nn = index.nearest_neighbor(Point::new(7.0, 1.0)).unwrap();
        assert_eq!(nn.name, "right");
    }

    #[test]
    fn test_nearest_neighbor_tie_break_is_stable() {
        // (1, 0) and (0, 1) are equidistant from the origin; the smaller
        // coordinate in x-then-y order must win every time.
        let mut index = SpatialIndex::new();
        index.insert(city("east", 1.0, 0.0)).unwrap();
        index.insert(city("north", 0.0, 1.0)).unwrap();

        for _ in 0..3 {
            let nn = index.nearest_neighbor(Point::new(0.0, 0.0)).unwrap();
            assert_eq!(nn.name, "north");
        }

        // Force rebuilds by growing and shrinking; the answer must not move.
        for i in 0..32 {
            index.insert(city(&format!("f{i}"), 100.0 + i as f64, 0.0)).unwrap();
        }
        for i in 0..32 {
            index.delete(Point::new(100.0 + i as f64, 0.0)).unwrap();
        }
        let nn = index.nearest_neighbor(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(nn.name, "north");
    }

    #[test]
    fn test_nearest_neighbor_matches_linear_scan() {
        let mut index = SpatialIndex::new();
        let mut cities = Vec::new();
        // Deterministic pseudo-random scatter.
        let mut seed: u64 = 0x9e3779b97f4a7c15;
        for i in 0..128 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = (seed >> 33) % 1000;
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let y = (seed >> 33) % 1000;
            let c = city(&format!("c{i}"), x as f64, y as f64);
            if index.insert(c.clone()).is_ok() {
                cities.push(c);
            }
        }

        for query in [
            Point::new(0.0, 0.0),
            Point::new(500.0, 500.0),
            Point::new(999.0, 1.0),
            Point::new(-50.0, 2000.0),
        ] {
            let nn = index.nearest_neighbor(query).unwrap();
            let best = cities
                .iter()
                .min_by(|a, b| {
                    squared_distance(query, a.position())
                        .total_cmp(&squared_distance(query, b.position()))
                        .then(coord_cmp(a.position(), b.position()))
                })
                .unwrap();
            assert_eq!(nn.name, best.name, "query {:?}", query);
        }
    }

    #[test]
    fn test_clear_resets_high_water_mark() {
        let mut index = SpatialIndex::new();
        for i in 0..16 {
            index.insert(city(&format!("c{i}"), i as f64, 0.0)).unwrap();
        }
        index.clear();
        assert!(index.is_empty());
        assert!(index.nearest_neighbor(Point::new(0.0, 0.0)).is_none());

        // Still usable after clear.
        index.insert(city("again", 1.0, 1.0)).unwrap();
        assert_eq!(index.len(), 1);
        index.assert_consistent();
    }

    #[test]
    fn test_dump_includes_sizes_and_null_markers() {
        let mut index = SpatialIndex::new();
        index.insert(city("a", 2.0, 2.0)).unwrap();
        index.insert(city("b", 1.0, 1.0)).unwrap();

        let mut out = String::new();
        index.dump(&mut out).unwrap();
        assert_eq!(out, "a (2, 2) [2]\n  b (1, 1) [1]\n    -\n    -\n  -\n");
    }
}
