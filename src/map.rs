//! The city map facade.
//!
//! `CityMap` composes the name index and the spatial index and is the only
//! component allowed to mutate them, so every city is present in both
//! structures or in neither. All duplicate and bounds checks run before any
//! structural change; a rejection from an underlying index after the checks
//! passed means the two structures diverged, which is a bug and panics.

use crate::error::{CitydexError, Result};
use crate::name_index::NameIndex;
use crate::spatial_index::SpatialIndex;
use crate::types::{City, Config};
use geo::Point;

/// Dictionary of cities kept in two synchronized orderings.
///
/// # Examples
///
/// ```rust
/// use citydex::{City, CityMap, Point};
///
/// let mut map = CityMap::new();
/// map.insert(City::new("Annapolis", 12.0, 4.0, 10.0, "red"))?;
/// map.insert(City::new("Baltimore", 3.0, 7.0, 15.0, "blue"))?;
///
/// let nearest = map.nearest_neighbor(Point::new(2.0, 6.0))?;
/// assert_eq!(nearest.name, "Baltimore");
///
/// let removed = map.delete_by_name("Annapolis")?;
/// assert_eq!(removed.x, 12.0);
/// assert_eq!(map.len(), 1);
/// # Ok::<(), citydex::CitydexError>(())
/// ```
pub struct CityMap {
    by_name: NameIndex,
    by_position: SpatialIndex,
    config: Config,
}

impl CityMap {
    /// Create an empty map with the default configuration.
    pub fn new() -> Self {
        Self {
            by_name: NameIndex::new(),
            by_position: SpatialIndex::new(),
            config: Config::default(),
        }
    }

    /// Create an empty map with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            by_name: NameIndex::new(),
            by_position: SpatialIndex::with_alpha(config.alpha)?,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of cities currently held.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the map holds no cities.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Insert a city into both indexes.
    ///
    /// Both duplicate checks (and the bounds check, when bounds are
    /// configured) run before either index is touched, so a failed insert
    /// never leaves a partial entry behind.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds`, `DuplicateName`, or `DuplicateCoordinate`.
    pub fn insert(&mut self, city: City) -> Result<()> {
        if let Some(bounds) = self.config.bounds
            && !bounds.contains(city.position())
        {
            log::warn!("rejecting out-of-bounds city {}", city);
            return Err(CitydexError::OutOfBounds(city.x, city.y));
        }
        if self.by_name.find(&city.name).is_some() {
            return Err(CitydexError::DuplicateName(city.name));
        }
        if self.by_position.find(city.position()).is_some() {
            return Err(CitydexError::DuplicateCoordinate(city.x, city.y));
        }

        log::debug!("inserting {}", city);
        let position = city.position();
        if let Err(err) = self.by_name.insert(city.clone()) {
            panic!("name index rejected an insert that passed the duplicate check: {err}");
        }
        if let Err(err) = self.by_position.insert(city) {
            panic!(
                "spatial index rejected an insert at ({}, {}) that passed the duplicate check: {err}",
                position.x(),
                position.y()
            );
        }
        self.assert_in_sync();
        Ok(())
    }

    /// Remove the city with the given name from both indexes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no city has that name; both indexes are left
    /// unchanged.
    pub fn delete_by_name(&mut self, name: &str) -> Result<City> {
        let city = self.by_name.delete(name)?;
        if let Err(err) = self.by_position.delete(city.position()) {
            panic!("indexes diverged: '{name}' was missing from the spatial index: {err}");
        }
        self.assert_in_sync();
        Ok(city)
    }

    /// Look up a city by name.
    pub fn find_by_name(&self, name: &str) -> Option<&City> {
        self.by_name.find(name)
    }

    /// Look up a city by exact coordinate.
    pub fn find_by_position(&self, position: Point) -> Option<&City> {
        self.by_position.find(position)
    }

    /// All cities in ascending name order.
    pub fn list_by_name(&self) -> Vec<City> {
        self.by_name.entry_list()
    }

    /// The city closest to `query` in Euclidean distance.
    ///
    /// Equidistant candidates resolve deterministically toward the smaller
    /// coordinate, so repeated queries always agree.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` for queries outside configured bounds and
    /// `EmptyIndex` when the map holds no cities.
    pub fn nearest_neighbor(&self, query: Point) -> Result<City> {
        if let Some(bounds) = self.config.bounds
            && !bounds.contains(query)
        {
            return Err(CitydexError::OutOfBounds(query.x(), query.y()));
        }
        self.by_position
            .nearest_neighbor(query)
            .cloned()
            .ok_or(CitydexError::EmptyIndex)
    }

    /// Remove all cities from both indexes.
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_position.clear();
        log::debug!("cleared all cities");
    }

    /// Structural dump of the name tree.
    pub fn dump_name_tree(&self) -> String {
        let mut out = String::new();
        let _ = self.by_name.dump(&mut out);
        out
    }

    /// Structural dump of the spatial tree.
    pub fn dump_spatial_tree(&self) -> String {
        let mut out = String::new();
        let _ = self.by_position.dump(&mut out);
        out
    }

    fn assert_in_sync(&self) {
        debug_assert_eq!(
            self.by_name.len(),
            self.by_position.len(),
            "index sizes diverged"
        );
    }
}

impl Default for CityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityMap")
            .field("len", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
