//! Embedded dual-index dictionary of named 2D points ("cities").
//!
//! Every city is held in two synchronized orderings over the same set: a
//! binary search tree ordered by name and a scapegoat tree ordered by
//! coordinate, so name lookups, coordinate lookups, nearest-neighbor
//! queries, and ordered enumeration are all efficient.
//!
//! ```rust
//! use citydex::{City, CityMap, Point};
//!
//! let mut map = CityMap::new();
//! map.insert(City::new("Annapolis", 12.0, 4.0, 10.0, "red"))?;
//! map.insert(City::new("Baltimore", 3.0, 7.0, 15.0, "blue"))?;
//!
//! let nearest = map.nearest_neighbor(Point::new(2.0, 6.0))?;
//! assert_eq!(nearest.name, "Baltimore");
//! # Ok::<(), citydex::CitydexError>(())
//! ```

pub mod error;
pub mod map;
pub mod name_index;
pub mod spatial_index;
pub mod types;

pub use error::{CitydexError, Result};
pub use map::CityMap;
pub use name_index::NameIndex;
pub use spatial_index::{DEFAULT_ALPHA, SpatialIndex};
pub use types::{City, Config, MapBounds, coord_cmp};

pub use geo::Point;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{CityMap, CitydexError, Result};

    pub use crate::{City, Config, MapBounds};

    pub use geo::Point;
}
