//! Core value types and configuration for citydex.
//!
//! This module defines the `City` entity indexed by both trees, the total
//! coordinate order shared by the spatial index, and the serializable
//! `Config` controlling balance and map bounds.

use crate::error::{CitydexError, Result};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A named point of interest with display attributes.
///
/// Immutable once constructed. Within a live `CityMap` no two cities share
/// a name and no two share a coordinate; the facade enforces both before
/// insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Unique display name, the key of the name index.
    pub name: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Display radius.
    pub radius: f64,
    /// Display color.
    pub color: String,
}

impl City {
    /// Create a new city.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citydex::City;
    ///
    /// let city = City::new("Annapolis", 12.0, 4.0, 10.0, "red");
    /// assert_eq!(city.name, "Annapolis");
    /// ```
    pub fn new<N: Into<String>, C: Into<String>>(
        name: N,
        x: f64,
        y: f64,
        radius: f64,
        color: C,
    ) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            radius,
            color: color.into(),
        }
    }

    /// The city's coordinate as a `geo` point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.x, self.y)
    }
}

/// Total order on coordinates: x first, then y.
///
/// This is the single scalar ordering of the spatial index. `f64::total_cmp`
/// makes it a genuine total order even for non-finite inputs.
pub fn coord_cmp(a: Point, b: Point) -> Ordering {
    a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y()))
}

/// Rectangular map extent anchored at the origin.
///
/// When configured, cities and nearest-neighbor queries outside
/// `[0, width] x [0, height]` are rejected with `OutOfBounds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// X extent of the map.
    pub width: f64,
    /// Y extent of the map.
    pub height: f64,
}

impl MapBounds {
    /// Create a new map extent.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether a point lies inside the map.
    pub fn contains(&self, point: Point) -> bool {
        point.x() >= 0.0 && point.x() <= self.width && point.y() >= 0.0 && point.y() <= self.height
    }
}

/// Dictionary configuration.
///
/// Designed to be easily loadable from JSON or other formats while keeping
/// complexity minimal.
///
/// # Example
///
/// ```rust
/// use citydex::Config;
///
/// // Default config
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// // Load from JSON
/// let json = r#"{
///     "alpha": 0.65,
///     "bounds": { "width": 512.0, "height": 512.0 }
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.alpha, 0.65);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scapegoat looseness parameter, strictly between 0.5 and 1.0.
    ///
    /// Lower values keep the spatial tree shallower at the cost of more
    /// frequent rebuilds.
    #[serde(default = "Config::default_alpha")]
    pub alpha: f64,

    /// Optional map extent; `None` disables bounds checking.
    #[serde(default)]
    pub bounds: Option<MapBounds>,
}

impl Config {
    const fn default_alpha() -> f64 {
        0.7
    }

    /// Set the scapegoat looseness parameter.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the map extent.
    pub fn with_bounds(mut self, width: f64, height: f64) -> Self {
        self.bounds = Some(MapBounds::new(width, height));
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.5 || self.alpha >= 1.0 {
            return Err(CitydexError::InvalidConfig(format!(
                "alpha must lie strictly between 0.5 and 1.0, got {}",
                self.alpha
            )));
        }

        if let Some(bounds) = self.bounds {
            if !bounds.width.is_finite() || !bounds.height.is_finite() {
                return Err(CitydexError::InvalidConfig(
                    "map bounds must be finite".to_string(),
                ));
            }
            if bounds.width <= 0.0 || bounds.height <= 0.0 {
                return Err(CitydexError::InvalidConfig(
                    "map bounds must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: Self::default_alpha(),
            bounds: None,
        }
    }
}
