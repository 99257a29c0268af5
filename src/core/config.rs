//! Canvas tunables loaded from environment variables.
//!
//! Load configuration using `CanvasConfig::from_env()` after calling `dotenvy::dotenv()`.
//! Missing or unparsable values fall back to the defaults.

/// Default node height before any field rows
pub const DEFAULT_BASE_NODE_HEIGHT: f64 = 60.0;

/// Default height of one field row
pub const DEFAULT_FIELD_ROW_HEIGHT: f64 = 28.0;

/// Default node width when the table has no size or size preference
pub const DEFAULT_NODE_WIDTH: f64 = 280.0;

/// Drag moves shorter than this are treated as clicks
pub const DEFAULT_POSITION_EPSILON: f64 = 0.5;

/// Resize deltas up to this are layout rounding, not user intent
pub const DEFAULT_DIMENSION_TOLERANCE: f64 = 1.0;

/// Geometry and debounce settings for the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub base_node_height: f64,
    pub field_row_height: f64,
    pub default_node_width: f64,
    pub position_epsilon: f64,
    pub dimension_tolerance: f64,
}

impl CanvasConfig {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests need not touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: f64| -> f64 {
            match lookup(key) {
                None => default,
                Some(raw) => match raw.trim().parse::<f64>() {
                    Ok(value) if value.is_finite() && value >= 0.0 => value,
                    _ => {
                        tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
                        default
                    }
                },
            }
        };

        Self {
            base_node_height: read("CANVAS_BASE_NODE_HEIGHT", DEFAULT_BASE_NODE_HEIGHT),
            field_row_height: read("CANVAS_FIELD_ROW_HEIGHT", DEFAULT_FIELD_ROW_HEIGHT),
            default_node_width: read("CANVAS_DEFAULT_NODE_WIDTH", DEFAULT_NODE_WIDTH),
            position_epsilon: read("CANVAS_POSITION_EPSILON", DEFAULT_POSITION_EPSILON),
            dimension_tolerance: read("CANVAS_DIMENSION_TOLERANCE", DEFAULT_DIMENSION_TOLERANCE),
        }
    }

    /// Height of a node showing `field_count` rows
    pub fn node_height(&self, field_count: usize) -> f64 {
        self.base_node_height + field_count as f64 * self.field_row_height
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_node_height: DEFAULT_BASE_NODE_HEIGHT,
            field_row_height: DEFAULT_FIELD_ROW_HEIGHT,
            default_node_width: DEFAULT_NODE_WIDTH,
            position_epsilon: DEFAULT_POSITION_EPSILON,
            dimension_tolerance: DEFAULT_DIMENSION_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = CanvasConfig::from_lookup(|_| None);
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = CanvasConfig::from_lookup(lookup_from(&[
            ("CANVAS_FIELD_ROW_HEIGHT", "32"),
            ("CANVAS_POSITION_EPSILON", " 2.5 "),
        ]));

        assert_eq!(config.field_row_height, 32.0);
        assert_eq!(config.position_epsilon, 2.5);
        assert_eq!(config.base_node_height, DEFAULT_BASE_NODE_HEIGHT);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = CanvasConfig::from_lookup(lookup_from(&[
            ("CANVAS_BASE_NODE_HEIGHT", "tall"),
            ("CANVAS_DIMENSION_TOLERANCE", "-1"),
        ]));

        assert_eq!(config.base_node_height, DEFAULT_BASE_NODE_HEIGHT);
        assert_eq!(config.dimension_tolerance, DEFAULT_DIMENSION_TOLERANCE);
    }

    #[test]
    fn test_node_height() {
        let config = CanvasConfig::default();
        assert_eq!(config.node_height(0), 60.0);
        assert_eq!(config.node_height(3), 60.0 + 3.0 * 28.0);
    }
}
