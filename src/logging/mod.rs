//! Structured logging helpers
//!
//! Filter directive construction from [`LoggingConfig`](crate::config::LoggingConfig)
//! and request ID generation.

use uuid::Uuid;

/// Correlation ID attached to every log line emitted while reconciling one
/// request.
///
/// ```
/// let id = vouch::logging::generate_request_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Returns
///
/// A filter string in the format: "base_level,vouch::component1=level1,vouch::component2=level2"
///
/// # Examples
///
/// ```
/// use vouch::config::logging::{LogFormat, LoggingConfig};
/// use vouch::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("identity".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,vouch::identity=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",vouch::{}={}", component, level));
        }
    }

    filter_str
}
