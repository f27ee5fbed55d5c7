pub const APP_NAME: &str = "packline";

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "packline.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "PACKLINE_CONFIG";

/// Stage name reported for failures raised while rendering artifacts.
pub const RENDER_STAGE: &str = "render";

/// Stage name reported for scripts that fail to parse while the graph loads.
pub const PARSE_STAGE: &str = "parse";

/// Suffix appended to an artifact path for its source map.
pub const SOURCEMAP_SUFFIX: &str = ".map";
