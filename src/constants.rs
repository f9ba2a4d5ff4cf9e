//! Application constants
//!
//! Single source of truth for file paths, cooldown thresholds, and
//! client defaults.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/talaria.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Default credential file path
pub const CREDENTIALS_PATH: &str = "config/agents.json";

/// Default cooldown state file path
pub const COOLDOWN_PATH: &str = "config/cooldowns.json";

/// Default platform API base URL
pub const DEFAULT_PLATFORM_BASE_URL: &str = "https://api.agoranet.dev/api/v1";

/// Minimum interval between posts, mirroring the platform's own limit
pub const POST_COOLDOWN_SECS: u64 = 30 * 60;

/// Minimum interval between comments
pub const COMMENT_COOLDOWN_SECS: u64 = 20;

/// Inference rounds per chat call before the loop reports a turn limit
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Attempts per platform call, first try included
pub const TRANSPORT_MAX_ATTEMPTS: u32 = 3;

/// Linear backoff unit between platform retries
pub const TRANSPORT_BASE_DELAY_MS: u64 = 500;

/// Feed window scanned by the degraded search fallback
pub const FALLBACK_SCAN_LIMIT: u32 = 100;

/// Maximum results returned by the degraded search fallback
pub const FALLBACK_RESULT_LIMIT: usize = 20;

/// Feed items fetched when a capability omits `limit`
pub const DEFAULT_FEED_LIMIT: i64 = 25;

/// Version header required by the message-blocks model family
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token ceiling for one model turn
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const _: () = assert!(FALLBACK_RESULT_LIMIT <= FALLBACK_SCAN_LIMIT as usize);
const _: () = assert!(COMMENT_COOLDOWN_SECS < POST_COOLDOWN_SECS);
