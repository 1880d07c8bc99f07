pub const SESSION_ID_KEY: &str = "fork-gateway-session";
pub const SESSION_EXPIRATION_HOURS: i64 = 8;

/// リクエスト全体のタイムアウト(秒)
pub const TIMEOUT_DURATION: u64 = 30;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_GITHUB_OAUTH_URL: &str = "https://github.com/login/oauth/";
pub const DEFAULT_OAUTH_SCOPE: &str = "public_repo";
pub const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// 本番では必ず SECRET_KEY で上書きすること
pub const DEFAULT_SECRET_KEY: &str =
    "fork-gateway-insecure-placeholder-secret-key-override-with-SECRET_KEY";
pub const MIN_SECRET_KEY_LEN: usize = 64;

/// 手動でのアクセス取り消し用ページ
pub const GITHUB_APPLICATION_SETTINGS_URL: &str =
    "https://github.com/settings/connections/applications";

/// クッキーに載せる details の上限
pub const MAX_FLASH_DETAIL_LEN: usize = 1500;

/// セッションクッキーの値の上限. 署名と属性を足しても 4096 バイトに収まる
pub const MAX_SESSION_COOKIE_LEN: usize = 3800;

pub const USER_AGENT: &str = concat!("fork-gateway/", env!("CARGO_PKG_VERSION"));
