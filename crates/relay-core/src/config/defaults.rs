// Single source of truth for all default values.

// --- Site ---
pub const DEFAULT_SITE_ID: &str = "site-001";

// --- Queue ---
pub const DEFAULT_QUEUE_DB_PATH: &str = "relay-queue.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 2;
pub const DEFAULT_MAX_PENDING: u64 = 10_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.5;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 5;
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 300; // 5 minutes

// --- Broker ---
pub const DEFAULT_BROKER_PORT: u16 = 8443;
pub const DEFAULT_CERT_PATH: &str = "certs/certificate.pem.crt";
pub const DEFAULT_KEY_PATH: &str = "certs/private.pem.key";
pub const DEFAULT_ROOT_CA_PATH: &str = "certs/AmazonRootCA1.pem";
pub const DEFAULT_TOPIC_PREFIX: &str = "dt/transformer";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DISCONNECT_TIMEOUT_SECS: u64 = 5;

// --- Connection ---
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 1;
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 32;
pub const DEFAULT_STABLE_RESET_SECS: u64 = 60;

// --- Delivery ---
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DRAIN_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_UNREACHABLE_WAIT_SECS: u64 = 10;
pub const DEFAULT_COMPRESSION_ENABLED: bool = true;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
pub const DEFAULT_BANDWIDTH_LIMIT_KBPS: u64 = 50;

// --- Bulk ---
pub const DEFAULT_BULK_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BULK_BACKOFF_BASE_SECS: u64 = 2;
pub const DEFAULT_BULK_BACKOFF_CAP_SECS: u64 = 120;
pub const DEFAULT_BULK_MAX_QUEUE: u64 = 500;
pub const DEFAULT_BULK_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BULK_FS_ROOT: &str = "uploads";

// --- Network ---
pub const DEFAULT_PROBE_HOST: &str = "8.8.8.8";
pub const DEFAULT_PROBE_PORT: u16 = 53;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_NETWORK_CHECK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_INTERFACES: &[&str] = &["eth0", "wlan0"];

// --- Health ---
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_HEALTH_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_MIN_FREE_DISK_BYTES: u64 = 1_073_741_824; // 1 GiB
pub const DEFAULT_DISK_PATH: &str = "/";
pub const DEFAULT_MAX_MEMORY_PERCENT: f64 = 90.0;
pub const DEFAULT_MAX_CPU_TEMP_C: f64 = 80.0;
pub const DEFAULT_THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

// --- Recovery ---
pub const DEFAULT_RECOVERY_COOLDOWN_SECS: u64 = 300; // 5 minutes
pub const DEFAULT_SENSOR_SETTLE_SECS: u64 = 2;
pub const DEFAULT_BULK_CLEANUP_FRACTION: f64 = 0.5;
pub const DEFAULT_TELEMETRY_CLEANUP_FRACTION: f64 = 0.3;

// --- Heartbeat ---
pub const DEFAULT_HEARTBEAT_ENABLED: bool = true;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 300;

// --- Watchdog ---
pub const DEFAULT_WATCHDOG_ENABLED: bool = false;
pub const DEFAULT_WATCHDOG_DEVICE: &str = "/dev/watchdog";
pub const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 10; // bcm2835 times out at ~15s

// --- Storage collaborator ---
pub const DEFAULT_EMERGENCY_TARGET_FREE_BYTES: u64 = 2_147_483_648; // 2 GiB
