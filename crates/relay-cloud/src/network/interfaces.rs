use std::path::Path;

pub const SYSFS_NET: &str = "/sys/class/net";

/// Link state of `name` under a sysfs-style root. `None` when the
/// interface does not exist or reports `unknown`.
pub fn read_operstate(root: &Path, name: &str) -> Option<bool> {
    let raw = std::fs::read_to_string(root.join(name).join("operstate")).ok()?;
    match raw.trim() {
        "up" => Some(true),
        "down" | "dormant" | "lowerlayerdown" | "notpresent" => Some(false),
        _ => None,
    }
}
