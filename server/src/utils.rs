use shared::ConnectionId;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const MAX_NAME_CHARS: usize = 32;
pub const MAX_CHAT_CHARS: usize = 500;

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Trim and cap a display name, falling back to a generated one when blank
pub fn normalize_player_name(name: &str, client_id: ConnectionId) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("Player {}", client_id)
    } else {
        trimmed.chars().take(MAX_NAME_CHARS).collect()
    }
}

pub fn truncate_chat(message: &str) -> String {
    message.chars().take(MAX_CHAT_CHARS).collect()
}
