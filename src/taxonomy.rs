//! Folder taxonomy
//!
//! System folders are the fixed recruiting stages shared by every client.
//! Any other non-empty folder name is a client-specific custom stage.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Known system folder names, lowercase
pub const SYSTEM_FOLDERS: [&str; 17] = [
    "inbox",
    "unresponsive",
    "completed",
    "unresponsive talkscore",
    "passed mq",
    "failed mq",
    "talkscore retake",
    "unresponsive talkscore retake",
    "failed talkscore",
    "cold leads",
    "cold leads talkscore",
    "cold leads talkscore retake",
    "on hold",
    "rejected",
    "talent pool",
    "shortlisted",
    "hired",
];

static SYSTEM_FOLDER_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SYSTEM_FOLDERS.iter().copied().collect());

/// Whether `name` is one of the system folders (case-insensitive, trimmed)
pub fn is_system_folder(name: &str) -> bool {
    SYSTEM_FOLDER_SET.contains(name.trim().to_lowercase().as_str())
}

/// Whether `name` is a client folder: non-empty and outside the system taxonomy
pub fn is_client_folder(name: &str) -> bool {
    !name.trim().is_empty() && !is_system_folder(name)
}
