//! HTML comment envelope attached to every submitted test result.

use std::env;
use sysinfo::System;

const UNKNOWN: &str = "unknown";

/// Where the tests ran. Rendered into the result comment so results from
/// different machines can be told apart in Zephyr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub host: String,
    pub os: String,
    /// Distribution or release, e.g. `Linux (Ubuntu 24.04)`.
    pub os_version: String,
    pub arch: String,
    pub family: String,
}

impl Platform {
    pub fn detect() -> Self {
        let host = System::host_name()
            .or_else(|| env::var("HOSTNAME").ok())
            .or_else(|| env::var("COMPUTERNAME").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let os_version = System::long_os_version()
            .or_else(System::os_version)
            .filter(|version| !version.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            host,
            os: env::consts::OS.to_string(),
            os_version,
            arch: env::consts::ARCH.to_string(),
            family: env::consts::FAMILY.to_string(),
        }
    }
}

pub fn format_comment(platform: &Platform, script: &str, comment: &str) -> String {
    format!(
        "<b>Host:</b> {} ({}/{})<br/><b>Platform:</b> {} ({})<br/><b>Script/Method:</b> {}<br/>{}",
        escape_html(&platform.host),
        platform.os,
        platform.arch,
        platform.family,
        escape_html(&platform.os_version),
        escape_html(script),
        comment
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
