//! Core type definitions for ScanWatch
//!
//! The watchlist types mirror the JSON shape stored by the extension; the
//! event and tab types mirror what the browser hands to the background page.

use serde::{Deserialize, Serialize};

// =============================================================================
// Watchlist
// =============================================================================

/// One site's watch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WatchEntry {
    /// Site is enabled
    #[serde(default)]
    pub active: bool,
    /// Frames (hosts) belonging to the site
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

/// A host eligible for scanning when both it and its site are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Hostname or host match pattern (`*.mail.example.com`)
    pub frame: String,
    /// Scanning enabled for this host
    #[serde(default)]
    pub scan: bool,
}

impl WatchEntry {
    /// Hosts of this entry that are eligible for injection.
    pub fn scan_hosts(&self) -> impl Iterator<Item = &str> {
        self.frames
            .iter()
            .filter(move |f| self.active && f.scan)
            .map(|f| f.frame.as_str())
    }
}

// =============================================================================
// Request Types (bit mask for event filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask for load-completion subscriptions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u8 {
        const OTHER = 1 << 0;
        const MAIN_FRAME = 1 << 1;  // top-level document
        const SUB_FRAME = 1 << 2;   // iframe/frame

        /// Document types (main_frame + sub_frame)
        const DOCUMENT = Self::MAIN_FRAME.bits() | Self::SUB_FRAME.bits();
    }
}

impl RequestType {
    /// Parse from browser request type string.
    pub fn from_browser(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::MAIN_FRAME,
            "sub_frame" | "subdocument" => Self::SUB_FRAME,
            _ => Self::OTHER,
        }
    }

    /// Browser names of the document types contained in this mask.
    pub fn browser_names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(2);
        if self.contains(Self::MAIN_FRAME) {
            names.push("main_frame");
        }
        if self.contains(Self::SUB_FRAME) {
            names.push("sub_frame");
        }
        names
    }
}

// =============================================================================
// Browser-side values
// =============================================================================

/// Tab id the browser reports for requests not related to a tab.
pub const TAB_ID_NONE: i32 = -1;

/// An open top-level page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: i32,
    pub url: String,
}

/// Which frames of a tab an injection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScope {
    /// Every frame of the tab
    AllFrames,
    /// Exactly one frame
    Frame(i32),
}

/// Filter attached to a load-completion subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    /// URL match patterns (`*://host/*`)
    pub urls: Vec<String>,
    /// Request types delivered to the listener
    pub types: RequestType,
}

/// A completed main-frame or sub-frame load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCompletedEvent {
    /// Request URL
    pub url: String,
    /// Tab ID, `TAB_ID_NONE` for background requests
    pub tab_id: i32,
    /// Frame ID (0 for the top-level frame)
    pub frame_id: i32,
    /// Request type
    pub request_type: RequestType,
}

impl LoadCompletedEvent {
    /// Is this request associated with a browser tab?
    #[inline]
    pub fn has_tab(&self) -> bool {
        self.tab_id != TAB_ID_NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_hosts_requires_active_and_scan() {
        let entry = WatchEntry {
            active: true,
            frames: vec![
                FrameEntry { frame: "mail.example.com".into(), scan: true },
                FrameEntry { frame: "cdn.example.com".into(), scan: false },
            ],
        };
        assert_eq!(entry.scan_hosts().collect::<Vec<_>>(), vec!["mail.example.com"]);

        let inactive = WatchEntry { active: false, ..entry };
        assert_eq!(inactive.scan_hosts().count(), 0);
    }

    #[test]
    fn test_watch_entry_missing_frames() {
        let entry: WatchEntry = serde_json::from_str(r#"{"active": true}"#).unwrap();
        assert!(entry.frames.is_empty());
    }

    #[test]
    fn test_request_type_names() {
        assert_eq!(RequestType::DOCUMENT.browser_names(), vec!["main_frame", "sub_frame"]);
        assert_eq!(RequestType::from_browser("sub_frame"), RequestType::SUB_FRAME);
        assert_eq!(RequestType::from_browser("image"), RequestType::OTHER);
    }

    #[test]
    fn test_event_has_tab() {
        let event = LoadCompletedEvent {
            url: "https://example.com/".into(),
            tab_id: TAB_ID_NONE,
            frame_id: 0,
            request_type: RequestType::MAIN_FRAME,
        };
        assert!(!event.has_tab());
    }
}
