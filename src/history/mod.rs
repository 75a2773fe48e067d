//! Transcription history as seen from a window.
//!
//! History lives in the backend; a window only re-queries it.  This module
//! holds the wire models, the paging cursor the dashboard list uses, and the
//! rough cost estimate shown next to the stats.  None of it is part of the
//! pipeline projection.

use serde::{Deserialize, Serialize};

/// Page size used by the dashboard list.
pub const PAGE_SIZE: u32 = 20;

/// Estimated USD cost of one transcription request.
pub const COST_PER_TRANSCRIPTION: f64 = 0.001;

/// Estimated USD cost of one refinement request.
pub const COST_PER_REFINEMENT: f64 = 0.0003;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// One stored dictation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub id: String,
    pub raw_text: String,
    pub refined_text: String,
    pub stt_latency_ms: i64,
    pub llm_latency_ms: i64,
    pub word_count: i64,
    pub created_at: String,
}

/// Aggregates over the whole history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionStats {
    pub total_transcriptions: i64,
    pub total_words: i64,
    pub words_today: i64,
    pub words_this_week: i64,
    pub words_this_month: i64,
    pub avg_stt_latency_ms: f64,
    pub avg_llm_latency_ms: f64,
}

/// Arguments of `list_transcriptions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: u32,
    pub offset: u32,
    /// Case-insensitive substring filter; `None` lists everything.
    pub search: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: PAGE_SIZE,
            offset: 0,
            search: None,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryPager
// ---------------------------------------------------------------------------

/// Offset cursor for an infinitely scrolling list.
///
/// ```
/// use voiceflow_client::history::HistoryPager;
///
/// let mut pager = HistoryPager::new(2);
/// let q = pager.next_query();
/// assert_eq!((q.limit, q.offset), (2, 0));
///
/// pager.record_page(2);            // full page → maybe more
/// assert!(pager.has_more());
/// assert_eq!(pager.next_query().offset, 2);
///
/// pager.record_page(1);            // short page → end of list
/// assert!(!pager.has_more());
/// ```
#[derive(Debug, Clone)]
pub struct HistoryPager {
    page_size: u32,
    offset: u32,
    search: Option<String>,
    has_more: bool,
}

impl HistoryPager {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            offset: 0,
            search: None,
            has_more: true,
        }
    }

    /// Query for the next page.
    pub fn next_query(&self) -> HistoryQuery {
        HistoryQuery {
            limit: self.page_size,
            offset: self.offset,
            search: self.search.clone(),
        }
    }

    /// Record that the page from [`next_query`](Self::next_query) returned
    /// `len` items.
    pub fn record_page(&mut self, len: usize) {
        self.offset += self.page_size;
        self.has_more = len == self.page_size as usize;
    }

    /// Restart from the first page with a new filter.  A blank search is the
    /// same as no search.
    pub fn set_search(&mut self, search: Option<&str>) {
        self.search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self.reset();
    }

    /// Restart from the first page, keeping the filter.  Called when a new
    /// pipeline result arrives.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.has_more = true;
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}

impl Default for HistoryPager {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

/// Rough total spend in USD.
pub fn estimate_cost(stats: &TranscriptionStats) -> f64 {
    stats.total_transcriptions.max(0) as f64 * (COST_PER_TRANSCRIPTION + COST_PER_REFINEMENT)
}

/// Whitespace-separated word count, as stored with each transcription.
pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_query_uses_default_page() {
        let q = HistoryPager::default().next_query();
        assert_eq!(q, HistoryQuery::default());
    }

    #[test]
    fn search_resets_offset_and_trims() {
        let mut pager = HistoryPager::new(5);
        pager.record_page(5);
        pager.set_search(Some("  meeting "));

        let q = pager.next_query();
        assert_eq!(q.offset, 0);
        assert_eq!(q.search.as_deref(), Some("meeting"));
        assert!(pager.has_more());
    }

    #[test]
    fn blank_search_clears_filter() {
        let mut pager = HistoryPager::new(5);
        pager.set_search(Some("x"));
        pager.set_search(Some("   "));
        assert_eq!(pager.next_query().search, None);
    }

    #[test]
    fn reset_keeps_filter() {
        let mut pager = HistoryPager::new(5);
        pager.set_search(Some("notes"));
        pager.record_page(5);
        pager.reset();
        let q = pager.next_query();
        assert_eq!(q.offset, 0);
        assert_eq!(q.search.as_deref(), Some("notes"));
    }

    #[test]
    fn cost_scales_with_transcriptions() {
        let stats = TranscriptionStats {
            total_transcriptions: 1000,
            ..Default::default()
        };
        assert!((estimate_cost(&stats) - 1.3).abs() < 1e-9);
        assert_eq!(estimate_cost(&TranscriptionStats::default()), 0.0);
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  hello   there world "), 3);
        assert_eq!(word_count(""), 0);
    }
}
