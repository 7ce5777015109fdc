pub mod aggregator;
pub mod overview;
pub mod trend;

pub use aggregator::{
    aggregate, aggregate_auto, hint_allocation, AggregationMode, AggregationSource, ChapterStat,
};
pub use overview::{struggling, summarize, top_performing, Overview};
pub use trend::{chapter_history, trend, trend_with_window, ChapterHistoryEntry, TrendPoint};
