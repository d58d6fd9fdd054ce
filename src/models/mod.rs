// Domain models: raw samples, hourly summaries, metric kinds

mod kind;
mod sample;
mod summary;

pub use kind::MetricKind;
pub use sample::RawSample;
pub use summary::{HourlyTotal, SeriesHour, TrafficSummary};
