use chrono::NaiveDate;
use mindmap_core::{Badge, DateRange, Recap, UserStats};
use mindmap_insight::{AnalysisData, RecapAnalysis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRangeDto {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<DateRange> for DateRangeDto {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
        }
    }
}

impl DateRangeDto {
    pub fn into_range(self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DebugCounts {
    pub total_badges: usize,
    pub already_unlocked: usize,
    pub evaluated: usize,
}

/// `POST /badges/check-unlock` response.
#[derive(Debug, Serialize)]
pub struct CheckUnlockResponse {
    pub success: bool,
    pub newly_unlocked: Vec<Badge>,
    pub stats: UserStats,
    pub debug: DebugCounts,
}

/// `POST /recap/recap` response.
#[derive(Debug, Serialize)]
pub struct RecapPrepareResponse {
    pub existing_recap: bool,
    pub date_range: DateRangeDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recap_data: Option<Recap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_data: Option<AnalysisData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_entries: Option<bool>,
}

/// `POST /recap/recap-analyzer` request.
#[derive(Debug, Deserialize)]
pub struct RecapAnalyzerRequest {
    #[serde(default)]
    pub data: Option<String>,
    pub date_range: DateRangeDto,
    pub user_uid: String,
}

/// `POST /recap/recap-analyzer` response; one of three shapes.
#[derive(Debug, Default, Serialize)]
pub struct RecapAnalyzerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recap: Option<Recap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<RecapAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRangeDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_entries: Option<bool>,
}

impl RecapAnalyzerResponse {
    pub fn created(recap: Recap, analysis: RecapAnalysis, range: DateRangeDto) -> Self {
        Self {
            recap: Some(recap),
            ai_analysis: Some(analysis),
            date_range: Some(range),
            ..Self::default()
        }
    }

    pub fn skipped(recap: Recap) -> Self {
        Self {
            recap: Some(recap),
            skipped: Some(true),
            ..Self::default()
        }
    }

    pub fn no_entries() -> Self {
        Self {
            has_entries: Some(false),
            ..Self::default()
        }
    }
}
