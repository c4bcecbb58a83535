pub mod badges;
pub mod llm;
pub mod parse;
pub mod prompts;
pub mod providers;
pub mod recap;

pub use badges::{BadgeEvaluator, EvaluationOutcome};
pub use llm::{build_client, CompletionParams, LlmClient};
pub use parse::{parse_recap_analysis, RecapAnalysis};
pub use recap::{AnalysisData, AnalyzeOutcome, PrepareOutcome, RecapPipeline};
