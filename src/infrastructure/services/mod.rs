//! Cache clients for expensive upstream work

mod repository_graph_cache;
mod speech_cache;
mod text_analysis_cache;

pub use repository_graph_cache::{
    RepositoryGraphCache, RepositoryGraphCacheConfig, REPOSITORY_SCOPE,
};
pub use speech_cache::{SpeechCache, SpeechCacheConfig, SPEECH_SCOPE};
pub use text_analysis_cache::{ANALYSIS_SCOPE, TextAnalysisCache, TextAnalysisCacheConfig};
