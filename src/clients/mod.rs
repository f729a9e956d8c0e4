pub mod llm_client;
pub mod llm_oracle;
pub mod oracle;

pub use llm_client::LlmClient;
pub use llm_oracle::LlmOracle;
pub use oracle::{
    AnalysisOracle, AnalysisResponse, CorrectionOracle, CorrectionResponse, GenerationOracle,
    GenerationRequest, GenerationResponse, OracleError, RawStep, VerificationOracle,
    VerificationRequest, VerificationResponse,
};
