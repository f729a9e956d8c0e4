pub mod oracle_guard;
pub mod question_analyzer;
pub mod report_writer;
pub mod step_generator;
pub mod text_corrector;
pub mod verifier;

pub use oracle_guard::OracleGuard;
pub use question_analyzer::QuestionAnalyzer;
pub use report_writer::ReportWriter;
pub use step_generator::StepGenerator;
pub use text_corrector::{TextCorrector, CORRECTION_PASSES};
pub use verifier::Verifier;
