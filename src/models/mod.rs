pub mod loaders;
pub mod session;
pub mod solution;
pub mod submission;

pub use loaders::{load_question_file, QuestionFile, QuestionItem};
pub use session::{CacheEntry, Phase, ProgressionState, Transition};
pub use solution::{SolutionSet, SolutionStep, VerificationResult};
pub use submission::{FilePayload, Submission, SubmissionId};
