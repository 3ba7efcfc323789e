pub mod answer;
pub mod chat;
pub mod mastery;
pub mod question;
pub mod selection;
pub mod session;

pub use answer::{AnswerEvent, AnswerSubmission};
pub use question::{AnswerOption, Question, QuestionStats};
pub use selection::{BatchRequest, SelectedQuestion, SelectionReason};
pub use session::{CounterSnapshot, SessionStatus, SessionSummary};
