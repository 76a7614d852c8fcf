/// Content limits and lifecycle windows
///
/// Held by every store so limits are testable and overridable per deployment.
/// Lengths are counted in characters, not bytes. Content limits may not
/// exceed the width of the column they are stored in.
///
/// # Defaults
///
/// - Question content: 40
/// - Vote question content: 20
/// - Vote option content: 10
/// - Comment content: 100
/// - Options per vote question: 2..=4
/// - Expiry window: 24 hours

use chrono::Duration;

/// Width of `questions.content`, shared by normal and vote questions
pub const QUESTION_CONTENT_COLUMN: usize = 500;

/// Width of `vote_options.content`
pub const VOTE_OPTION_CONTENT_COLUMN: usize = 100;

/// Width of `comments.content`
pub const COMMENT_CONTENT_COLUMN: usize = 1024;

/// Content-length limits, option bounds and the expiry window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum characters in a normal/challenge question
    pub question_content: usize,

    /// Maximum characters in a vote question
    pub vote_question_content: usize,

    /// Maximum characters in each vote option
    pub vote_option_content: usize,

    /// Maximum characters in a text comment
    pub comment_content: usize,

    /// Fewest options a vote question may carry
    pub min_options: usize,

    /// Most options a vote question may carry
    pub max_options: usize,

    /// Questions older than this (strictly) are expired
    pub expiry_window: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            question_content: 40,
            vote_question_content: 20,
            vote_option_content: 10,
            comment_content: 100,
            min_options: 2,
            max_options: 4,
            expiry_window: Duration::hours(24),
        }
    }
}
