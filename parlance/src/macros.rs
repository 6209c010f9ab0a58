//! Message construction macros.

/// Builds one [`crate::ChatMessage`] from a role shorthand.
///
/// ```rust
/// use parlance::Role;
///
/// let message = parlance::pl_msg!(user => "hello");
/// assert_eq!(message.role, Role::User);
/// ```
#[macro_export]
macro_rules! pl_msg {
    (system => $content:expr) => {
        $crate::ChatMessage::new($crate::Role::System, $content)
    };
    (user => $content:expr) => {
        $crate::ChatMessage::new($crate::Role::User, $content)
    };
    (assistant => $content:expr) => {
        $crate::ChatMessage::new($crate::Role::Assistant, $content)
    };
    (tool => $content:expr) => {
        $crate::ChatMessage::new($crate::Role::Tool, $content)
    };
}

/// Builds a message vector from role shorthands.
///
/// ```rust
/// let messages = parlance::pl_messages![
///     system => "You are concise.",
///     user => "Summarize the repo",
/// ];
/// assert_eq!(messages.len(), 2);
/// ```
#[macro_export]
macro_rules! pl_messages {
    ($($role:ident => $content:expr),* $(,)?) => {
        vec![$($crate::pl_msg!($role => $content)),*]
    };
}
