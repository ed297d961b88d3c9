//! Ordering helpers over a role-tagged conversation

use super::entities::Message;

/// Insert role text immediately before the content of the first user-authored
/// message, leaving the system message (and the input itself) untouched.
///
/// Returns a new list; when there is no user message the copy is unmodified.
pub fn prepend_role_to_conversation(conversation: &[Message], role_text: &str) -> Vec<Message> {
    let mut out: Vec<Message> = conversation.to_vec();
    if let Some(first_user) = out.iter_mut().find(|m| m.is_user()) {
        first_user.content = format!("{}{}", role_text, first_user.content);
    }
    out
}
