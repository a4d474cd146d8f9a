//! Request-body construction for the review gateway.

/// Context sentence used when the caller supplies none.
pub const DEFAULT_CONTEXT: &str = "Please review the submitted code.";

/// Wrap caller context and code in the envelope the reviewer agents expect.
///
/// The gateway's agents are prompted against a fixed two-part envelope:
/// the task description inside `<user_input>`, the submission inside
/// `<response>`.
///
/// # Examples
///
/// ```
/// use conclave_review::prompt::review_envelope;
///
/// let body = review_envelope("Check error handling", "fn main() {}");
/// assert!(body.starts_with("<user_input>"));
/// assert!(body.contains("fn main() {}"));
/// ```
pub fn review_envelope(context: &str, code: &str) -> String {
    format!("<user_input>\n{context}\n</user_input>\n<response>\n{code}\n</response>")
}
