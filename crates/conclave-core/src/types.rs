use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A reviewer agent's pass/fail call on a submission.
///
/// Serialized as `"POSITIVE"` / `"NEGATIVE"`, matching the gateway's wire
/// vocabulary.
///
/// # Examples
///
/// ```
/// use conclave_core::Decision;
///
/// let d = Decision::Positive;
/// assert_eq!(serde_json::to_string(&d).unwrap(), "\"POSITIVE\"");
/// assert_eq!(format!("{d}"), "POSITIVE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The agent approves the submission.
    Positive,
    /// The agent rejects the submission.
    Negative,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Positive => write!(f, "POSITIVE"),
            Decision::Negative => write!(f, "NEGATIVE"),
        }
    }
}

/// One reviewer agent's completed verdict for a single submission.
///
/// Immutable once received; the narrative is the agent's accumulated
/// free-form explanation.
///
/// # Examples
///
/// ```
/// use conclave_core::{AgentVerdict, Decision};
///
/// let verdict = AgentVerdict {
///     agent: "melchior".into(),
///     decision: Decision::Positive,
///     narrative: "Well-structured, no issues found. POSITIVE".into(),
/// };
/// assert_eq!(verdict.agent, "melchior");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVerdict {
    /// Reviewer identity (one of the gateway's fixed agent names).
    pub agent: String,
    /// The agent's pass/fail call.
    pub decision: Decision,
    /// Free-form explanation backing the decision.
    pub narrative: String,
}

/// Final outcome of one review request.
///
/// Derived from the collected [`AgentVerdict`]s by majority rule and never
/// mutated afterwards. `partial` is set when fewer agents completed than the
/// gateway was expected to deliver, so callers can tell a truncated
/// consensus from a full one.
///
/// # Examples
///
/// ```
/// use conclave_core::{AgentVerdict, Decision, ReviewVerdict};
///
/// let verdict = ReviewVerdict {
///     request_id: "req-1".into(),
///     final_decision: Decision::Positive,
///     passed: true,
///     partial: false,
///     verdicts: vec![AgentVerdict {
///         agent: "casper".into(),
///         decision: Decision::Positive,
///         narrative: "POSITIVE".into(),
///     }],
/// };
/// assert!(verdict.passed);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewVerdict {
    /// Correlation id of the request this verdict answers.
    pub request_id: String,
    /// Majority outcome: positive iff `passed`.
    pub final_decision: Decision,
    /// Whether at least two agents voted positive.
    pub passed: bool,
    /// Whether the verdict was computed from fewer agents than expected.
    pub partial: bool,
    /// Individual verdicts in arrival order.
    pub verdicts: Vec<AgentVerdict>,
}

impl ReviewVerdict {
    /// Group the verdicts by agent name.
    ///
    /// # Examples
    ///
    /// ```
    /// use conclave_core::{AgentVerdict, Decision, ReviewVerdict};
    ///
    /// let verdict = ReviewVerdict {
    ///     request_id: "req-1".into(),
    ///     final_decision: Decision::Negative,
    ///     passed: false,
    ///     partial: true,
    ///     verdicts: vec![AgentVerdict {
    ///         agent: "balthasar".into(),
    ///         decision: Decision::Negative,
    ///         narrative: "NEGATIVE".into(),
    ///     }],
    /// };
    /// assert!(verdict.per_agent().contains_key("balthasar"));
    /// ```
    pub fn per_agent(&self) -> BTreeMap<&str, &AgentVerdict> {
        self.verdicts
            .iter()
            .map(|v| (v.agent.as_str(), v))
            .collect()
    }
}
