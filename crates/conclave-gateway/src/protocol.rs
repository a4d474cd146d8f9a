//! Wire protocol of the review gateway.
//!
//! The gateway speaks JSON text frames over the WebSocket. Outbound, one
//! `agent_judgement` frame per review request addressed to the fixed roster
//! of three reviewer agents. Inbound, a stream of `agent_response` frames in
//! which each agent delivers its narrative in chunks; a chunk with
//! `status == "completed"` finalizes that agent's verdict. The frame shapes
//! and the agent roster are the gateway's contract and are not negotiated.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use conclave_core::Decision;

/// Number of agent verdicts the gateway delivers per request.
pub const EXPECTED_VERDICTS: usize = 3;

/// The gateway's fixed reviewer roster: `(name, agent id)`.
pub const AGENT_ROSTER: [(&str, &str); EXPECTED_VERDICTS] = [
    ("melchior", "d37c1cc8-bcc4-4b73-9f49-a93a30971f2c"),
    ("balthasar", "6634d0ec-d700-4a92-9066-4960a0f11927"),
    ("casper", "89cbe912-25d0-47b0-97da-b25622bfac0d"),
];

/// Resolve a roster agent id to its name.
///
/// # Examples
///
/// ```
/// use conclave_gateway::protocol::agent_name;
///
/// assert_eq!(
///     agent_name("d37c1cc8-bcc4-4b73-9f49-a93a30971f2c"),
///     Some("melchior")
/// );
/// assert_eq!(agent_name("not-a-reviewer"), None);
/// ```
pub fn agent_name(agent_id: &str) -> Option<&'static str> {
    AGENT_ROSTER
        .iter()
        .find(|(_, id)| *id == agent_id)
        .map(|(name, _)| *name)
}

/// Extract an agent's decision from its accumulated narrative.
///
/// The gateway does not carry a structured decision field; by contract the
/// narrative of an approving agent contains the literal `POSITIVE`.
///
/// # Examples
///
/// ```
/// use conclave_core::Decision;
/// use conclave_gateway::protocol::decision_from_narrative;
///
/// assert_eq!(
///     decision_from_narrative("Looks solid. POSITIVE"),
///     Decision::Positive
/// );
/// assert_eq!(decision_from_narrative("reject"), Decision::Negative);
/// ```
pub fn decision_from_narrative(narrative: &str) -> Decision {
    if narrative.contains("POSITIVE") {
        Decision::Positive
    } else {
        Decision::Negative
    }
}

/// Reference to a roster agent inside an outbound frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRef {
    /// Roster agent id.
    pub agent_id: String,
}

/// Outbound review request frame (`type: "agent_judgement"`).
///
/// # Examples
///
/// ```
/// use conclave_gateway::protocol::ReviewRequestFrame;
///
/// let frame = ReviewRequestFrame::new("req-1", "fn main() {}".into());
/// assert_eq!(frame.kind, "agent_judgement");
/// assert_eq!(frame.agents.len(), 3);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequestFrame {
    /// Frame discriminator, always `"agent_judgement"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Correlation id echoed back in every response frame.
    pub request_id: String,
    /// The submission body the agents will judge.
    pub request: String,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
    /// Agents addressed by this request.
    pub agents: Vec<AgentRef>,
}

impl ReviewRequestFrame {
    /// Build a request frame addressed to the full roster, stamped now.
    pub fn new(request_id: &str, request: String) -> Self {
        Self {
            kind: "agent_judgement",
            request_id: request_id.to_string(),
            request,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            agents: AGENT_ROSTER
                .iter()
                .map(|(_, id)| AgentRef {
                    agent_id: (*id).to_string(),
                })
                .collect(),
        }
    }
}

/// Inbound gateway frame, discriminated by its `type` field.
///
/// Frame types outside this set are decoded as [`GatewayMessage::Unknown`]
/// and logged at debug level by the link.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayMessage {
    /// A chunk of one agent's review narrative.
    #[serde(rename = "agent_response")]
    AgentResponse {
        /// Correlation id of the request being answered.
        request_id: String,
        /// Roster id of the responding agent.
        agent_id: String,
        /// Narrative chunk; concatenated across frames.
        #[serde(default)]
        content: String,
        /// `"completed"` finalizes this agent's verdict.
        #[serde(default)]
        status: Option<String>,
    },
    /// A gateway-reported failure, request-scoped when `request_id` is set.
    #[serde(rename = "error")]
    Error {
        /// Request the error applies to, if any.
        #[serde(default)]
        request_id: Option<String>,
        /// Human-readable failure description.
        #[serde(default)]
        message: String,
    },
    /// Any frame type this client does not understand.
    #[serde(other)]
    Unknown,
}

impl GatewayMessage {
    /// Whether an `agent_response` chunk finalizes its agent's verdict.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            GatewayMessage::AgentResponse { status: Some(s), .. } if s == "completed"
        )
    }
}
