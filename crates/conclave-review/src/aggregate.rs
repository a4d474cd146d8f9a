//! Majority-rule aggregation of agent verdicts.

use std::collections::HashSet;

use conclave_core::{AgentVerdict, Decision, ReviewVerdict};

/// Fold a set of agent verdicts into the final review outcome.
///
/// Pure and deterministic: no I/O, no shared state, and the outcome does not
/// depend on the order the verdicts arrived in. The request passes when a
/// strict majority of the `expected` verdicts is positive; with three
/// expected agents that is the classic 2-of-3 rule. When fewer distinct
/// agents delivered a verdict than expected — deadline truncation — the
/// majority is still computed over what was received and the result is
/// flagged `partial` so callers can tell the two apart.
///
/// # Examples
///
/// ```
/// use conclave_core::{AgentVerdict, Decision};
/// use conclave_review::aggregate::aggregate;
///
/// let verdicts = vec![
///     AgentVerdict {
///         agent: "melchior".into(),
///         decision: Decision::Positive,
///         narrative: "POSITIVE".into(),
///     },
///     AgentVerdict {
///         agent: "balthasar".into(),
///         decision: Decision::Positive,
///         narrative: "POSITIVE".into(),
///     },
///     AgentVerdict {
///         agent: "casper".into(),
///         decision: Decision::Negative,
///         narrative: "NEGATIVE".into(),
///     },
/// ];
/// let outcome = aggregate("req-1", verdicts, 3);
/// assert!(outcome.passed);
/// assert!(!outcome.partial);
/// ```
pub fn aggregate(request_id: &str, verdicts: Vec<AgentVerdict>, expected: usize) -> ReviewVerdict {
    let distinct_agents: HashSet<&str> = verdicts.iter().map(|v| v.agent.as_str()).collect();
    let positives = verdicts
        .iter()
        .filter(|v| v.decision == Decision::Positive)
        .count();
    let majority = expected / 2 + 1;
    let passed = positives >= majority;

    ReviewVerdict {
        request_id: request_id.to_string(),
        final_decision: if passed {
            Decision::Positive
        } else {
            Decision::Negative
        },
        passed,
        partial: distinct_agents.len() < expected,
        verdicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(agent: &str, decision: Decision) -> AgentVerdict {
        AgentVerdict {
            agent: agent.into(),
            decision,
            narrative: decision.to_string(),
        }
    }

    fn full_set(a: Decision, b: Decision, c: Decision) -> Vec<AgentVerdict> {
        vec![
            verdict("melchior", a),
            verdict("balthasar", b),
            verdict("casper", c),
        ]
    }

    #[test]
    fn two_of_three_positive_passes() {
        let outcome = aggregate(
            "req-1",
            full_set(Decision::Positive, Decision::Positive, Decision::Negative),
            3,
        );
        assert!(outcome.passed);
        assert_eq!(outcome.final_decision, Decision::Positive);
        assert!(!outcome.partial);
    }

    #[test]
    fn one_of_three_positive_fails() {
        let outcome = aggregate(
            "req-1",
            full_set(Decision::Negative, Decision::Negative, Decision::Positive),
            3,
        );
        assert!(!outcome.passed);
        assert_eq!(outcome.final_decision, Decision::Negative);
    }

    #[test]
    fn unanimous_boundaries() {
        let all_positive = aggregate(
            "req-1",
            full_set(Decision::Positive, Decision::Positive, Decision::Positive),
            3,
        );
        assert!(all_positive.passed);

        let all_negative = aggregate(
            "req-1",
            full_set(Decision::Negative, Decision::Negative, Decision::Negative),
            3,
        );
        assert!(!all_negative.passed);
    }

    #[test]
    fn outcome_is_order_insensitive() {
        let agents = ["melchior", "balthasar", "casper"];
        let decisions = [Decision::Positive, Decision::Positive, Decision::Negative];
        let reference = aggregate(
            "req-1",
            agents
                .iter()
                .zip(decisions)
                .map(|(a, d)| verdict(a, d))
                .collect(),
            3,
        );

        let permutations: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for perm in permutations {
            let shuffled: Vec<AgentVerdict> = perm
                .iter()
                .map(|&i| verdict(agents[i], decisions[i]))
                .collect();
            let outcome = aggregate("req-1", shuffled, 3);
            assert_eq!(outcome.passed, reference.passed);
            assert_eq!(outcome.final_decision, reference.final_decision);
            assert_eq!(outcome.partial, reference.partial);
        }
    }

    #[test]
    fn truncated_set_is_flagged_partial() {
        let outcome = aggregate(
            "req-1",
            vec![
                verdict("melchior", Decision::Positive),
                verdict("balthasar", Decision::Positive),
            ],
            3,
        );
        assert!(outcome.partial);
        assert!(outcome.passed);
    }

    #[test]
    fn single_positive_in_truncated_set_still_fails() {
        let outcome = aggregate("req-1", vec![verdict("casper", Decision::Positive)], 3);
        assert!(outcome.partial);
        assert!(!outcome.passed);
        assert_eq!(outcome.final_decision, Decision::Negative);
    }

    #[test]
    fn empty_set_is_a_partial_failure() {
        let outcome = aggregate("req-1", Vec::new(), 3);
        assert!(outcome.partial);
        assert!(!outcome.passed);
        assert!(outcome.verdicts.is_empty());
    }

    #[test]
    fn request_id_is_carried_through() {
        let outcome = aggregate("req-77", Vec::new(), 3);
        assert_eq!(outcome.request_id, "req-77");
    }
}
