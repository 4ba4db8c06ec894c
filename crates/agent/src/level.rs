//! Assistance level escalation.
//!
//! Help unlocks with time spent on the problem, not with how hard the user
//! pushes: the longer a chat has been open, the more the assistant may give
//! away.

use crate::prompts;

/// How much the assistant is allowed to reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssistLevel {
    /// Intuition only, no pseudocode, no code
    Intuition,
    /// Intuition and pseudocode, no code
    Pseudocode,
    /// Full solutions, verified before they are shown
    FullSolution,
}

impl AssistLevel {
    /// The system prompt for this level.
    pub fn system_prompt(self) -> &'static str {
        match self {
            AssistLevel::Intuition => prompts::INTUITION_PROMPT,
            AssistLevel::Pseudocode => prompts::PSEUDOCODE_PROMPT,
            AssistLevel::FullSolution => prompts::FULL_SOLUTION_PROMPT,
        }
    }

    /// Numeric form, for logs and events.
    pub fn as_u8(self) -> u8 {
        match self {
            AssistLevel::Intuition => 0,
            AssistLevel::Pseudocode => 1,
            AssistLevel::FullSolution => 2,
        }
    }
}

impl std::fmt::Display for AssistLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssistLevel::Intuition => "intuition",
            AssistLevel::Pseudocode => "pseudocode",
            AssistLevel::FullSolution => "full-solution",
        };
        write!(f, "{name}")
    }
}

/// Map minutes since the chat's first turn to an assistance level.
///
/// Up to and including 20 minutes: intuition. Up to and including 30:
/// pseudocode. Beyond that, full solutions.
pub fn level_for_elapsed(minutes: f64) -> AssistLevel {
    if minutes <= 20.0 {
        AssistLevel::Intuition
    } else if minutes <= 30.0 {
        AssistLevel::Pseudocode
    } else {
        AssistLevel::FullSolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_chat_gets_intuition() {
        assert_eq!(level_for_elapsed(0.0), AssistLevel::Intuition);
        assert_eq!(level_for_elapsed(12.5), AssistLevel::Intuition);
    }

    #[test]
    fn twenty_minutes_is_still_intuition() {
        assert_eq!(level_for_elapsed(20.0), AssistLevel::Intuition);
        assert_eq!(level_for_elapsed(20.001), AssistLevel::Pseudocode);
    }

    #[test]
    fn thirty_minutes_is_still_pseudocode() {
        assert_eq!(level_for_elapsed(30.0), AssistLevel::Pseudocode);
        assert_eq!(level_for_elapsed(30.001), AssistLevel::FullSolution);
    }

    #[test]
    fn long_sessions_unlock_code() {
        assert_eq!(level_for_elapsed(45.0), AssistLevel::FullSolution);
        assert_eq!(level_for_elapsed(600.0), AssistLevel::FullSolution);
    }

    #[test]
    fn levels_order_by_openness() {
        assert!(AssistLevel::Intuition < AssistLevel::Pseudocode);
        assert!(AssistLevel::Pseudocode < AssistLevel::FullSolution);
    }

    #[test]
    fn each_level_has_a_distinct_prompt() {
        let prompts = [
            AssistLevel::Intuition.system_prompt(),
            AssistLevel::Pseudocode.system_prompt(),
            AssistLevel::FullSolution.system_prompt(),
        ];
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        // All levels redirect off-topic questions the same way.
        for p in prompts {
            assert!(p.contains("Create a new chat"));
        }
    }
}
