//! Bounded retry policy for producing one admissible genome
//!
//! The policy is an explicit state machine driven by uniqueness verdicts:
//!
//! ```text
//! Mutate ──reject, retries < R──▶ Mutate
//! Mutate ──reject, retries = R──▶ Regenerate (if fallback enabled and R > 0)
//! Mutate ──reject, retries = R──▶ Exhausted  (otherwise)
//! Regenerate ──reject, retries < R──▶ Regenerate
//! Regenerate ──reject, retries = R──▶ Exhausted
//! any ──accept──▶ Accepted
//! ```
//!
//! The phase returned after each verdict tells the caller how to build the
//! next candidate. A genome is admitted only from the `Accepted` state.

/// Current state of a retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// Next candidate is a fresh mutation of the parent
    Mutate,
    /// Next candidate is a freshly generated genome
    Regenerate,
    /// The last candidate was accepted
    Accepted,
    /// Every budget is spent without acceptance
    Exhausted,
}

impl RetryPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryPhase::Accepted | RetryPhase::Exhausted)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    phase: RetryPhase,
    regenerate_fallback: bool,
    mutate_retries: u32,
    regenerate_retries: u32,
}

impl RetryPolicy {
    /// Policy for reproduction: the first candidate is a mutation, with
    /// regeneration as a fallback once the mutate budget is spent
    pub fn for_reproduction(max_retries: u32) -> Self {
        Self {
            max_retries,
            phase: RetryPhase::Mutate,
            regenerate_fallback: true,
            mutate_retries: 0,
            regenerate_retries: 0,
        }
    }

    /// Policy for initialisation: the first candidate is a generated genome
    /// and only regeneration is retried
    pub fn for_initialisation(max_retries: u32) -> Self {
        Self {
            max_retries,
            phase: RetryPhase::Regenerate,
            regenerate_fallback: false,
            mutate_retries: 0,
            regenerate_retries: 0,
        }
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    /// Re-mutations consumed so far
    pub fn mutate_retries(&self) -> u32 {
        self.mutate_retries
    }

    /// Regenerations consumed so far
    pub fn regenerate_retries(&self) -> u32 {
        self.regenerate_retries
    }

    /// Feed the verdict on the current candidate and advance
    ///
    /// Terminal phases are sticky.
    pub fn record(&mut self, accepted: bool) -> RetryPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        if accepted {
            self.phase = RetryPhase::Accepted;
            return self.phase;
        }

        self.phase = match self.phase {
            RetryPhase::Mutate if self.mutate_retries < self.max_retries => {
                self.mutate_retries += 1;
                RetryPhase::Mutate
            }
            RetryPhase::Mutate if self.regenerate_fallback && self.max_retries > 0 => {
                self.regenerate_retries = 1;
                RetryPhase::Regenerate
            }
            RetryPhase::Regenerate if self.regenerate_retries < self.max_retries => {
                self.regenerate_retries += 1;
                RetryPhase::Regenerate
            }
            _ => RetryPhase::Exhausted,
        };
        self.phase
    }
}
