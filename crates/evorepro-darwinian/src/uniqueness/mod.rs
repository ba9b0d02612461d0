//! Uniqueness tests
//!
//! A uniqueness test inspects the archive, a candidate and the population and
//! returns a [`Verdict`]. Tests only ever see the archive read-only; the
//! reproducer applies the admission carried by an accepting verdict. This makes
//! "no archive mutation on rejection" and "at most one admission per accepted
//! call" hold by construction.
//!
//! Tests must be deterministic for identical inputs, otherwise a resumed run
//! does not replay the original one. That is the caller's responsibility.

mod fingerprint;

pub use fingerprint::FingerprintTest;

use crate::archive::{Archive, Fingerprint};
use crate::population::Population;

/// Outcome of one uniqueness test call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Accept the candidate and record its signature in the archive
    Admit(Fingerprint),
    /// Accept the candidate without recording anything
    Pass,
    /// Reject the candidate
    Reject,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Reject)
    }
}

impl From<bool> for Verdict {
    fn from(accepted: bool) -> Self {
        if accepted {
            Verdict::Pass
        } else {
            Verdict::Reject
        }
    }
}

/// Pluggable admission policy
pub trait UniquenessTest<G>: Send + Sync {
    fn test(&self, archive: &Archive, candidate: &G, population: &Population<G>) -> Verdict;
}

impl<G, F> UniquenessTest<G> for F
where
    F: Fn(&Archive, &G, &Population<G>) -> Verdict + Send + Sync,
{
    fn test(&self, archive: &Archive, candidate: &G, population: &Population<G>) -> Verdict {
        self(archive, candidate, population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bitstring::BitGenome;
    use crate::population::PopulationConfig;
    use evorepro_common::GenomeId;

    #[test]
    fn test_closure_as_uniqueness_test() {
        let even_only = |_: &Archive, g: &BitGenome, _: &Population<BitGenome>| {
            Verdict::from(g.bits().len() % 2 == 0)
        };
        let pop = Population::new(PopulationConfig::new(2).unwrap());
        let archive = Archive::new();

        let even = BitGenome::from_bits(GenomeId::new(0), vec![true, true]);
        let odd = BitGenome::from_bits(GenomeId::new(1), vec![true]);

        assert_eq!(even_only.test(&archive, &even, &pop), Verdict::Pass);
        assert_eq!(even_only.test(&archive, &odd, &pop), Verdict::Reject);
    }

    #[test]
    fn test_verdict_acceptance() {
        assert!(Verdict::Admit(Fingerprint::new("a")).is_accepted());
        assert!(Verdict::Pass.is_accepted());
        assert!(!Verdict::Reject.is_accepted());
    }
}
