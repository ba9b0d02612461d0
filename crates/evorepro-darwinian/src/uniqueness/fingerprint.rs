//! Archive-membership test over a caller-defined fingerprint

use std::marker::PhantomData;

use super::{UniquenessTest, Verdict};
use crate::archive::{Archive, Fingerprint};
use crate::population::Population;

/// Rejects candidates whose fingerprint is already archived
///
/// Accepted candidates have their fingerprint recorded, so a signature can be
/// admitted at most once per run.
pub struct FingerprintTest<G, F> {
    fingerprint: F,
    _genome: PhantomData<fn(&G)>,
}

impl<G, F> FingerprintTest<G, F>
where
    F: Fn(&G) -> Fingerprint + Send + Sync,
{
    pub fn new(fingerprint: F) -> Self {
        Self {
            fingerprint,
            _genome: PhantomData,
        }
    }
}

impl<G, F> UniquenessTest<G> for FingerprintTest<G, F>
where
    F: Fn(&G) -> Fingerprint + Send + Sync,
{
    fn test(&self, archive: &Archive, candidate: &G, _population: &Population<G>) -> Verdict {
        let fingerprint = (self.fingerprint)(candidate);
        if archive.contains(&fingerprint) {
            Verdict::Reject
        } else {
            Verdict::Admit(fingerprint)
        }
    }
}
