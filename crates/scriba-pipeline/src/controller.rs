//! Revision controller: decides whether a stage's artifact is accepted,
//! revised, or forced out by the revision ceiling.

use scriba_types::{Stage, Verdict};

/// The controller's verdict on one stage round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Artifact accepted; the branch is done.
    Continue,
    /// Artifact rejected; run the stage again with the critique attached.
    Revise,
    /// Revision ceiling reached; keep the latest artifact and stop revising.
    MaxRetries,
}

/// Decide the fate of a stage round.
///
/// `revision_count` is the number of completed attempts for this stage; the
/// first attempt is not a revision, so the ceiling is checked against
/// `revision_count - 1`. With `max_revisions = 1` a stage may therefore run
/// twice: the original attempt plus one revision.
///
/// The ceiling is checked before the verdict, so a branch that keeps getting
/// rejected terminates deterministically. A missing verdict means the critic
/// never ran for this round; the pipeline moves on rather than stalling.
pub fn decide(
    stage: Stage,
    revision_count: u32,
    verdict: Option<Verdict>,
    max_revisions: u32,
) -> Decision {
    let revisions_done = revision_count.saturating_sub(1);

    if revisions_done >= max_revisions {
        tracing::info!(%stage, revision_count, max_revisions, "Revision ceiling reached");
        return Decision::MaxRetries;
    }

    match verdict {
        Some(Verdict::Rejected) => Decision::Revise,
        Some(Verdict::Approved) => Decision::Continue,
        None => Decision::Continue,
    }
}
