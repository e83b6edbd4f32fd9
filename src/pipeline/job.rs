use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::foundation::core::Lane;
use crate::foundation::error::{SemanticError, SemanticResult};

/// Completion state of one transcode.
///
/// Each lane reports exactly once through [`PipelineJob::lane_finished`]. The call that makes
/// both flags true is the single finalization point: it alone receives the job outcome. A
/// failing lane raises the cancel flag so its sibling stops early, but the join still waits for
/// the sibling to report.
#[derive(Debug)]
pub struct PipelineJob {
    state: Mutex<JoinState>,
    cancelled: AtomicBool,
}

#[derive(Debug, Default)]
struct JoinState {
    video_done: bool,
    audio_done: bool,
    failure: Option<SemanticError>,
    finalized: bool,
}

impl PipelineJob {
    /// New job. Without an audio track the audio lane counts as done from the start.
    pub fn new(has_audio: bool) -> Self {
        Self {
            state: Mutex::new(JoinState {
                audio_done: !has_audio,
                ..JoinState::default()
            }),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Ask both lanes to stop at their next iteration.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// `true` once [`PipelineJob::cancel`] ran or a lane failed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `true` once the join point has been passed.
    pub fn is_finalized(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finalized
    }

    /// `(video_done, audio_done)`.
    pub fn lanes_done(&self) -> (bool, bool) {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (st.video_done, st.audio_done)
    }

    /// Record that `lane` finished with `outcome`.
    ///
    /// Returns `Some(job outcome)` to exactly one caller: the one whose report completes the
    /// AND-join. The job outcome is the first lane failure, if any.
    pub fn lane_finished(&self, lane: Lane, outcome: SemanticResult<()>) -> Option<SemanticResult<()>> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let flag = match lane {
            Lane::Video => &mut st.video_done,
            Lane::Audio => &mut st.audio_done,
        };
        if *flag {
            tracing::warn!(%lane, "lane reported completion twice, ignored");
            return None;
        }
        *flag = true;

        if let Err(e) = outcome {
            tracing::debug!(%lane, error = %e, "lane failed, cancelling job");
            self.cancel();
            if st.failure.is_none() {
                st.failure = Some(e);
            }
        }

        if !(st.video_done && st.audio_done) || st.finalized {
            return None;
        }
        st.finalized = true;
        Some(match st.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
