use relay_types::{FailureReason, RunPhase, RunStatus};

/// Local mirror of a remote run's lifecycle
///
/// Every status the provider reports goes through [`RunMachine::observe`];
/// unknown statuses fail the run instead of being ignored, and the number of
/// pause/resume cycles is capped.
#[derive(Debug, Clone)]
pub struct RunMachine {
    phase: RunPhase,
    rounds: usize,
    max_rounds: usize,
    failure: Option<FailureReason>,
}

impl RunMachine {
    pub fn new(max_rounds: usize) -> Self {
        Self {
            phase: RunPhase::Streaming,
            rounds: 0,
            max_rounds,
            failure: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Completed pause/resume cycles
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    /// Apply a status reported by the provider
    pub fn observe(&mut self, status: &RunStatus, detail: Option<String>) -> RunPhase {
        let next = match (self.phase, status) {
            (RunPhase::Completed | RunPhase::Failed, _) => return self.phase,

            (_, RunStatus::Unknown(raw)) => {
                return self.fail(FailureReason::ProtocolError(format!(
                    "unrecognized run status '{}'",
                    raw
                )))
            }

            (
                RunPhase::Streaming,
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling,
            ) => RunPhase::Streaming,
            (RunPhase::Streaming, RunStatus::RequiresAction) => {
                if self.rounds >= self.max_rounds {
                    return self.fail(FailureReason::ToolLoopExceeded {
                        max_rounds: self.max_rounds,
                    });
                }
                RunPhase::AwaitingToolOutputs
            }
            (RunPhase::Streaming, RunStatus::Completed) => RunPhase::Completed,
            (
                RunPhase::Streaming,
                RunStatus::Cancelled | RunStatus::Failed | RunStatus::Expired | RunStatus::Incomplete,
            ) => {
                return self.fail(FailureReason::RunEnded {
                    status: status.clone(),
                    detail,
                })
            }

            // Repeated pause notification before outputs were submitted
            (RunPhase::AwaitingToolOutputs, RunStatus::RequiresAction) => {
                RunPhase::AwaitingToolOutputs
            }
            (RunPhase::AwaitingToolOutputs, other) => {
                return self.fail(FailureReason::ProtocolError(format!(
                    "run reported '{}' while awaiting tool outputs",
                    other
                )))
            }
        };

        self.phase = next;
        next
    }

    /// Outputs for the current pause were submitted
    pub fn resume(&mut self) -> RunPhase {
        match self.phase {
            RunPhase::AwaitingToolOutputs => {
                self.rounds += 1;
                self.phase = RunPhase::Streaming;
                self.phase
            }
            RunPhase::Streaming => self.fail(FailureReason::ProtocolError(
                "resume requested while streaming".to_string(),
            )),
            terminal => terminal,
        }
    }

    /// Force the run into `Failed`; the first reason wins
    pub fn fail(&mut self, reason: FailureReason) -> RunPhase {
        if !self.phase.is_terminal() {
            self.failure = Some(reason);
            self.phase = RunPhase::Failed;
        }
        self.phase
    }

    /// Reason for the failure, or a protocol error if the run is not failed
    pub fn into_failure(self) -> FailureReason {
        self.failure.unwrap_or_else(|| {
            FailureReason::ProtocolError(format!("run not failed (phase {:?})", self.phase))
        })
    }
}
