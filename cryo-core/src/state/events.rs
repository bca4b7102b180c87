//! Events that drive stage transitions

/// Events that can trigger a [`super::StageState`] transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CooldownEvent {
    /// Operator started a run (immediately or after a deferred start)
    RunStarted,
    /// The sampler published the first sample of the run
    FirstSample,
    /// A sample satisfied both Stage 1 exit conditions
    ThresholdsReached,
    /// Operator confirmed a manual jump to Stage 2
    JumpRequested,
    /// Operator confirmed a stop
    StopRequested,
    /// A hardware fault ended the run
    FaultDetected,
}
