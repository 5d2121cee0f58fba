//! Pipeline steps and their observable status.

use crate::errors::{ErrorKind, StepFailure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five ordered steps of a gasless swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
	Connect,
	Sign,
	Verify,
	Relay,
	Execute,
}

impl Step {
	/// All steps in execution order.
	pub const ALL: [Step; 5] = [
		Step::Connect,
		Step::Sign,
		Step::Verify,
		Step::Relay,
		Step::Execute,
	];

	pub fn index(self) -> usize {
		self as usize
	}

	pub fn next(self) -> Option<Step> {
		Step::ALL.get(self.index() + 1).copied()
	}

	pub fn name(self) -> &'static str {
		match self {
			Step::Connect => "connect",
			Step::Sign => "sign",
			Step::Verify => "verify",
			Step::Relay => "relay",
			Step::Execute => "execute",
		}
	}
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// State of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
	Pending,
	Active,
	Succeeded,
	Failed(ErrorKind),
}

impl StepState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, StepState::Succeeded | StepState::Failed(_))
	}
}

/// Per-step status of the active pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
	states: [StepState; 5],
}

impl Default for PipelineStatus {
	fn default() -> Self {
		Self {
			states: [StepState::Pending; 5],
		}
	}
}

/// Raised when a transition would break step ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step {step} cannot become {target:?}: {reason}")]
pub struct TransitionError {
	pub step: Step,
	pub target: StepState,
	pub reason: &'static str,
}

impl PipelineStatus {
	pub fn get(&self, step: Step) -> StepState {
		self.states[step.index()]
	}

	pub fn iter(&self) -> impl Iterator<Item = (Step, StepState)> + '_ {
		Step::ALL.iter().map(move |step| (*step, self.get(*step)))
	}

	/// Marks a step active. Every earlier step must have succeeded and no
	/// step may have failed.
	pub fn activate(&mut self, step: Step) -> Result<(), TransitionError> {
		let target = StepState::Active;
		if self.failed_step().is_some() {
			return Err(TransitionError {
				step,
				target,
				reason: "pipeline has a failed step",
			});
		}
		let predecessors_done = Step::ALL[..step.index()]
			.iter()
			.all(|earlier| self.get(*earlier) == StepState::Succeeded);
		if !predecessors_done {
			return Err(TransitionError {
				step,
				target,
				reason: "previous step has not succeeded",
			});
		}
		self.states[step.index()] = target;
		Ok(())
	}

	pub fn succeed(&mut self, step: Step) -> Result<(), TransitionError> {
		self.require_active(step, StepState::Succeeded)?;
		self.states[step.index()] = StepState::Succeeded;
		Ok(())
	}

	pub fn fail(&mut self, step: Step, kind: ErrorKind) -> Result<(), TransitionError> {
		let target = StepState::Failed(kind);
		self.require_active(step, target)?;
		self.states[step.index()] = target;
		Ok(())
	}

	fn require_active(&self, step: Step, target: StepState) -> Result<(), TransitionError> {
		if self.get(step) != StepState::Active {
			return Err(TransitionError {
				step,
				target,
				reason: "step is not active",
			});
		}
		Ok(())
	}

	/// Resets `from` and every later step back to pending so the pipeline
	/// can be resumed from there.
	pub fn rewind(&mut self, from: Step) {
		for step in &Step::ALL[from.index()..] {
			self.states[step.index()] = StepState::Pending;
		}
	}

	/// Returns an interrupted active step to pending.
	pub fn deactivate(&mut self, step: Step) {
		if self.get(step) == StepState::Active {
			self.states[step.index()] = StepState::Pending;
		}
	}

	pub fn failed_step(&self) -> Option<(Step, ErrorKind)> {
		self.iter().find_map(|(step, state)| match state {
			StepState::Failed(kind) => Some((step, kind)),
			_ => None,
		})
	}

	/// First step that has not succeeded yet.
	pub fn first_incomplete(&self) -> Option<Step> {
		self.iter()
			.find(|(_, state)| *state != StepState::Succeeded)
			.map(|(step, _)| step)
	}

	pub fn is_complete(&self) -> bool {
		self.first_incomplete().is_none()
	}
}

/// Terminal or current status of a swap intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntentStatus {
	/// Created, not yet driven.
	Created,
	/// A step is currently running.
	InFlight { step: Step },
	/// The executor reported completion on the destination chain.
	Completed { destination_tx: Option<String> },
	/// A step failed before any funds moved.
	Failed { failure: StepFailure },
	/// The relay executed the permit but execution never resolved.
	/// Funds may be in transit; the user must check status later.
	Inconsistent {
		task_id: String,
		failure: StepFailure,
	},
	/// The token does not support permits; nothing was signed.
	Blocked { reason: String },
	/// Cancelled by the user or by a wallet account/chain change.
	Cancelled { step: Step, reason: String },
}

impl IntentStatus {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, IntentStatus::Created | IntentStatus::InFlight { .. })
	}

	/// Failure kind attached to the status, if any.
	pub fn error_kind(&self) -> Option<ErrorKind> {
		match self {
			IntentStatus::Failed { failure } => Some(failure.kind),
			IntentStatus::Inconsistent { .. } => Some(ErrorKind::InconsistentState),
			_ => None,
		}
	}
}
