//! Production workflow rules: project status, workflow stages, task status.
//!
//! All three are small adjacency tables. A transition is allowed when the
//! target appears in the source's row; nothing else is consulted.

use crate::error::CoreError;
use crate::types::text_enum;

// ---------------------------------------------------------------------------
// Project status
// ---------------------------------------------------------------------------

text_enum! {
    /// Lifecycle status of a production project.
    ProjectStatus, "project status" {
        Draft => "draft",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl ProjectStatus {
    /// Statuses reachable from `self`.
    ///
    /// - `draft`       -> `in_progress`, `cancelled`
    /// - `in_progress` -> `completed`, `cancelled`
    /// - `completed`   -> `cancelled`
    /// - `cancelled`   -> (terminal)
    pub fn transitions(self) -> &'static [ProjectStatus] {
        use ProjectStatus::*;
        match self {
            Draft => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed => &[Cancelled],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        self.transitions().contains(&next)
    }

    /// Whether projects in this status may still be dragged on the board.
    pub fn is_movable(self) -> bool {
        matches!(self, ProjectStatus::Draft | ProjectStatus::InProgress)
    }
}

/// Validate a project status change.
pub fn validate_project_transition(
    current: ProjectStatus,
    next: ProjectStatus,
) -> Result<(), CoreError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::transition("project status", current, next))
    }
}

// ---------------------------------------------------------------------------
// Workflow stages
// ---------------------------------------------------------------------------

text_enum! {
    /// Kanban column a project sits in. Declaration order is board order.
    WorkflowStage, "workflow stage" {
        ManuscriptReceived => "manuscript_received",
        Editing => "editing",
        Design => "design",
        Proof => "proof",
        PrintReady => "print_ready",
        Complete => "complete",
    }
}

impl WorkflowStage {
    /// Zero-based column position on the board.
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<WorkflowStage> {
        WorkflowStage::ALL.get(self.position() + 1).copied()
    }

    pub fn previous(self) -> Option<WorkflowStage> {
        self.position()
            .checked_sub(1)
            .and_then(|p| WorkflowStage::ALL.get(p).copied())
    }

    /// Human-readable column title.
    pub fn title(self) -> &'static str {
        match self {
            WorkflowStage::ManuscriptReceived => "Manuscript Received",
            WorkflowStage::Editing => "Editing",
            WorkflowStage::Design => "Design",
            WorkflowStage::Proof => "Proof",
            WorkflowStage::PrintReady => "Print Ready",
            WorkflowStage::Complete => "Complete",
        }
    }
}

/// Outcome of a validated board move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageMove {
    pub to_stage: WorkflowStage,
    /// Set when the move also changes the project's status.
    pub new_status: Option<ProjectStatus>,
}

/// Validate a drag from `from` to `to` for a project currently in `status`.
///
/// Only adjacent columns are reachable. Dragging a draft out of
/// `manuscript_received` starts it; dragging an in-progress project into
/// `complete` completes it.
pub fn plan_stage_move(
    status: ProjectStatus,
    from: WorkflowStage,
    to: WorkflowStage,
) -> Result<StageMove, CoreError> {
    if !status.is_movable() {
        return Err(CoreError::Conflict(format!(
            "Projects with status '{status}' cannot be moved on the board"
        )));
    }
    if from == to {
        return Err(CoreError::Validation(format!(
            "Project is already in stage '{to}'"
        )));
    }
    if from.position().abs_diff(to.position()) != 1 {
        return Err(CoreError::transition("workflow stage", from, to));
    }

    let new_status = match status {
        ProjectStatus::Draft if to.position() > from.position() => Some(ProjectStatus::InProgress),
        ProjectStatus::InProgress if to == WorkflowStage::Complete => Some(ProjectStatus::Completed),
        _ => None,
    };

    Ok(StageMove {
        to_stage: to,
        new_status,
    })
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

text_enum! {
    /// Status of a single production task.
    TaskStatus, "task status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// Statuses reachable from `self`.
    ///
    /// - `pending`     -> `in_progress`, `cancelled`
    /// - `in_progress` -> `completed`, `pending`, `cancelled`
    /// - `completed`   -> `in_progress` (reopen)
    /// - `cancelled`   -> `pending` (restore)
    pub fn transitions(self) -> &'static [TaskStatus] {
        use TaskStatus::*;
        match self {
            Pending => &[InProgress, Cancelled],
            InProgress => &[Completed, Pending, Cancelled],
            Completed => &[InProgress],
            Cancelled => &[Pending],
        }
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        self.transitions().contains(&next)
    }

    /// Open tasks count toward the board's per-project workload badge.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

pub fn validate_task_transition(current: TaskStatus, next: TaskStatus) -> Result<(), CoreError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::transition("task status", current, next))
    }
}

text_enum! {
    /// Kind of work a task represents.
    TaskType, "task type" {
        Editing => "editing",
        Copyediting => "copyediting",
        Proofreading => "proofreading",
        Design => "design",
        CoverDesign => "cover_design",
        Typesetting => "typesetting",
        Illustration => "illustration",
        Printing => "printing",
        Other => "other",
    }
}

// ---------------------------------------------------------------------------
// Proof review
// ---------------------------------------------------------------------------

text_enum! {
    /// Review state of an uploaded proof version.
    ProofStatus, "proof status" {
        PendingReview => "pending_review",
        Approved => "approved",
        CorrectionsRequested => "corrections_requested",
    }
}

/// Only proofs awaiting review may be approved or sent back.
pub fn validate_proof_review(current: ProofStatus) -> Result<(), CoreError> {
    if current == ProofStatus::PendingReview {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Proof has already been reviewed (status '{current}')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn project_status_table() {
        use ProjectStatus::*;
        assert!(Draft.can_transition_to(InProgress));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Draft));
        assert!(Completed.can_transition_to(Cancelled));
        assert!(Cancelled.transitions().is_empty());
    }

    #[test]
    fn invalid_project_transition_names_both_ends() {
        let err = validate_project_transition(ProjectStatus::Cancelled, ProjectStatus::Draft)
            .unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTransition { ref from, ref to, .. } if from == "cancelled" && to == "draft"
        );
    }

    #[test]
    fn status_strings_parse() {
        for s in ProjectStatus::ALL {
            assert_eq!(s.as_str().parse::<ProjectStatus>().unwrap(), *s);
        }
        assert!("archived".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn stages_are_ordered() {
        assert_eq!(WorkflowStage::ALL.len(), 6);
        assert_eq!(WorkflowStage::ManuscriptReceived.position(), 0);
        assert_eq!(WorkflowStage::Complete.position(), 5);
        assert_eq!(WorkflowStage::Editing.next(), Some(WorkflowStage::Design));
        assert_eq!(WorkflowStage::Editing.previous(), Some(WorkflowStage::ManuscriptReceived));
        assert_eq!(WorkflowStage::Complete.next(), None);
        assert_eq!(WorkflowStage::ManuscriptReceived.previous(), None);
    }

    #[test]
    fn board_allows_single_step_moves() {
        let m = plan_stage_move(
            ProjectStatus::InProgress,
            WorkflowStage::Editing,
            WorkflowStage::Design,
        )
        .unwrap();
        assert_eq!(m.to_stage, WorkflowStage::Design);
        assert_eq!(m.new_status, None);

        let back = plan_stage_move(
            ProjectStatus::InProgress,
            WorkflowStage::Design,
            WorkflowStage::Editing,
        )
        .unwrap();
        assert_eq!(back.new_status, None);
    }

    #[test]
    fn board_rejects_skipping_stages() {
        let err = plan_stage_move(
            ProjectStatus::InProgress,
            WorkflowStage::Editing,
            WorkflowStage::Proof,
        )
        .unwrap_err();
        assert_matches!(err, CoreError::InvalidTransition { .. });
    }

    #[test]
    fn board_rejects_same_stage() {
        assert_matches!(
            plan_stage_move(ProjectStatus::Draft, WorkflowStage::Design, WorkflowStage::Design),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn draft_moving_forward_starts_project() {
        let m = plan_stage_move(
            ProjectStatus::Draft,
            WorkflowStage::ManuscriptReceived,
            WorkflowStage::Editing,
        )
        .unwrap();
        assert_eq!(m.new_status, Some(ProjectStatus::InProgress));
    }

    #[test]
    fn draft_moving_backward_stays_draft() {
        let m = plan_stage_move(
            ProjectStatus::Draft,
            WorkflowStage::Editing,
            WorkflowStage::ManuscriptReceived,
        )
        .unwrap();
        assert_eq!(m.new_status, None);
    }

    #[test]
    fn entering_complete_completes_project() {
        let m = plan_stage_move(
            ProjectStatus::InProgress,
            WorkflowStage::PrintReady,
            WorkflowStage::Complete,
        )
        .unwrap();
        assert_eq!(m.new_status, Some(ProjectStatus::Completed));
    }

    #[test]
    fn draft_entering_complete_only_starts() {
        let m = plan_stage_move(
            ProjectStatus::Draft,
            WorkflowStage::PrintReady,
            WorkflowStage::Complete,
        )
        .unwrap();
        assert_eq!(m.new_status, Some(ProjectStatus::InProgress));
    }

    #[test]
    fn finished_projects_are_frozen() {
        for status in [ProjectStatus::Completed, ProjectStatus::Cancelled] {
            assert_matches!(
                plan_stage_move(status, WorkflowStage::Complete, WorkflowStage::PrintReady),
                Err(CoreError::Conflict(_))
            );
        }
    }

    #[test]
    fn task_status_table() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Pending));
        assert!(Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Pending));
        assert!(validate_task_transition(Cancelled, Completed).is_err());
    }

    #[test]
    fn open_tasks() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
    }

    #[test]
    fn task_type_parse_error_lists_options() {
        let err = "knitting".parse::<TaskType>().unwrap_err().to_string();
        assert!(err.contains("cover_design"));
    }

    #[test]
    fn proof_review_only_once() {
        assert!(validate_proof_review(ProofStatus::PendingReview).is_ok());
        assert_matches!(
            validate_proof_review(ProofStatus::Approved),
            Err(CoreError::Conflict(_))
        );
    }
}
