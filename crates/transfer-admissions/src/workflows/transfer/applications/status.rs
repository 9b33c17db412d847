use serde::{Deserialize, Serialize};

/// Workflow position of a transfer application.
///
/// Moves forward only. `Ranked` and `Waitlisted` may swap (or fall to `Rejected`) while a
/// ranking is still unpublished so regeneration and re-evaluation stay coherent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    OidbReview,
    FacultyRouting,
    DepartmentRouting,
    YgkEvaluation,
    Ranked,
    Waitlisted,
    Rejected,
    FacultyBoard,
    Approved,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::OidbReview => "OIDB_REVIEW",
            ApplicationStatus::FacultyRouting => "FACULTY_ROUTING",
            ApplicationStatus::DepartmentRouting => "DEPARTMENT_ROUTING",
            ApplicationStatus::YgkEvaluation => "YGK_EVALUATION",
            ApplicationStatus::Ranked => "RANKED",
            ApplicationStatus::Waitlisted => "WAITLISTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::FacultyBoard => "FACULTY_BOARD",
            ApplicationStatus::Approved => "APPROVED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Approved
        )
    }

    /// States that only a ranking run may assign.
    pub const fn is_ranking_outcome(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Ranked | ApplicationStatus::Waitlisted
        )
    }

    /// States in which an evaluation may be (re)completed.
    pub const fn accepts_evaluation(self) -> bool {
        matches!(
            self,
            ApplicationStatus::YgkEvaluation
                | ApplicationStatus::Ranked
                | ApplicationStatus::Waitlisted
        )
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, OidbReview | FacultyRouting | Rejected)
                | (OidbReview, FacultyRouting | Rejected)
                | (FacultyRouting, DepartmentRouting | Rejected)
                | (DepartmentRouting, YgkEvaluation | Rejected)
                | (YgkEvaluation, Ranked | Waitlisted | Rejected)
                | (Ranked, Waitlisted | FacultyBoard | Rejected)
                | (Waitlisted, Ranked | Rejected)
                | (FacultyBoard, Approved | Rejected)
        )
    }

    pub fn transition_to(self, next: ApplicationStatus) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// Raised when a status change is not allowed by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("application cannot move from {} to {}", .from.label(), .to.label())]
pub struct TransitionError {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}
