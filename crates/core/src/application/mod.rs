// Application Layer - Use Cases and Business Logic

pub mod cascade_delete;
pub mod recruitment;
pub mod sequence;
mod statements;
pub mod transaction;

// Re-exports
pub use cascade_delete::{CascadeSet, CascadeSummary, CascadingDelete, DeleteOutcome};
pub use recruitment::{
    NewApplicant, NewInterview, NewRecruitment, NewRole, RecruitmentDetails, RecruitmentService,
    RecruitmentUpdate, RemovalSummary,
};
pub use sequence::{RecoveryReport, SequenceAllocator};
pub use transaction::{
    cancel_channel, CancelHandle, CancelToken, TransactionCoordinator, TxContext, TxFuture,
    TxState,
};
