// Domain Layer - Pure business logic and entities

pub mod error;
pub mod interview;
pub mod people;
pub mod recruitment;
pub mod recruitment_id;

// Re-exports
pub use error::DomainError;
pub use interview::{Interview, InterviewId, InterviewStatus};
pub use people::{Applicant, ApplicantId, Role, RoleId};
pub use recruitment::{Recruitment, RecruitmentStatus};
pub use recruitment_id::RecruitmentId;
