// Statements issued through the Connection port
//
// Plain SQL with positional `?` parameters. Table layout matches the
// embedded migrations in hrtrack-infra-sqlite.

// Cascade resolution
pub(crate) const SELECT_RECRUITMENT_EXISTS: &str = "SELECT 1 FROM recruitments WHERE id = ?";
pub(crate) const SELECT_INTERVIEW_IDS_BY_RECRUITMENT: &str =
    "SELECT id FROM interviews WHERE recruitment_id = ? ORDER BY id";
pub(crate) const SELECT_APPLICANT_IDS_BY_RECRUITMENT: &str =
    "SELECT applicant_id FROM applications WHERE recruitment_id = ? ORDER BY applicant_id";

// Cascade delete, children before parent
pub(crate) const DELETE_INTERVIEWS_BY_RECRUITMENT: &str =
    "DELETE FROM interviews WHERE recruitment_id = ?";
pub(crate) const DELETE_APPLICATIONS_BY_RECRUITMENT: &str =
    "DELETE FROM applications WHERE recruitment_id = ?";
pub(crate) const DELETE_RECRUITMENT: &str = "DELETE FROM recruitments WHERE id = ?";

// Roles
pub(crate) const SELECT_ROLE_EXISTS: &str = "SELECT 1 FROM roles WHERE id = ?";
pub(crate) const INSERT_ROLE: &str =
    "INSERT INTO roles (id, title, description, department) VALUES (?, ?, ?, ?)";

// Recruitments
pub(crate) const INSERT_RECRUITMENT: &str = r#"
    INSERT INTO recruitments (
        id, role_id, application_deadline, posting_date, offer_acceptance_date, status
    ) VALUES (?, ?, ?, ?, ?, ?)
"#;

// Applicants & application links
pub(crate) const SELECT_APPLICANT_EXISTS: &str = "SELECT 1 FROM applicants WHERE id = ?";
pub(crate) const INSERT_APPLICANT: &str = r#"
    INSERT INTO applicants (
        id, first_name, last_name, email, phone, application_date, rank
    ) VALUES (?, ?, ?, ?, ?, ?, ?)
"#;
pub(crate) const SELECT_APPLICATION_EXISTS: &str =
    "SELECT 1 FROM applications WHERE applicant_id = ? AND recruitment_id = ?";
pub(crate) const INSERT_APPLICATION: &str =
    "INSERT INTO applications (applicant_id, recruitment_id, application_date) VALUES (?, ?, ?)";
pub(crate) const DELETE_APPLICATION: &str =
    "DELETE FROM applications WHERE applicant_id = ? AND recruitment_id = ?";

// Interviews
pub(crate) const INSERT_INTERVIEW: &str = r#"
    INSERT INTO interviews (
        id, recruitment_id, applicant_id, date_time, location, interviewer, status, notes
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;
pub(crate) const DELETE_INTERVIEWS_BY_APPLICANT: &str =
    "DELETE FROM interviews WHERE applicant_id = ? AND recruitment_id = ?";

// Updates
pub(crate) const UPDATE_RECRUITMENT: &str = r#"
    UPDATE recruitments
    SET status = COALESCE(?, status),
        offer_acceptance_date = COALESCE(?, offer_acceptance_date)
    WHERE id = ?
"#;
pub(crate) const UPDATE_APPLICANT_RANK: &str = "UPDATE applicants SET rank = ? WHERE id = ?";
pub(crate) const SELECT_INTERVIEW_STATUS: &str = "SELECT status FROM interviews WHERE id = ?";
pub(crate) const UPDATE_INTERVIEW_SCHEDULE: &str =
    "UPDATE interviews SET date_time = ?, status = ? WHERE id = ?";
pub(crate) const UPDATE_INTERVIEW_STATUS: &str = "UPDATE interviews SET status = ? WHERE id = ?";
