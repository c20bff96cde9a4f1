// Table rendering

use hrtrack_core::domain::{Applicant, Interview, Recruitment, Role};
use std::collections::BTreeMap;
use tabled::{Table, Tabled};

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct RoleRow {
    id: String,
    title: String,
    department: String,
}

pub fn roles_table(roles: Vec<Role>) -> String {
    let rows = roles.into_iter().map(|r| RoleRow {
        id: r.id,
        title: r.title,
        department: or_dash(r.department),
    });
    Table::new(rows).to_string()
}

#[derive(Tabled)]
struct RecruitmentRow {
    id: String,
    role: String,
    deadline: String,
    posted: String,
    status: String,
}

pub fn recruitments_table(recruitments: Vec<Recruitment>) -> String {
    let rows = recruitments.into_iter().map(|r| RecruitmentRow {
        id: r.id.to_string(),
        role: r.role_id,
        deadline: r.application_deadline.to_string(),
        posted: r.posting_date.format("%Y-%m-%d %H:%M").to_string(),
        status: r.status.to_string(),
    });
    Table::new(rows).to_string()
}

#[derive(Tabled)]
struct ApplicantRow {
    id: String,
    name: String,
    email: String,
    rank: String,
}

pub fn applicants_table(applicants: Vec<Applicant>) -> String {
    let rows = applicants.into_iter().map(|a| ApplicantRow {
        name: a.full_name(),
        rank: if a.is_ranked() {
            a.rank.to_string()
        } else {
            "-".to_string()
        },
        id: a.id,
        email: a.email,
    });
    Table::new(rows).to_string()
}

#[derive(Tabled)]
struct InterviewRow {
    id: String,
    applicant: String,
    at: String,
    location: String,
    interviewer: String,
    status: String,
}

pub fn interviews_table(interviews: Vec<Interview>) -> String {
    let rows = interviews.into_iter().map(|i| InterviewRow {
        id: i.id,
        applicant: i.applicant_id,
        at: i.date_time.format("%Y-%m-%d %H:%M").to_string(),
        location: or_dash(i.location),
        interviewer: or_dash(i.interviewer),
        status: i.status.to_string(),
    });
    Table::new(rows).to_string()
}

#[derive(Tabled)]
struct SequenceRow {
    year: i32,
    last_issued: u32,
    next: u32,
}

pub fn sequences_table(snapshot: BTreeMap<i32, u32>) -> String {
    let rows = snapshot.into_iter().map(|(year, last)| SequenceRow {
        year,
        last_issued: last,
        next: last.saturating_add(1),
    });
    Table::new(rows).to_string()
}
