//! Field schemas for each canonical section.
//!
//! Every field lists the aliases it may appear under inside a pre-shaped
//! section (canonical name first) and the aliases it may appear under in a
//! flat, unsectioned payload. Order is priority: the first present alias wins.

use crate::model::choices::{ChoiceMap, EMPLOYMENT_TYPE, JOB_STATUS, WORK_ARRANGEMENT};
use crate::model::profile::SectionKind;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    List,
    Number,
    Bool,
    /// A list of loosely shaped entries (jobs, degrees, projects).
    Records,
    Choice(&'static ChoiceMap),
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub flat: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn is_alias(&self, key: &str) -> bool {
        self.aliases.contains(&key)
    }
}

pub fn fields(kind: SectionKind) -> &'static [FieldSpec] {
    match kind {
        SectionKind::BasicInfo => BASIC_INFO,
        SectionKind::Education => EDUCATION,
        SectionKind::WorkExperience => WORK_EXPERIENCE,
        SectionKind::Skills => SKILLS,
        SectionKind::Projects => PROJECTS,
        SectionKind::Achievements => ACHIEVEMENTS,
        SectionKind::Certification => CERTIFICATION,
        SectionKind::Preferences => PREFERENCES,
        SectionKind::OtherDetails => OTHER_DETAILS,
    }
}

static BASIC_INFO: &[FieldSpec] = &[
    FieldSpec {
        name: "full_name",
        aliases: &["full_name", "fullName", "name", "candidate_name"],
        flat: &["full_name", "fullName", "name", "candidate_name"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "email",
        aliases: &["email", "email_address", "emailAddress"],
        flat: &["email", "email_address", "emailAddress"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "phone",
        aliases: &["phone", "phone_number", "phoneNumber", "mobile", "contact_number"],
        flat: &["phone", "phone_number", "phoneNumber", "mobile", "contact_number"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "location",
        aliases: &["location", "current_location", "currentLocation", "city", "address"],
        flat: &["location", "current_location", "currentLocation", "city"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "headline",
        aliases: &["headline", "title", "professional_title"],
        flat: &["headline", "professional_title"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "summary",
        aliases: &["summary", "about", "bio", "profile_summary", "objective"],
        flat: &["summary", "profile_summary", "objective", "about"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "linkedin_url",
        aliases: &["linkedin_url", "linkedinUrl", "linkedin"],
        flat: &["linkedin_url", "linkedinUrl", "linkedin"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "github_url",
        aliases: &["github_url", "githubUrl", "github"],
        flat: &["github_url", "githubUrl", "github"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "portfolio_url",
        aliases: &["portfolio_url", "portfolioUrl", "portfolio", "website"],
        flat: &["portfolio_url", "portfolioUrl", "portfolio", "website"],
        kind: FieldKind::Text,
    },
];

static EDUCATION: &[FieldSpec] = &[
    FieldSpec {
        name: "entries",
        aliases: &["entries", "items", "degrees", "education_list"],
        flat: &["education", "educations", "education_history", "educationHistory"],
        kind: FieldKind::Records,
    },
    FieldSpec {
        name: "highest_degree",
        aliases: &["highest_degree", "highestDegree", "degree"],
        flat: &["highest_degree", "highestDegree"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "institution",
        aliases: &["institution", "university", "college", "school"],
        flat: &[],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "graduation_year",
        aliases: &["graduation_year", "graduationYear", "year_of_passing"],
        flat: &["graduation_year", "graduationYear"],
        kind: FieldKind::Number,
    },
];

static WORK_EXPERIENCE: &[FieldSpec] = &[
    FieldSpec {
        name: "entries",
        aliases: &["entries", "items", "experiences", "jobs", "positions"],
        flat: &[
            "work_experience",
            "workExperience",
            "experience",
            "experiences",
            "employment_history",
            "employmentHistory",
        ],
        kind: FieldKind::Records,
    },
    FieldSpec {
        name: "total_years",
        aliases: &[
            "total_years",
            "totalYears",
            "years_of_experience",
            "yearsOfExperience",
            "experience_years",
        ],
        flat: &[
            "total_experience",
            "totalExperience",
            "years_of_experience",
            "yearsOfExperience",
            "experience_years",
        ],
        kind: FieldKind::Number,
    },
    FieldSpec {
        name: "current_company",
        aliases: &["current_company", "currentCompany", "company"],
        flat: &["current_company", "currentCompany"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "current_title",
        aliases: &["current_title", "currentTitle", "designation", "job_title"],
        flat: &["current_title", "currentTitle", "designation", "job_title"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "employment_type",
        aliases: &["employment_type", "employmentType", "job_type"],
        flat: &[],
        kind: FieldKind::Choice(&EMPLOYMENT_TYPE),
    },
];

static SKILLS: &[FieldSpec] = &[
    FieldSpec {
        name: "skills",
        aliases: &["skills", "technical_skills", "technicalSkills", "skill_list", "items"],
        flat: &["skills", "technical_skills", "technicalSkills", "key_skills", "keySkills"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "soft_skills",
        aliases: &["soft_skills", "softSkills"],
        flat: &["soft_skills", "softSkills"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "tools",
        aliases: &["tools", "tools_and_technologies", "technologies"],
        flat: &["tools", "technologies"],
        kind: FieldKind::List,
    },
];

static PROJECTS: &[FieldSpec] = &[FieldSpec {
    name: "entries",
    aliases: &["entries", "items", "projects", "project_list"],
    flat: &["projects", "project_list", "projectList"],
    kind: FieldKind::Records,
}];

static ACHIEVEMENTS: &[FieldSpec] = &[FieldSpec {
    name: "entries",
    aliases: &["entries", "items", "achievements", "awards"],
    flat: &["achievements", "awards", "honors"],
    kind: FieldKind::Records,
}];

static CERTIFICATION: &[FieldSpec] = &[FieldSpec {
    name: "entries",
    aliases: &["entries", "items", "certifications", "certificates"],
    flat: &["certifications", "certificates", "certification"],
    kind: FieldKind::Records,
}];

static PREFERENCES: &[FieldSpec] = &[
    FieldSpec {
        name: "desired_roles",
        aliases: &["desired_roles", "desiredRoles", "preferred_roles", "job_titles"],
        flat: &["desired_roles", "desiredRoles", "preferred_roles"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "preferred_locations",
        aliases: &["preferred_locations", "preferredLocations", "locations"],
        flat: &["preferred_locations", "preferredLocations"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "work_arrangement",
        aliases: &[
            "work_arrangement",
            "workArrangement",
            "work_mode",
            "workMode",
            "remote_preference",
        ],
        flat: &[
            "work_arrangement",
            "workArrangement",
            "work_mode",
            "workMode",
            "remote_preference",
        ],
        kind: FieldKind::Choice(&WORK_ARRANGEMENT),
    },
    FieldSpec {
        name: "employment_type",
        aliases: &["employment_type", "employmentType", "job_type", "jobType"],
        flat: &["employment_type", "employmentType", "job_type", "jobType"],
        kind: FieldKind::Choice(&EMPLOYMENT_TYPE),
    },
    FieldSpec {
        name: "job_status",
        aliases: &["job_status", "jobStatus", "job_search_status", "availability"],
        flat: &["job_status", "jobStatus", "job_search_status", "availability"],
        kind: FieldKind::Choice(&JOB_STATUS),
    },
    FieldSpec {
        name: "expected_salary",
        aliases: &[
            "expected_salary",
            "expectedSalary",
            "salary_expectation",
            "desired_salary",
        ],
        flat: &[
            "expected_salary",
            "expectedSalary",
            "salary_expectation",
            "desired_salary",
        ],
        kind: FieldKind::Number,
    },
    FieldSpec {
        name: "notice_period_days",
        aliases: &["notice_period_days", "noticePeriodDays", "notice_period"],
        flat: &["notice_period_days", "noticePeriodDays", "notice_period"],
        kind: FieldKind::Number,
    },
    FieldSpec {
        name: "willing_to_relocate",
        aliases: &["willing_to_relocate", "willingToRelocate", "relocate"],
        flat: &["willing_to_relocate", "willingToRelocate"],
        kind: FieldKind::Bool,
    },
];

static OTHER_DETAILS: &[FieldSpec] = &[
    FieldSpec {
        name: "languages",
        aliases: &["languages", "spoken_languages", "languages_known"],
        flat: &["languages", "spoken_languages", "languages_known"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "hobbies",
        aliases: &["hobbies", "interests"],
        flat: &["hobbies", "interests"],
        kind: FieldKind::List,
    },
    FieldSpec {
        name: "references",
        aliases: &["references"],
        flat: &["references"],
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "notes",
        aliases: &["notes", "additional_notes", "other_info"],
        flat: &["additional_notes"],
        kind: FieldKind::Text,
    },
];
