use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The nine canonical profile sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    BasicInfo,
    Education,
    WorkExperience,
    Skills,
    Projects,
    Achievements,
    Certification,
    Preferences,
    OtherDetails,
}

impl SectionKind {
    pub const ALL: [SectionKind; 9] = [
        SectionKind::BasicInfo,
        SectionKind::Education,
        SectionKind::WorkExperience,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Achievements,
        SectionKind::Certification,
        SectionKind::Preferences,
        SectionKind::OtherDetails,
    ];

    /// Canonical key used when serializing a profile or patch.
    pub fn key(&self) -> &'static str {
        match self {
            SectionKind::BasicInfo => "basic_info",
            SectionKind::Education => "education",
            SectionKind::WorkExperience => "work_experience",
            SectionKind::Skills => "skills",
            SectionKind::Projects => "projects",
            SectionKind::Achievements => "achievements",
            SectionKind::Certification => "certification",
            SectionKind::Preferences => "preferences",
            SectionKind::OtherDetails => "other_details",
        }
    }

    /// Keys under which a pre-shaped section may appear, highest priority first.
    /// The canonical key is always first.
    pub fn section_keys(&self) -> &'static [&'static str] {
        match self {
            SectionKind::BasicInfo => &[
                "basic_info",
                "basicInfo",
                "identity",
                "personal_info",
                "personalInfo",
            ],
            SectionKind::Education => &["education", "educations", "education_details"],
            SectionKind::WorkExperience => &[
                "work_experience",
                "workExperience",
                "experience_details",
                "employment",
            ],
            SectionKind::Skills => &["skills", "skill_set", "skillSet"],
            SectionKind::Projects => &["projects", "project_details"],
            SectionKind::Achievements => &["achievements", "awards"],
            SectionKind::Certification => &["certification", "certifications"],
            SectionKind::Preferences => &["preferences", "job_preferences", "jobPreferences"],
            SectionKind::OtherDetails => &["other_details", "otherDetails", "additional_info"],
        }
    }
}

/// One profile section: a record of scalar or list fields keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Section(Map<String, Value>);

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow merge: fields in `other` overwrite, fields only in `self` survive.
    pub fn absorb(&mut self, other: &Section) {
        for (field, value) in other.iter() {
            self.0.insert(field.clone(), value.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Section {
    fn from(map: Map<String, Value>) -> Self {
        Section(map)
    }
}

impl FromIterator<(String, Value)> for Section {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Section(iter.into_iter().collect())
    }
}

/// The single normalized shape every backend payload is converted into.
/// Every section is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalProfile {
    pub basic_info: Section,
    pub education: Section,
    pub work_experience: Section,
    pub skills: Section,
    pub projects: Section,
    pub achievements: Section,
    pub certification: Section,
    pub preferences: Section,
    pub other_details: Section,
}

impl CanonicalProfile {
    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::BasicInfo => &self.basic_info,
            SectionKind::Education => &self.education,
            SectionKind::WorkExperience => &self.work_experience,
            SectionKind::Skills => &self.skills,
            SectionKind::Projects => &self.projects,
            SectionKind::Achievements => &self.achievements,
            SectionKind::Certification => &self.certification,
            SectionKind::Preferences => &self.preferences,
            SectionKind::OtherDetails => &self.other_details,
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::BasicInfo => &mut self.basic_info,
            SectionKind::Education => &mut self.education,
            SectionKind::WorkExperience => &mut self.work_experience,
            SectionKind::Skills => &mut self.skills,
            SectionKind::Projects => &mut self.projects,
            SectionKind::Achievements => &mut self.achievements,
            SectionKind::Certification => &mut self.certification,
            SectionKind::Preferences => &mut self.preferences,
            SectionKind::OtherDetails => &mut self.other_details,
        }
    }
}

/// A partial `CanonicalProfile`: zero or more sections, each possibly partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_info: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_experience: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievements: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_details: Option<Section>,
}

impl CanonicalPatch {
    /// A patch carrying exactly one section.
    pub fn single(kind: SectionKind, section: Section) -> Self {
        let mut patch = Self::default();
        patch.set(kind, section);
        patch
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.slot(kind).as_ref()
    }

    pub fn set(&mut self, kind: SectionKind, section: Section) {
        *self.slot_mut(kind) = Some(section);
    }

    /// Present sections in canonical order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionKind, &Section)> + '_ {
        SectionKind::ALL
            .into_iter()
            .filter_map(move |kind| self.section(kind).map(|s| (kind, s)))
    }

    /// True when no section is present at all.
    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    /// True when at least one present section carries a field.
    pub fn has_content(&self) -> bool {
        self.sections().any(|(_, s)| !s.is_empty())
    }

    /// Sequential composition: `other` is applied on top of `self`, with the
    /// same section-wise shallow merge the profile merger uses.
    pub fn then(mut self, other: CanonicalPatch) -> CanonicalPatch {
        for kind in SectionKind::ALL {
            if let Some(incoming) = other.section(kind) {
                let slot = self.slot_mut(kind);
                match slot {
                    Some(existing) => existing.absorb(incoming),
                    None => *slot = Some(incoming.clone()),
                }
            }
        }
        self
    }

    fn slot(&self, kind: SectionKind) -> &Option<Section> {
        match kind {
            SectionKind::BasicInfo => &self.basic_info,
            SectionKind::Education => &self.education,
            SectionKind::WorkExperience => &self.work_experience,
            SectionKind::Skills => &self.skills,
            SectionKind::Projects => &self.projects,
            SectionKind::Achievements => &self.achievements,
            SectionKind::Certification => &self.certification,
            SectionKind::Preferences => &self.preferences,
            SectionKind::OtherDetails => &self.other_details,
        }
    }

    fn slot_mut(&mut self, kind: SectionKind) -> &mut Option<Section> {
        match kind {
            SectionKind::BasicInfo => &mut self.basic_info,
            SectionKind::Education => &mut self.education,
            SectionKind::WorkExperience => &mut self.work_experience,
            SectionKind::Skills => &mut self.skills,
            SectionKind::Projects => &mut self.projects,
            SectionKind::Achievements => &mut self.achievements,
            SectionKind::Certification => &mut self.certification,
            SectionKind::Preferences => &mut self.preferences,
            SectionKind::OtherDetails => &mut self.other_details,
        }
    }
}
