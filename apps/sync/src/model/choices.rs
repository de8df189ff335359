//! Choice maps: the small integer codes the backend uses for enumerated fields.
//!
//! Decoding is total: an unknown code decodes to an empty label. Encoding is
//! total for any label: an unknown label encodes to the map's default code.

/// A fixed bidirectional mapping between integer codes and canonical labels
/// for one enumerated field.
#[derive(Debug)]
pub struct ChoiceMap {
    pub field: &'static str,
    pub entries: &'static [(u8, &'static str)],
    /// Alternate spellings accepted on decode, mapped onto a canonical label.
    pub alternates: &'static [(&'static str, &'static str)],
    pub default_code: u8,
}

impl ChoiceMap {
    /// Canonical label for a code, if the code is known.
    pub fn label(&self, code: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| i64::from(*c) == code)
            .map(|(_, label)| *label)
    }

    /// Case-insensitive match of `raw` against canonical labels, then alternates.
    pub fn canonical_label(&self, raw: &str) -> Option<&'static str> {
        let raw = raw.trim();
        self.entries
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(raw))
            .map(|(_, label)| *label)
            .or_else(|| {
                self.alternates
                    .iter()
                    .find(|(alt, _)| alt.eq_ignore_ascii_case(raw))
                    .map(|(_, label)| *label)
            })
    }

    /// Code for a label (canonical or alternate), if known.
    pub fn code(&self, label: &str) -> Option<u8> {
        let canonical = self.canonical_label(label)?;
        self.entries
            .iter()
            .find(|(_, l)| *l == canonical)
            .map(|(code, _)| *code)
    }
}

pub static EMPLOYMENT_TYPE: ChoiceMap = ChoiceMap {
    field: "employment_type",
    entries: &[
        (1, "Full-time"),
        (2, "Part-time"),
        (3, "Contract"),
        (4, "Internship"),
        (5, "Freelance"),
    ],
    alternates: &[
        ("full_time", "Full-time"),
        ("full time", "Full-time"),
        ("fulltime", "Full-time"),
        ("part_time", "Part-time"),
        ("part time", "Part-time"),
        ("contractor", "Contract"),
        ("intern", "Internship"),
        ("freelancer", "Freelance"),
    ],
    default_code: 1,
};

pub static WORK_ARRANGEMENT: ChoiceMap = ChoiceMap {
    field: "work_arrangement",
    entries: &[(1, "Onsite"), (2, "Remote"), (3, "Hybrid")],
    alternates: &[
        ("on-site", "Onsite"),
        ("on_site", "Onsite"),
        ("office", "Onsite"),
        ("in office", "Onsite"),
        ("wfh", "Remote"),
        ("work from home", "Remote"),
    ],
    default_code: 1,
};

pub static JOB_STATUS: ChoiceMap = ChoiceMap {
    field: "job_status",
    entries: &[
        (1, "Actively looking"),
        (2, "Open to offers"),
        (3, "Not looking"),
    ],
    alternates: &[
        ("active", "Actively looking"),
        ("actively_looking", "Actively looking"),
        ("open", "Open to offers"),
        ("open_to_offers", "Open to offers"),
        ("passive", "Open to offers"),
        ("closed", "Not looking"),
        ("not_looking", "Not looking"),
    ],
    default_code: 2,
};
