use crate::form::definition::{FieldDefinition, FieldType, FormDefinition};

/// University-admissions intake form used when no form file is configured.
///
/// `parent_name` is only asked for when a parent fills the form. Deployments
/// that always want it, or want an "N/A" placeholder, should ship a form file.
pub fn admissions() -> FormDefinition {
    FormDefinition::from_trusted(vec![
        FieldDefinition::new(
            "form_filler_type",
            FieldType::String,
            "Who is filling the form? Options: 'Parent', 'Student'",
        ),
        FieldDefinition::new("student_name", FieldType::String, "Full name of the student."),
        FieldDefinition::new(
            "parent_name",
            FieldType::String,
            "Full name of the parent (Only if form_filler_type is Parent).",
        )
        .required_when("form_filler_type", "Parent"),
        FieldDefinition::new(
            "current_grade",
            FieldType::String,
            "Current academic grade (e.g., Grade 9, Grade 12, Gap Year).",
        ),
        FieldDefinition::new("phone_number", FieldType::String, "Contact number."),
        FieldDefinition::new("parent_email", FieldType::Email, "Email address."),
        FieldDefinition::new("location", FieldType::String, "City or place of residence."),
        FieldDefinition::new(
            "curriculum_type",
            FieldType::String,
            "Current curriculum (e.g., CBSE, ICSE, IB, State Board).",
        ),
        FieldDefinition::new("school_name", FieldType::String, "Name of the current school."),
        FieldDefinition::new(
            "target_geographies",
            FieldType::String,
            "Preferred countries for study (e.g., USA, UK, Canada).",
        ),
        FieldDefinition::new(
            "scholarship_requirement",
            FieldType::String,
            "Scholarship needs. Options: 'Full', 'Partial', 'None'.",
        ),
    ])
}
