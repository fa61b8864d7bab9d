use intake_core::form::record::record_to_json;
use intake_core::{DataRecord, FieldDefinition, FormDefinition};

pub const DEFAULT_ASSISTANT_NAME: &str = "Vishy";

/// Everything one turn's prompt is built from.
#[derive(Clone, Debug)]
pub struct PromptContext<'a> {
    pub form: &'a FormDefinition,
    pub record: &'a DataRecord,
    pub missing: &'a [&'a FieldDefinition],
    pub user_message: &'a str,
    pub last_question: Option<&'a str>,
    pub start: bool,
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    assistant_name: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_NAME)
    }
}

impl PromptBuilder {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self { assistant_name: assistant_name.into() }
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn build(&self, context: &PromptContext<'_>) -> String {
        let sections = [
            self.persona(),
            last_question_section(context.last_question),
            captured_data_section(context.record),
            field_definitions_section(context.form),
            missing_fields_section(context.missing, context.start),
            instructions_section(),
            output_contract_section(),
            format!("USER SAYS: {}", quoted(context.user_message)),
        ];

        sections.join("\n\n")
    }

    fn persona(&self) -> String {
        format!(
            "You are \"{}\", a warm, professional assistant collecting information through a \
             natural conversation. Ask for one missing piece of information at a time.",
            self.assistant_name
        )
    }
}

fn last_question_section(last_question: Option<&str>) -> String {
    match last_question.map(str::trim).filter(|question| !question.is_empty()) {
        Some(question) => format!("YOUR LAST QUESTION: {}", quoted(question)),
        None => "YOUR LAST QUESTION: (none)".to_string(),
    }
}

fn captured_data_section(record: &DataRecord) -> String {
    let json = serde_json::to_string_pretty(&record_to_json(record))
        .unwrap_or_else(|_| "{}".to_string());
    format!("CURRENT CAPTURED DATA:\n{json}")
}

fn field_definitions_section(form: &FormDefinition) -> String {
    let lines = form
        .fields()
        .iter()
        .map(|field| {
            let mut line =
                format!("- {} ({}): {}", field.name, field.field_type, field.description);
            if let Some(rule) = field.requirement.describe() {
                line.push_str(&format!(" [ask {rule}]"));
            }
            line
        })
        .collect::<Vec<_>>();

    format!("FIELD DEFINITIONS:\n{}", lines.join("\n"))
}

fn missing_fields_section(missing: &[&FieldDefinition], start: bool) -> String {
    let mut section = if missing.is_empty() {
        "MISSING FIELDS: none. Thank the user and close the conversation.".to_string()
    } else {
        let names = missing.iter().map(|field| field.name.as_str()).collect::<Vec<_>>();
        format!(
            "MISSING FIELDS: {}\nNEXT FIELD TO ASK FOR: {}",
            names.join(", "),
            missing[0].name
        )
    };

    if start {
        section.push_str("\nThis is the start of the conversation: greet the user first.");
    }
    section
}

fn instructions_section() -> String {
    [
        "INSTRUCTIONS:",
        "1. Extract every field value the user's message provides, even unprompted ones.",
        "2. Interpret short answers in light of your last question.",
        "3. If the user corrects an earlier answer, extract the corrected value.",
        "4. Never ask again for a field that already has a value.",
        "5. Ask for the next missing field only. Keep the tone empathetic and encouraging.",
    ]
    .join("\n")
}

fn output_contract_section() -> String {
    [
        "CRITICAL OUTPUT RULE: return a single JSON object and nothing else. No markdown.",
        "{",
        "  \"ai_message\": \"your conversational reply\",",
        "  \"extracted_data\": { \"field_name\": \"value\" },",
        "  \"is_complete\": false",
        "}",
        "\"extracted_data\" holds only values newly provided or corrected in this message.",
    ]
    .join("\n")
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}
