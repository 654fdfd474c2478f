use super::LocalizationError;

/// Values a notification template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    WorkerName,
    JobTitle,
    Village,
    District,
    Wage,
    Contact,
    Score,
}

impl TemplateField {
    fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "worker_name" => Some(Self::WorkerName),
            "job_title" => Some(Self::JobTitle),
            "village" => Some(Self::Village),
            "district" => Some(Self::District),
            "wage" => Some(Self::Wage),
            "contact" => Some(Self::Contact),
            "score" => Some(Self::Score),
            _ => None,
        }
    }
}

/// Field values for one rendered message. `score` is already rounded to a whole percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFields {
    pub worker_name: String,
    pub job_title: String,
    pub village: String,
    pub district: String,
    pub wage: u32,
    pub contact: String,
    pub score: u32,
}

impl NotificationFields {
    fn write(&self, field: TemplateField, out: &mut String) {
        match field {
            TemplateField::WorkerName => out.push_str(&self.worker_name),
            TemplateField::JobTitle => out.push_str(&self.job_title),
            TemplateField::Village => out.push_str(&self.village),
            TemplateField::District => out.push_str(&self.district),
            TemplateField::Wage => out.push_str(&self.wage.to_string()),
            TemplateField::Contact => out.push_str(&self.contact),
            TemplateField::Score => out.push_str(&self.score.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TemplateField),
}

/// Template source split into literal text and `{placeholder}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    pub fn compile(source: &str) -> Result<Self, LocalizationError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| LocalizationError::UnclosedPlaceholder(source.to_string()))?;
            let name = after[..close].trim();
            let field = TemplateField::from_placeholder(name)
                .ok_or_else(|| LocalizationError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Field(field));
            rest = &after[close + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, fields: &NotificationFields) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => fields.write(*field, &mut out),
            }
        }
        out
    }
}
