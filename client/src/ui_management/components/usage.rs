use ratatui::{
    style::Stylize,
    text::{Line, Span, Text},
};

#[derive(Debug, Clone)]
pub struct UsageInfoLine {
    pub keys: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UsageInfo {
    pub description: Option<String>,
    pub lines: Vec<UsageInfoLine>,
}

impl UsageInfo {
    pub fn new(description: impl Into<String>) -> Self {
        UsageInfo {
            description: Some(description.into()),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, keys: &[&str], description: impl Into<String>) -> Self {
        self.lines.push(UsageInfoLine {
            keys: keys.iter().map(|key| key.to_string()).collect(),
            description: description.into(),
        });
        self
    }
}

pub trait HasUsageInfo {
    fn usage_info(&self) -> UsageInfo;
}

fn key_to_span<'a>(key: &str) -> Span<'a> {
    Span::from(format!("({})", key)).bold()
}

pub fn widget_usage_to_text<'a>(usage: UsageInfo) -> Text<'a> {
    let mut lines: Vec<Line> = vec![];
    if let Some(description) = usage.description {
        lines.push(Line::from(description));
    }

    for usage_line in usage.lines {
        let mut bindings: Vec<Span> = match usage_line.keys.as_slice() {
            [] => vec![],
            [key] => vec![key_to_span(key)],
            [first, second] => vec![key_to_span(first), " or ".into(), key_to_span(second)],
            [leading @ .., last] => {
                let mut bindings: Vec<Span> = Vec::with_capacity(usage_line.keys.len() * 2);

                for key in leading {
                    bindings.push(key_to_span(key));
                    bindings.push(", ".into());
                }

                bindings.push("or ".into());
                bindings.push(key_to_span(last));

                bindings
            }
        };

        bindings.push(Span::from(format!(" {}", usage_line.description)));

        lines.push(Line::from(bindings));
    }

    Text::from(lines)
}
