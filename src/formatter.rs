//! Template compilation and line rendering
//!
//! A format string such as `%{@timestamp} %{level,severity} %{message}` is
//! compiled once into a [`Template`] of literal and placeholder segments.
//! Placeholders hold a [`FieldSpec`]; unresolved placeholders render as
//! [`NULL_MARKER`]. An empty format string compiles to an empty template,
//! which renders the whole record as canonical JSON instead.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::warn;

use crate::record::{FieldSpec, Record};
use crate::sink::Sink;

/// Text substituted for a placeholder whose field is absent
pub const NULL_MARKER: &str = "%{null}";

/// Format used when none is configured
pub const DEFAULT_FORMAT: &str = "%{@timestamp} %{type} %{HOSTNAME} %{level} %{message}";

fn placeholder_regex() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"%\{[^}]+\}").ok())
        .as_ref()
}

/// One piece of a compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim
    Literal(String),
    /// Field substituted from the record
    Field(FieldSpec),
}

/// Compiled display template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a format string.
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::formatter::{Segment, Template};
    /// use logstash_kafka_tail::record::FieldSpec;
    ///
    /// let template = Template::compile("abc %{test} bar");
    /// assert_eq!(
    ///     template.segments(),
    ///     &[
    ///         Segment::Literal("abc ".to_string()),
    ///         Segment::Field(FieldSpec::parse("test")),
    ///         Segment::Literal(" bar".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn compile(format: &str) -> Self {
        let mut segments = Vec::new();
        if format.is_empty() {
            return Self { segments };
        }

        let Some(placeholder) = placeholder_regex() else {
            warn!(format = %format, "Placeholder pattern unavailable, printing format verbatim");
            segments.push(Segment::Literal(format.to_string()));
            return Self { segments };
        };

        let mut last = 0;
        for m in placeholder.find_iter(format) {
            if m.start() > last {
                segments.push(Segment::Literal(format[last..m.start()].to_string()));
            }
            let key = &m.as_str()[2..m.as_str().len() - 1];
            segments.push(Segment::Field(FieldSpec::parse(key)));
            last = m.end();
        }

        if last < format.len() {
            segments.push(Segment::Literal(format[last..].to_string()));
        }

        Self { segments }
    }

    /// Compiled segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true for the "serialize the whole record" template
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Field specs referenced by placeholders
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(spec) => Some(spec),
            Segment::Literal(_) => None,
        })
    }

    /// Render a record to a display line
    pub fn render(&self, record: &Record) -> String {
        if self.is_empty() {
            return match record.to_canonical_json() {
                Ok(json) => json,
                Err(e) => format!("error serializing record: {}", e),
            };
        }

        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Field(spec) => match record.resolve_string(spec) {
                    Some(value) => line.push_str(&value),
                    None => line.push_str(NULL_MARKER),
                },
            }
        }
        line
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Field(spec) => write!(f, "%{{{}}}", spec)?,
            }
        }
        Ok(())
    }
}

/// Sink that renders each record and writes it as one line.
pub struct Formatter<W> {
    template: Template,
    out: Mutex<W>,
}

impl Formatter<io::Stdout> {
    /// Formatter writing to standard output
    pub fn stdout(template: Template) -> Self {
        Self::new(template, io::stdout())
    }
}

impl<W: Write + Send> Formatter<W> {
    /// Formatter writing to an arbitrary writer
    pub fn new(template: Template, out: W) -> Self {
        Self {
            template,
            out: Mutex::new(out),
        }
    }

    /// Render a record without writing it
    pub fn render(&self, record: &Record) -> String {
        self.template.render(record)
    }

    /// Template this formatter renders with
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> Sink for Formatter<W> {
    async fn print(&self, record: Record) {
        let line = self.render(&record);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!(error = %e, "Failed to write record");
        }
    }
}
