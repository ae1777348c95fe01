//! Subfolder template expansion
//!
//! Templates mix literal text with `%x` wildcards that pull values from a
//! record's metadata, e.g. `%a/%y` or `{%y - }%t`. A `/` in the template
//! separates directories. Values are sanitized so a title containing `/`
//! or `:` never creates extra directories or invalid names.
//!
//! | Token | Value |
//! |-------|-------|
//! | `%a` | last name of the first author (else first creator) |
//! | `%A` | first letter of `%a`, upper-cased |
//! | `%F` | first name of the first author |
//! | `%e` | last name of the first editor |
//! | `%y` | four-digit year |
//! | `%t` | title |
//! | `%T` | item type |
//! | `%j` | publication title |
//! | `%s` | journal abbreviation |
//! | `%p` | publisher |
//! | `%w` | publication title, else publisher |
//! | `%v` | volume |
//! | `%i` | issue |
//! | `%b` | citation key |
//! | `%%` | literal `%` |
//!
//! Missing fields and unrecognized wildcards expand to the empty string.
//! A `{...}` group is emitted only when every wildcard inside it produced
//! a non-empty value, which keeps separators like ` - ` from dangling.

use crate::model::ItemMetadata;

/// A metadata field addressable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    AuthorLastName,
    AuthorInitial,
    AuthorFirstName,
    EditorLastName,
    Year,
    Title,
    ItemType,
    PublicationTitle,
    JournalAbbreviation,
    Publisher,
    PublicationOrPublisher,
    Volume,
    Issue,
    CitationKey,
}

impl Wildcard {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'a' => Self::AuthorLastName,
            'A' => Self::AuthorInitial,
            'F' => Self::AuthorFirstName,
            'e' => Self::EditorLastName,
            'y' => Self::Year,
            't' => Self::Title,
            'T' => Self::ItemType,
            'j' => Self::PublicationTitle,
            's' => Self::JournalAbbreviation,
            'p' => Self::Publisher,
            'w' => Self::PublicationOrPublisher,
            'v' => Self::Volume,
            'i' => Self::Issue,
            'b' => Self::CitationKey,
            _ => return None,
        })
    }

    /// Raw (unsanitized) value for this wildcard, `None` when absent or blank.
    pub fn resolve(self, meta: &ItemMetadata) -> Option<String> {
        let value = match self {
            Self::AuthorLastName => meta.primary_creator().map(|c| c.last_name.clone()),
            Self::AuthorInitial => meta
                .primary_creator()
                .and_then(|c| c.last_name.trim().chars().next())
                .map(|c| c.to_uppercase().collect()),
            Self::AuthorFirstName => meta.primary_creator().map(|c| c.first_name.clone()),
            Self::EditorLastName => meta.first_creator("editor").map(|c| c.last_name.clone()),
            Self::Year => meta.year().map(String::from),
            Self::Title => meta.title.clone(),
            Self::ItemType => meta.item_type.clone(),
            Self::PublicationTitle => meta.publication_title.clone(),
            Self::JournalAbbreviation => meta.journal_abbreviation.clone(),
            Self::Publisher => meta.publisher.clone(),
            Self::PublicationOrPublisher => non_blank(meta.publication_title.clone())
                .or_else(|| meta.publisher.clone()),
            Self::Volume => meta.volume.clone(),
            Self::Issue => meta.issue.clone(),
            Self::CitationKey => meta.citation_key.clone(),
        };
        non_blank(value)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field(Wildcard),
    /// `%x` where `x` names no wildcard
    Unknown(char),
    Group(Vec<Token>),
}

/// A parsed template, reusable across many records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Parse a template. Parsing never fails: anything that is not a
    /// well-formed wildcard or group is kept as literal text.
    pub fn parse(source: &str) -> Self {
        Self {
            tokens: tokenize(source, true),
        }
    }

    /// Expand against `meta`.
    pub fn render(&self, meta: &ItemMetadata) -> String {
        render_tokens(&self.tokens, meta).0
    }
}

/// Expand `template` against `meta` in one step.
pub fn expand(meta: &ItemMetadata, template: &str) -> String {
    Template::parse(template).render(meta)
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

fn tokenize(source: &str, allow_groups: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        let width = c.len_utf8();
        match c {
            '%' => {
                let mut after = rest[width..].chars();
                match after.next() {
                    None => {
                        push_literal(&mut tokens, "%");
                        rest = "";
                    }
                    Some('%') => {
                        push_literal(&mut tokens, "%");
                        rest = &rest[width + 1..];
                    }
                    Some(code) => {
                        tokens.push(match Wildcard::from_char(code) {
                            Some(wildcard) => Token::Field(wildcard),
                            None => Token::Unknown(code),
                        });
                        rest = &rest[width + code.len_utf8()..];
                    }
                }
            }
            '{' if allow_groups => {
                let body = &rest[width..];
                // A group closes at the first `}`; another `{` first means
                // this brace is unbalanced and therefore literal.
                match body.find(['{', '}']) {
                    Some(end) if body[end..].starts_with('}') => {
                        tokens.push(Token::Group(tokenize(&body[..end], false)));
                        rest = &body[end + 1..];
                    }
                    _ => {
                        push_literal(&mut tokens, "{");
                        rest = body;
                    }
                }
            }
            _ => {
                push_literal(&mut tokens, &rest[..width]);
                rest = &rest[width..];
            }
        }
    }

    tokens
}

/// Render tokens; the flag reports whether every wildcard had a value.
fn render_tokens(tokens: &[Token], meta: &ItemMetadata) -> (String, bool) {
    let mut out = String::new();
    let mut complete = true;

    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Field(wildcard) => match wildcard.resolve(meta) {
                Some(value) => out.push_str(&sanitize(&value)),
                None => complete = false,
            },
            Token::Unknown(code) => {
                tracing::debug!(wildcard = %code, "Unrecognized template wildcard");
                complete = false;
            }
            Token::Group(inner) => {
                let (text, group_complete) = render_tokens(inner, meta);
                if group_complete {
                    out.push_str(&text);
                }
            }
        }
    }

    (out, complete)
}

/// Make a metadata value safe to use inside a single path segment.
fn sanitize(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    replaced.trim().trim_end_matches('.').trim_end().to_string()
}
