//! Comments attached to declarations by the parser.

/// The comments surrounding one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub leading: Vec<Comment>,
    pub trailing: Vec<Comment>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }

    /// The leading documentation text, with comment delimiters stripped,
    /// one string per doc comment.
    pub fn doc_strings(&self) -> impl Iterator<Item = String> + '_ {
        self.leading
            .iter()
            .filter(|comment| comment.is_doc())
            .map(Comment::text)
    }
}

/// A single source comment, stored verbatim including its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    source: String,
}

const BLOCK_DOC_PREFIX: &str = "/**";
const BLOCK_PREFIX: &str = "/*";
const LINE_DOC_PREFIX: &str = "///";
const LINE_PREFIX: &str = "//";
const BLOCK_SUFFIX: &str = "*/";

impl Comment {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn is_multiline(&self) -> bool {
        self.source.starts_with(BLOCK_PREFIX)
    }

    /// Documentation comments start with `/**` or `///`.
    pub fn is_doc(&self) -> bool {
        if self.is_multiline() {
            self.source.starts_with(BLOCK_DOC_PREFIX)
        } else {
            self.source.starts_with(LINE_DOC_PREFIX)
        }
    }

    /// The comment text without delimiters.
    pub fn text(&self) -> String {
        // Longer prefixes first, so `/**` is not consumed as `/*` + `*`.
        let mut text = self.source.as_str();
        for prefix in [BLOCK_DOC_PREFIX, BLOCK_PREFIX, LINE_DOC_PREFIX, LINE_PREFIX] {
            if let Some(stripped) = text.strip_prefix(prefix) {
                text = stripped;
                break;
            }
        }
        text.strip_suffix(BLOCK_SUFFIX).unwrap_or(text).to_string()
    }
}
