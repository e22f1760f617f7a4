//! Text filter pipeline for rendered output.
//!
//! Raw page fields are stored as sent; the `rendered` forms are produced on
//! the way out by running them through a pipeline:
//! - titles: HTML sanitisation only
//! - content and excerpts: HTML sanitisation, then paragraph wrapping

/// Number of words kept when an excerpt is derived from content.
pub const EXCERPT_WORDS: usize = 55;

/// Appended to excerpts derived from longer content.
pub const EXCERPT_MORE: &str = " [&hellip;]";

/// Trait for text filters in the pipeline.
pub trait TextFilter: Send + Sync {
    /// Filter name for debugging.
    fn name(&self) -> &str;

    /// Process the input text and return filtered output.
    fn process(&self, input: &str) -> String;
}

/// Pipeline of text filters applied in sequence.
pub struct FilterPipeline {
    filters: Vec<Box<dyn TextFilter>>,
}

impl FilterPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add<F: TextFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Pipeline for titles (inline text, no block wrapping).
    pub fn for_title() -> Self {
        Self::new().add(SanitizeHtmlFilter)
    }

    /// Pipeline for content and excerpts.
    pub fn for_content() -> Self {
        Self::new().add(SanitizeHtmlFilter).add(AutoParagraphFilter)
    }

    /// Names of the filters in order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Process text through all filters in the pipeline.
    pub fn process(&self, input: &str) -> String {
        self.filters
            .iter()
            .fold(input.to_string(), |acc, filter| filter.process(&acc))
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::for_content()
    }
}

/// Filter that strips dangerous markup (scripts, event handlers, `javascript:` URLs).
pub struct SanitizeHtmlFilter;

impl TextFilter for SanitizeHtmlFilter {
    fn name(&self) -> &str {
        "sanitize_html"
    }

    fn process(&self, input: &str) -> String {
        ammonia::clean(input)
    }
}

/// Filter that wraps blank-line separated blocks in `<p>` and turns single
/// newlines into `<br />`.
pub struct AutoParagraphFilter;

impl AutoParagraphFilter {
    const BLOCK_TAGS: &'static [&'static str] = &[
        "<p", "<div", "<ul", "<ol", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6",
        "<blockquote", "<pre", "<table", "<hr", "<figure",
    ];

    fn is_block(text: &str) -> bool {
        let lower = text.to_ascii_lowercase();
        Self::BLOCK_TAGS.iter().any(|tag| lower.starts_with(tag))
    }
}

impl TextFilter for AutoParagraphFilter {
    fn name(&self) -> &str {
        "autop"
    }

    fn process(&self, input: &str) -> String {
        let normalized = input.replace("\r\n", "\n");
        let mut output = String::new();

        for block in normalized.split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            if Self::is_block(block) {
                output.push_str(block);
            } else {
                output.push_str("<p>");
                output.push_str(&block.replace('\n', "<br />\n"));
                output.push_str("</p>");
            }
            output.push('\n');
        }

        output
    }
}

/// Plain-text excerpt derived from HTML content: tags removed, cut to
/// [`EXCERPT_WORDS`] words.
pub fn excerpt_from_content(content: &str) -> String {
    let text = ammonia::Builder::empty().clean(content).to_string();
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.len() > EXCERPT_WORDS {
        format!("{}{}", words[..EXCERPT_WORDS].join(" "), EXCERPT_MORE)
    } else {
        words.join(" ")
    }
}
