//! Candidate URL resolution
//!
//! One artifact may be served by several hosts. The candidate list is built
//! in priority order: caller overrides, then the artifact's own URL, then
//! well-known mirrors with the artifact's relative path appended.

/// Ordered, de-duplicated candidate URLs for one artifact
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    urls: Vec<String>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller-supplied URLs. One or many, they all go ahead of anything
    /// added later.
    pub fn with_overrides<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            self.push(url.into());
        }
        self
    }

    /// The URL recorded in the artifact's metadata
    pub fn with_canonical(mut self, url: impl Into<String>) -> Self {
        self.push(url.into());
        self
    }

    /// `root + relative_path` for every mirror root, in order
    pub fn with_mirrors<S: AsRef<str>>(mut self, roots: &[S], relative_path: &str) -> Self {
        for root in roots {
            self.push(join_url(root.as_ref(), relative_path));
        }
        self
    }

    fn push(&mut self, url: String) {
        if !url.is_empty() && !self.urls.contains(&url) {
            self.urls.push(url);
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn build(self) -> Vec<String> {
        self.urls
    }
}

/// Join a host root and a relative path with exactly one `/`
pub fn join_url(root: &str, relative_path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        relative_path.trim_start_matches('/')
    )
}
