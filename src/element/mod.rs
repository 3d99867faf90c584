//! Owned in-memory form of one parsed XML element.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawElement {
    pub tag: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: RawElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// The `k`/`v` pair of a `tag` child, only when both are present.
    pub fn tag_pair(&self) -> Option<(&str, &str)> {
        Some((self.attr("k")?, self.attr("v")?))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.tag.as_str(), "node" | "way")
    }
}
