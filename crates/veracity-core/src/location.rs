//! Location pointers for validation issues.
//!
//! Every issue points at the place it was found: a byte range of the
//! narrative, a narrative section, a metric field, or a validator
//! component.

/// Pointer into the narrative text (byte offsets).
pub fn narrative(start: usize, end: usize) -> String {
    format!("narrative[{}:{}]", start, end)
}

/// Pointer into a named narrative section.
pub fn section(name: &str) -> String {
    format!("narrative.section[{}]", name)
}

/// Pointer to a metric field.
pub fn metric(field: &str) -> String {
    format!("metrics.{}", field)
}

/// Pointer to a validator component, used when the validator itself fails.
pub fn component(name: &str) -> String {
    format!("validator.{}", name)
}

/// Fluent builder for locations spanning two narrative ranges.
pub struct LocationBuilder {
    parts: Vec<String>,
}

impl LocationBuilder {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Add a narrative range.
    pub fn narrative(mut self, start: usize, end: usize) -> Self {
        self.parts.push(narrative(start, end));
        self
    }

    /// Join all parts into one pointer.
    pub fn build(self) -> String {
        self.parts.join(" <-> ")
    }
}

impl Default for LocationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrative_pointer() {
        assert_eq!(narrative(42, 68), "narrative[42:68]");
    }

    #[test]
    fn test_metric_and_component_pointers() {
        assert_eq!(metric("ctr"), "metrics.ctr");
        assert_eq!(component("math"), "validator.math");
    }

    #[test]
    fn test_builder_joins_ranges() {
        let location = LocationBuilder::new()
            .narrative(0, 10)
            .narrative(100, 120)
            .build();
        assert_eq!(location, "narrative[0:10] <-> narrative[100:120]");
    }
}
