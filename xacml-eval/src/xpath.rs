//! XPath evaluation hook for AttributeSelector.
//!
//! Real XPath machinery stays outside the core engine: the embedding
//! registers an [`XPathEvaluator`] when it enables selector support. With
//! no evaluator (or with `xpath_enabled = false`), every selector
//! evaluation is a processing-error Indeterminate.

use xacml_core::{Bag, Datatype, EvalError};

/// Evaluates an XPath expression against a category's Content element.
pub trait XPathEvaluator: Send + Sync {
    /// Select nodes from `content` (the category's `<Content>` XML) and
    /// parse each selected node's string value as `datatype`.
    ///
    /// `context_node` is the value of the selector's ContextSelectorId
    /// attribute, when present; the path is evaluated relative to it.
    fn select(
        &self,
        content: &str,
        path: &str,
        context_node: Option<&str>,
        datatype: Datatype,
    ) -> Result<Bag, EvalError>;
}
