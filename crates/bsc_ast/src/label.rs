use bsc_span::{SourcePosition, SourceRange};

use crate::CaseValue;
use crate::Expr;
use crate::OneWrite;

/// A `case <constant>:` or `default:` label heading a `match` arm. `value`
/// is `None` for a `default` label.
#[derive(Debug)]
pub struct Label {
    pub range: SourceRange,
    pub keyword: SourcePosition,
    pub value: Option<Box<Expr>>,
    pub colon: SourcePosition,
    pub is_default: bool,
    /// Filled in by the semantic analyzer once the label's constant
    /// expression is evaluated (§4.4 case-label evaluation).
    pub evaluated_value: OneWrite<CaseValue>,
}

impl Label {
    pub fn case_position(&self) -> Option<SourcePosition> {
        (!self.is_default).then_some(self.keyword)
    }

    pub fn default_position(&self) -> Option<SourcePosition> {
        self.is_default.then_some(self.keyword)
    }
}
