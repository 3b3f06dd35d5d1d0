//! Binding errors.
//!
//! Every variant is fatal for the node being bound: the pass over that node
//! stops and the error reaches the caller of the apply entry point.

use thiserror::Error;

use crate::expr::ExprError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("the '{directive}' directive cannot be used with virtual elements")]
    VirtualNotAllowed { directive: String },

    #[error(
        "multiple directives ('{first}' and '{second}') are trying to control descendant bindings of the same element"
    )]
    MultipleControllers { first: String, second: String },

    #[error("case directive must be used inside a switch")]
    CaseOutsideSwitch,

    #[error("case directives cannot be nested")]
    CaseNested,

    #[error("bindings can only be applied to elements and virtual elements")]
    InvalidRoot,

    #[error("the value for a '{directive}' directive must be a function")]
    NotAFunction { directive: String },

    #[error("the '{directive}' directive only applies to <{tag}> elements")]
    RequiresElement { directive: String, tag: String },

    #[error("the '{directive}' directive requires an object")]
    RequiresObject { directive: String },

    #[error("unable to evaluate bindings '{bindings}': {source}")]
    InvalidBindings {
        bindings: String,
        #[source]
        source: ExprError,
    },

    #[error(transparent)]
    Expression(#[from] ExprError),
}

pub type Result<T> = std::result::Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_directive() {
        let err = BindingError::MultipleControllers {
            first: "if".into(),
            second: "html".into(),
        };
        assert!(err.to_string().contains("'if' and 'html'"));
        let err = BindingError::VirtualNotAllowed {
            directive: "value".into(),
        };
        assert_eq!(
            err.to_string(),
            "the 'value' directive cannot be used with virtual elements"
        );
    }

    #[test]
    fn expression_errors_convert() {
        let err: BindingError = ExprError::UnknownIdentifier("x".into()).into();
        assert_eq!(err.to_string(), "'x' is not defined");
    }
}
