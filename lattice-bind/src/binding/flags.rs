//! Directive behaviour flags.

use bitflags::bitflags;

bitflags! {
    /// Behavioural traits of a directive.
    ///
    /// The engine and the rewriter only ever test these bits; a directive's
    /// handlers never inspect another directive's flags.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirectiveFlags: u16 {
        /// Writes the model back when the node changes. The rewriter emits a
        /// property writer for writable expressions.
        const TWO_WAY         = 0o001;
        /// The value is a callback invoked with event arguments.
        const EVENT_HANDLER   = 0o002;
        /// Takes over binding of the node's descendants.
        const CONTENT_BIND    = 0o004;
        /// Erases or replaces the node's content.
        const CONTENT_SET     = 0o010;
        /// Modifies content after the content's own bindings ran.
        const CONTENT_UPDATE  = 0o020;
        /// May be written without a value, meaning `true`.
        const NO_VALUE        = 0o040;
        /// Accepts `name.sub: v` and `name: {sub: v}` groups.
        const TWO_LEVEL       = 0o100;
        /// Allowed on `<!-- ko -->` virtual elements.
        const VIRTUAL_ALLOWED = 0o200;
    }
}

impl DirectiveFlags {
    /// True when every bit of `required` is set.
    pub fn has_all(self, required: DirectiveFlags) -> bool {
        self.contains(required)
    }

    /// True when no bit of `excluded` is set.
    pub fn has_none(self, excluded: DirectiveFlags) -> bool {
        !self.intersects(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_match_octal_layout() {
        assert_eq!(DirectiveFlags::TWO_WAY.bits(), 1);
        assert_eq!(DirectiveFlags::CONTENT_SET.bits(), 8);
        assert_eq!(DirectiveFlags::VIRTUAL_ALLOWED.bits(), 128);
        assert_eq!(DirectiveFlags::all().bits(), 0xff);
    }

    #[test]
    fn predicates() {
        let flags = DirectiveFlags::CONTENT_BIND | DirectiveFlags::VIRTUAL_ALLOWED;
        assert!(flags.has_all(DirectiveFlags::CONTENT_BIND));
        assert!(!flags.has_all(DirectiveFlags::CONTENT_BIND | DirectiveFlags::TWO_WAY));
        assert!(flags.has_none(DirectiveFlags::TWO_WAY | DirectiveFlags::EVENT_HANDLER));
        assert!(!flags.has_none(DirectiveFlags::VIRTUAL_ALLOWED));
        assert!(flags.has_all(DirectiveFlags::empty()));
    }
}
