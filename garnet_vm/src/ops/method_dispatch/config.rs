//! Per-call-site dispatch configuration.

use garnet_runtime::Visibility;

/// What a dispatch does with the resolved method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchAction {
    /// Invoke the method.
    Call,
    /// Report whether a callable method exists.
    RespondTo,
}

/// What a `CALL` does when lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingBehavior {
    /// Route to `method_missing`, which raises by default.
    Raise,
    /// Return [`Dispatched::Missing`](super::Dispatched::Missing) without
    /// consulting `method_missing`.
    ReturnMissing,
}

/// Immutable dispatch tag of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchConfiguration {
    /// Every visibility is callable (`send`, implicit-self calls).
    pub ignore_visibility: bool,
    /// Only public methods are callable (`public_send`, explicit receivers).
    pub only_public: bool,
    pub action: DispatchAction,
    pub missing_behavior: MissingBehavior,
}

impl DispatchConfiguration {
    /// Explicit-receiver call.
    pub const PUBLIC: Self = Self::call(false, true, MissingBehavior::Raise);
    /// Call where protected methods are allowed and private ones are not.
    pub const PROTECTED: Self = Self::call(false, false, MissingBehavior::Raise);
    /// Call that ignores visibility.
    pub const PRIVATE: Self = Self::call(true, false, MissingBehavior::Raise);
    /// `respond_to?(name)`.
    pub const PUBLIC_DOES_RESPOND: Self = Self::respond(false, true);
    /// `respond_to?(name, true)`.
    pub const PRIVATE_DOES_RESPOND: Self = Self::respond(true, false);
    /// Internal "call if defined" ignoring visibility.
    pub const PRIVATE_RETURN_MISSING: Self = Self::call(true, false, MissingBehavior::ReturnMissing);
    /// Internal "call if defined" for public methods.
    pub const PUBLIC_RETURN_MISSING: Self = Self::call(false, true, MissingBehavior::ReturnMissing);

    const fn call(ignore_visibility: bool, only_public: bool, missing_behavior: MissingBehavior) -> Self {
        Self {
            ignore_visibility,
            only_public,
            action: DispatchAction::Call,
            missing_behavior,
        }
    }

    const fn respond(ignore_visibility: bool, only_public: bool) -> Self {
        Self {
            ignore_visibility,
            only_public,
            action: DispatchAction::RespondTo,
            missing_behavior: MissingBehavior::Raise,
        }
    }

    /// Check if a method with `visibility` passes this configuration's filter.
    #[inline]
    pub fn allows(&self, visibility: Visibility) -> bool {
        if self.ignore_visibility {
            return true;
        }
        match visibility {
            Visibility::Public => true,
            Visibility::Protected => !self.only_public,
            Visibility::Private => false,
        }
    }

    #[inline]
    pub fn is_respond_to(&self) -> bool {
        self.action == DispatchAction::RespondTo
    }

    #[inline]
    pub fn returns_missing(&self) -> bool {
        self.missing_behavior == MissingBehavior::ReturnMissing
    }
}

impl Default for DispatchConfiguration {
    fn default() -> Self {
        Self::PUBLIC
    }
}
