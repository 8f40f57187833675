//! Macros for declaring typed state names.

/// Declare an enum whose variants convert into [`StateName`](crate::core::StateName).
///
/// Handy when a game wants compile-checked state names but the engine itself
/// accepts any string. Each variant converts to its own identifier.
///
/// # Example
///
/// ```
/// use statecraft::core::StateName;
/// use statecraft::state_names;
///
/// state_names! {
///     pub enum Hero {
///         Idle,
///         Walk,
///         Jump,
///     }
/// }
///
/// assert_eq!(Hero::Walk.name(), "Walk");
/// assert_eq!(StateName::from(Hero::Jump), "Jump");
/// ```
#[macro_export]
macro_rules! state_names {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),+
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl ::std::convert::From<$name> for $crate::core::StateName {
            fn from(state: $name) -> Self {
                $crate::core::StateName::from(state.name())
            }
        }
    };
}
