/// Reference to a static value built on first use.
#[doc(hidden)]
#[macro_export]
macro_rules! lazy_ref {
    ($ty:ty, $init:expr) => {{
        static VALUE: ::once_cell::sync::Lazy<$ty> = ::once_cell::sync::Lazy::new(|| $init);
        &*VALUE
    }};
}

/// Compiles a regular expression once and returns `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($re:literal $(,)?) => {
        $crate::lazy_ref!(::regex::Regex, ::regex::Regex::new($re).unwrap())
    };
}

/// Parses a CSS selector once and returns `&'static Selector`.
#[macro_export]
macro_rules! select {
    ($selectors:literal $(,)?) => {
        $crate::lazy_ref!(
            ::scraper::selector::Selector,
            ::scraper::selector::Selector::parse($selectors).unwrap()
        )
    };
}

#[macro_export]
macro_rules! assert_matches {
    ($expr:expr => $pat:pat) => {
        assert!(
            match $expr {
                $pat => true,
                _ => false,
            },
            "expression does not match pattern {}",
            stringify!($pat)
        );
    };
}
