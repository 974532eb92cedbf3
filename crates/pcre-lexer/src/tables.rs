//! Static name tables for POSIX classes and PCRE verbs.

/// POSIX class names accepted inside `[:…:]`.
pub static POSIX_CLASSES: phf::Set<&'static str> = phf::phf_set! {
    "alnum", "alpha", "ascii", "blank", "cntrl", "digit", "graph",
    "lower", "print", "punct", "space", "upper", "word", "xdigit",
};

/// Backtracking control verbs that take an optional `:NAME` argument.
pub static CONTROL_VERBS: phf::Set<&'static str> = phf::phf_set! {
    "ACCEPT", "FAIL", "F", "MARK", "COMMIT", "PRUNE", "SKIP", "THEN",
};

/// Start-of-pattern option verbs (newline conventions, UTF toggles).
pub static OPTION_VERBS: phf::Set<&'static str> = phf::phf_set! {
    "CR", "LF", "CRLF", "ANYCRLF", "ANY", "NUL",
    "BSR_ANYCRLF", "BSR_UNICODE",
    "UTF", "UTF8", "UCP", "NO_AUTO_POSSESS", "NO_DOTSTAR_ANCHOR",
    "NO_JIT", "NO_START_OPT",
};

/// Script-run verbs; the colon introduces a pattern body, not an argument.
pub static SCRIPT_RUN_VERBS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "script_run" => "script_run",
    "sr" => "script_run",
    "atomic_script_run" => "atomic_script_run",
    "asr" => "atomic_script_run",
};

/// Limit verbs written `(*LIMIT_X=n)`.
pub static LIMIT_VERBS: phf::Set<&'static str> = phf::phf_set! {
    "LIMIT_MATCH", "LIMIT_DEPTH", "LIMIT_HEAP", "LIMIT_RECURSION",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_table_covers_standard_names() {
        for name in ["alpha", "digit", "xdigit", "word"] {
            assert!(POSIX_CLASSES.contains(name));
        }
        assert!(!POSIX_CLASSES.contains("letter"));
    }

    #[test]
    fn script_run_aliases_resolve() {
        assert_eq!(SCRIPT_RUN_VERBS.get("sr"), Some(&"script_run"));
        assert_eq!(SCRIPT_RUN_VERBS.get("asr"), Some(&"atomic_script_run"));
    }
}
